//! Capacity-bounded eviction (`spec.md` §4.3 "Garbage collection"). Run
//! inline, inside the same write transaction, by every mutation that can
//! grow the `gc` index.

use redb::WriteTransaction;

use crate::error::Result;
use crate::schema::{be64, decode_be64, GC, GC_SIZE, GC_SIZE_KEY, RETRIEVAL_ACCESS, RETRIEVAL_DATA};

pub fn read_gc_size(txn: &WriteTransaction) -> Result<u64> {
    let table = txn.open_table(GC_SIZE)?;
    Ok(table
        .get(GC_SIZE_KEY)?
        .map(|v| decode_be64(v.value()))
        .unwrap_or(0))
}

pub fn write_gc_size(txn: &WriteTransaction, size: u64) -> Result<()> {
    let mut table = txn.open_table(GC_SIZE)?;
    table.insert(GC_SIZE_KEY, be64(size).as_slice())?;
    Ok(())
}

/// If `gc_size > capacity`, evict the oldest (by `accessTs`) entries,
/// atomically removing them from `retrievalData`, `retrievalAccess`, and
/// `gc`, until `gc_size <= capacity - target_collect_size`. Returns the
/// number of entries evicted. `pushSync` is never touched here.
pub fn maybe_collect(txn: &WriteTransaction, capacity: u64, target_collect_size: u64) -> Result<u64> {
    let gc_size = read_gc_size(txn)?;
    if gc_size <= capacity {
        return Ok(0);
    }
    let floor = capacity.saturating_sub(target_collect_size);

    let mut to_delete: Vec<Vec<u8>> = Vec::new();
    {
        let table = txn.open_table(GC)?;
        let mut iter = table.iter()?;
        while gc_size - to_delete.len() as u64 > floor {
            match iter.next() {
                Some(entry) => {
                    let (key, _value) = entry?;
                    to_delete.push(key.value().to_vec());
                }
                None => break,
            }
        }
    }

    let evicted = to_delete.len() as u64;
    if evicted > 0 {
        let mut gc_table = txn.open_table(GC)?;
        let mut data_table = txn.open_table(RETRIEVAL_DATA)?;
        let mut access_table = txn.open_table(RETRIEVAL_ACCESS)?;
        for key in &to_delete {
            let address = &key[16..48];
            gc_table.remove(key.as_slice())?;
            data_table.remove(address)?;
            access_table.remove(address)?;
        }
        write_gc_size(txn, gc_size - evicted)?;
        tracing::info!(evicted, remaining = gc_size - evicted, "gc round");
    }
    Ok(evicted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maybe_collect_is_a_noop_under_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let db = redb::Database::create(dir.path().join("t.redb")).unwrap();
        let txn = db.begin_write().unwrap();
        {
            let _ = txn.open_table(GC).unwrap();
            let _ = txn.open_table(RETRIEVAL_DATA).unwrap();
            let _ = txn.open_table(RETRIEVAL_ACCESS).unwrap();
        }
        write_gc_size(&txn, 3).unwrap();
        let evicted = maybe_collect(&txn, 10, 1).unwrap();
        assert_eq!(evicted, 0);
        txn.commit().unwrap();
    }
}
