use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures::Stream;
use redb::WriteTransaction;
use swarm_primitives::Address;

use crate::config::StoreConfig;
use crate::error::{Result, StoreError};
use crate::gc;
use crate::migration;
use crate::mode::{GetMode, PutMode, SetMode};
use crate::schema::{
    be32, be64, bin_ids_key, decode_be64, decode_retrieval_data, encode_retrieval_data, gc_key,
    po_byte, pull_sync_key, push_sync_key, BIN_IDS, GC, PULL_SYNC, PUSH_SYNC, RETRIEVAL_ACCESS,
    RETRIEVAL_DATA, SCHEMA,
};
use crate::subscription::{PullFeeds, PushFeed};
use swarm_primitives::Chunk;

/// A persistent chunk database over `redb`, implementing `spec.md` §4.3:
/// four indexes plus counters, mode-qualified `Put`/`Get`/`Set`,
/// capacity-bounded GC, and pull/push subscription feeds.
///
/// Every index mutation for one `Put`/`Get`/`Set` call happens inside a
/// single `redb::WriteTransaction`, committed once — the concrete
/// realization of "all indexes share a single atomic write batch per
/// operation". The blocking `redb` calls run on `spawn_blocking` so the
/// async caller suspends rather than blocking a runtime thread, matching
/// `spec.md` §5's "Store Put/Get/Set may suspend ... on disk I/O".
pub struct LocalStore {
    db: Arc<redb::Database>,
    config: StoreConfig,
    pull_feeds: PullFeeds,
    push_feed: PushFeed,
}

impl LocalStore {
    pub fn open(path: impl AsRef<Path>, config: StoreConfig) -> Result<Self> {
        let db = redb::Database::create(path)?;
        {
            let txn = db.begin_write()?;
            for table in [RETRIEVAL_DATA, RETRIEVAL_ACCESS, PULL_SYNC, PUSH_SYNC, GC] {
                let _ = txn.open_table(table)?;
            }
            let _ = txn.open_table(BIN_IDS)?;
            let _ = txn.open_table(crate::schema::GC_SIZE)?;
            let _ = txn.open_table(SCHEMA)?;
            migration::ensure_current(&txn)?;
            txn.commit()?;
        }
        check_crash_recovery(&db)?;
        tracing::info!(capacity = config.capacity, "local store opened");
        Ok(Self {
            db: Arc::new(db),
            config,
            pull_feeds: PullFeeds::default(),
            push_feed: PushFeed::default(),
        })
    }

    /// Validate and store `chunk` under `mode`. Returns whether an entry
    /// for this address already existed.
    pub async fn put(&self, mode: PutMode, chunk: Chunk) -> Result<bool> {
        if !swarm_bmt::validate(chunk.address(), chunk.span(), chunk.payload()) {
            return Err(StoreError::ChunkInvalid);
        }
        let address = chunk.address();
        let db = self.db.clone();
        let config = self.config.clone();
        let (existed, pull_trigger, push_trigger) =
            tokio::task::spawn_blocking(move || -> Result<(bool, Option<(u8, u64)>, bool)> {
                let txn = db.begin_write()?;
                let result = put_tx(&txn, &config, mode, &chunk)?;
                gc::maybe_collect(&txn, config.capacity, config.target_collect_size)?;
                txn.commit()?;
                Ok(result)
            })
            .await
            .expect("blocking task panicked")?;

        if let Some((po, bin_id)) = pull_trigger {
            self.pull_feeds.trigger(po, bin_id);
        }
        if push_trigger {
            self.push_feed.trigger();
        }
        tracing::debug!(%address, mode = ?mode, existed, "put");
        Ok(existed)
    }

    pub async fn get(&self, mode: GetMode, address: Address) -> Result<Chunk> {
        tracing::debug!(%address, mode = ?mode, "get");
        match mode {
            GetMode::Lookup => {
                let db = self.db.clone();
                tokio::task::spawn_blocking(move || {
                    let txn = db.begin_read()?;
                    let table = txn.open_table(RETRIEVAL_DATA)?;
                    let row_bytes = table
                        .get(address.as_bytes().as_slice())?
                        .map(|v| v.value().to_vec())
                        .ok_or(StoreError::NotFound)?;
                    let row = decode_retrieval_data(&row_bytes);
                    Ok(Chunk::new_unchecked(address, Bytes::copy_from_slice(row.data)))
                })
                .await
                .expect("blocking task panicked")
            }
            GetMode::Request => {
                let db = self.db.clone();
                let config = self.config.clone();
                tokio::task::spawn_blocking(move || {
                    let txn = db.begin_write()?;
                    let chunk = get_request_tx(&txn, address)?;
                    gc::maybe_collect(&txn, config.capacity, config.target_collect_size)?;
                    txn.commit()?;
                    Ok(chunk)
                })
                .await
                .expect("blocking task panicked")
            }
        }
    }

    pub async fn set(&self, mode: SetMode, address: Address) -> Result<()> {
        let db = self.db.clone();
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            let txn = db.begin_write()?;
            match mode {
                SetMode::Access => {
                    get_request_tx(&txn, address)?;
                }
                SetMode::Sync => set_sync_tx(&txn, address)?,
                SetMode::Remove => set_remove_tx(&txn, address, config.base_address)?,
            }
            gc::maybe_collect(&txn, config.capacity, config.target_collect_size)?;
            txn.commit()?;
            Ok(())
        })
        .await
        .expect("blocking task panicked")
    }

    /// A restartable sequence of `(address, binID)` from the pull-sync
    /// index for one `po`, starting after `since`. Blocks for new
    /// entries between deliveries rather than ending.
    pub fn subscribe_pull(
        &self,
        po: u32,
        since: u64,
    ) -> impl Stream<Item = Result<(Address, u64)>> + '_ {
        let mut rx = self.pull_feeds.subscribe(po_byte(po));
        let db = self.db.clone();
        async_stream::try_stream! {
            let mut cursor = since;
            loop {
                let db2 = db.clone();
                let (entries, new_cursor) = tokio::task::spawn_blocking(move || {
                    scan_pull_sync(&db2, po, cursor)
                })
                .await
                .expect("blocking task panicked")?;

                for item in entries {
                    yield item;
                }
                cursor = new_cursor;

                match rx.recv().await {
                    Ok(_) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    /// A restartable sequence of `(address, storeTs)` from the push-sync
    /// index, ordered by upload recency.
    pub fn subscribe_push(&self) -> impl Stream<Item = Result<(Address, u64)>> + '_ {
        let mut rx = self.push_feed.subscribe();
        let db = self.db.clone();
        async_stream::try_stream! {
            let mut cursor = 0u64;
            loop {
                let db2 = db.clone();
                let (entries, new_cursor) = tokio::task::spawn_blocking(move || {
                    scan_push_sync(&db2, cursor)
                })
                .await
                .expect("blocking task panicked")?;

                for item in entries {
                    yield item;
                }
                cursor = new_cursor;

                match rx.recv().await {
                    Ok(()) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn next_bin_id(txn: &WriteTransaction, po: u32) -> Result<u64> {
    let key = bin_ids_key(po);
    let current = {
        let table = txn.open_table(BIN_IDS)?;
        table
            .get(key.as_slice())?
            .map(|v| decode_be64(v.value()))
            .unwrap_or(0)
    };
    let next = current + 1;
    let mut table = txn.open_table(BIN_IDS)?;
    table.insert(key.as_slice(), be64(next).as_slice())?;
    Ok(next)
}

fn put_tx(
    txn: &WriteTransaction,
    config: &StoreConfig,
    mode: PutMode,
    chunk: &Chunk,
) -> Result<(bool, Option<(u8, u64)>, bool)> {
    let address = chunk.address();
    let addr_bytes = *address.as_bytes();
    let po = config.base_address.proximity_order(&address);
    let po_b = po_byte(po);

    let existing_mode = {
        let table = txn.open_table(RETRIEVAL_DATA)?;
        table.get(addr_bytes.as_slice())?.map(|v| {
            let row = decode_retrieval_data(v.value());
            PutMode::from_byte(row.mode).unwrap_or(PutMode::Request)
        })
    };

    if let Some(existing) = existing_mode {
        if mode <= existing {
            return Ok((true, None, false));
        }
        return upgrade_mode(txn, po, po_b, mode, &addr_bytes);
    }

    let now = now_unix();
    let bin_id = next_bin_id(txn, po)?;
    let data = chunk.data();

    {
        let mut table = txn.open_table(RETRIEVAL_DATA)?;
        table.insert(
            addr_bytes.as_slice(),
            encode_retrieval_data(now, bin_id, mode.to_byte(), data).as_slice(),
        )?;
    }

    let mut pull_trigger = None;
    let mut push_trigger = false;

    match mode {
        PutMode::Upload => {
            {
                let mut table = txn.open_table(PULL_SYNC)?;
                table.insert(
                    pull_sync_key(po, bin_id, &addr_bytes).as_slice(),
                    be32(0).as_slice(),
                )?;
            }
            {
                let mut table = txn.open_table(PUSH_SYNC)?;
                table.insert(
                    push_sync_key(now, &addr_bytes).as_slice(),
                    be32(0).as_slice(),
                )?;
            }
            pull_trigger = Some((po_b, bin_id));
            push_trigger = true;
        }
        PutMode::Sync => {
            let mut table = txn.open_table(PULL_SYNC)?;
            table.insert(
                pull_sync_key(po, bin_id, &addr_bytes).as_slice(),
                be32(0).as_slice(),
            )?;
            pull_trigger = Some((po_b, bin_id));
        }
        PutMode::Request => {
            {
                let mut table = txn.open_table(RETRIEVAL_ACCESS)?;
                table.insert(addr_bytes.as_slice(), be64(now).as_slice())?;
            }
            {
                let mut table = txn.open_table(GC)?;
                table.insert(gc_key(now, bin_id, &addr_bytes).as_slice(), [].as_slice())?;
            }
            let size = gc::read_gc_size(txn)?;
            gc::write_gc_size(txn, size + 1)?;
        }
    }

    Ok((false, pull_trigger, push_trigger))
}

/// Upgrade an existing entry's index presence to a stronger `Put` mode
/// (`spec.md` §4.3 "Duplicate-put on different modes keeps the strongest
/// index presence"), adding only the index rows the stronger mode
/// requires that the weaker one didn't already create.
fn upgrade_mode(
    txn: &WriteTransaction,
    po: u32,
    po_b: u8,
    new_mode: PutMode,
    addr_bytes: &[u8; 32],
) -> Result<(bool, Option<(u8, u64)>, bool)> {
    let (store_ts, bin_id, mode, data) = {
        let table = txn.open_table(RETRIEVAL_DATA)?;
        let v = table
            .get(addr_bytes.as_slice())?
            .expect("existence already checked by caller");
        let row = decode_retrieval_data(v.value());
        (row.store_ts, row.bin_id, row.mode, row.data.to_vec())
    };
    let _ = mode;

    {
        let mut table = txn.open_table(RETRIEVAL_DATA)?;
        table.insert(
            addr_bytes.as_slice(),
            encode_retrieval_data(store_ts, bin_id, new_mode.to_byte(), &data).as_slice(),
        )?;
    }

    let mut pull_trigger = None;
    {
        let mut table = txn.open_table(PULL_SYNC)?;
        let key = pull_sync_key(po, bin_id, addr_bytes);
        if table.get(key.as_slice())?.is_none() {
            table.insert(key.as_slice(), be32(0).as_slice())?;
            pull_trigger = Some((po_b, bin_id));
        }
    }

    let mut push_trigger = false;
    if new_mode == PutMode::Upload {
        let mut table = txn.open_table(PUSH_SYNC)?;
        let key = push_sync_key(store_ts, addr_bytes);
        if table.get(key.as_slice())?.is_none() {
            table.insert(key.as_slice(), be32(0).as_slice())?;
            push_trigger = true;
        }
    }

    Ok((true, pull_trigger, push_trigger))
}

/// Shared by `Get(Request)` and `Set(Access)`: bump `accessTs`, move the
/// `gc` key, and if this is the item's first ever access, promote it
/// into the gc index (incrementing `gcSize`).
fn get_request_tx(txn: &WriteTransaction, address: Address) -> Result<Chunk> {
    let addr_bytes = *address.as_bytes();
    let row_bytes = {
        let table = txn.open_table(RETRIEVAL_DATA)?;
        table.get(addr_bytes.as_slice())?.map(|v| v.value().to_vec())
    }
    .ok_or(StoreError::NotFound)?;
    let row = decode_retrieval_data(&row_bytes);
    let chunk = Chunk::new_unchecked(address, Bytes::copy_from_slice(row.data));

    let now = now_unix();
    let old_access = {
        let table = txn.open_table(RETRIEVAL_ACCESS)?;
        table
            .get(addr_bytes.as_slice())?
            .map(|v| decode_be64(v.value()))
    };

    {
        let mut table = txn.open_table(RETRIEVAL_ACCESS)?;
        table.insert(addr_bytes.as_slice(), be64(now).as_slice())?;
    }

    {
        let mut table = txn.open_table(GC)?;
        if let Some(old_ts) = old_access {
            table.remove(gc_key(old_ts, row.bin_id, &addr_bytes).as_slice())?;
        }
        table.insert(gc_key(now, row.bin_id, &addr_bytes).as_slice(), [].as_slice())?;
    }

    if old_access.is_none() {
        let size = gc::read_gc_size(txn)?;
        gc::write_gc_size(txn, size + 1)?;
    }

    Ok(chunk)
}

fn set_sync_tx(txn: &WriteTransaction, address: Address) -> Result<()> {
    let addr_bytes = *address.as_bytes();
    let row_bytes = {
        let table = txn.open_table(RETRIEVAL_DATA)?;
        table.get(addr_bytes.as_slice())?.map(|v| v.value().to_vec())
    }
    .ok_or(StoreError::NotFound)?;
    let row = decode_retrieval_data(&row_bytes);

    {
        let mut table = txn.open_table(PUSH_SYNC)?;
        table.remove(push_sync_key(row.store_ts, &addr_bytes).as_slice())?;
    }

    let already_tracked = {
        let table = txn.open_table(RETRIEVAL_ACCESS)?;
        table.get(addr_bytes.as_slice())?.is_some()
    };
    if !already_tracked {
        let now = now_unix();
        {
            let mut table = txn.open_table(RETRIEVAL_ACCESS)?;
            table.insert(addr_bytes.as_slice(), be64(now).as_slice())?;
        }
        {
            let mut table = txn.open_table(GC)?;
            table.insert(gc_key(now, row.bin_id, &addr_bytes).as_slice(), [].as_slice())?;
        }
        let size = gc::read_gc_size(txn)?;
        gc::write_gc_size(txn, size + 1)?;
    }
    Ok(())
}

fn set_remove_tx(txn: &WriteTransaction, address: Address, base_address: Address) -> Result<()> {
    let addr_bytes = *address.as_bytes();
    let row_bytes = {
        let table = txn.open_table(RETRIEVAL_DATA)?;
        table.get(addr_bytes.as_slice())?.map(|v| v.value().to_vec())
    };
    let Some(row_bytes) = row_bytes else {
        return Ok(());
    };
    let row = decode_retrieval_data(&row_bytes);
    let access_ts = {
        let table = txn.open_table(RETRIEVAL_ACCESS)?;
        table
            .get(addr_bytes.as_slice())?
            .map(|v| decode_be64(v.value()))
    };

    {
        let mut table = txn.open_table(RETRIEVAL_DATA)?;
        table.remove(addr_bytes.as_slice())?;
    }
    {
        let mut table = txn.open_table(RETRIEVAL_ACCESS)?;
        table.remove(addr_bytes.as_slice())?;
    }
    {
        let po = base_address.proximity_order(&address);
        let mut table = txn.open_table(PULL_SYNC)?;
        table.remove(pull_sync_key(po, row.bin_id, &addr_bytes).as_slice())?;
    }
    {
        let mut table = txn.open_table(PUSH_SYNC)?;
        table.remove(push_sync_key(row.store_ts, &addr_bytes).as_slice())?;
    }
    if let Some(ts) = access_ts {
        {
            let mut table = txn.open_table(GC)?;
            table.remove(gc_key(ts, row.bin_id, &addr_bytes).as_slice())?;
        }
        let size = gc::read_gc_size(txn)?;
        gc::write_gc_size(txn, size.saturating_sub(1))?;
    }
    Ok(())
}

fn scan_pull_sync(
    db: &redb::Database,
    po: u32,
    since: u64,
) -> Result<(Vec<(Address, u64)>, u64)> {
    let txn = db.begin_read()?;
    let table = txn.open_table(PULL_SYNC)?;
    let start = pull_sync_key(po, since + 1, &[0u8; 32]);
    let end = pull_sync_key(po, u64::MAX, &[0xffu8; 32]);
    let mut out = Vec::new();
    let mut cursor = since;
    for entry in table.range(start.as_slice()..=end.as_slice())? {
        let (key, _value) = entry?;
        let key = key.value();
        let bin_id = decode_be64(&key[1..9]);
        let mut addr = [0u8; 32];
        addr.copy_from_slice(&key[9..41]);
        out.push((Address::new(addr), bin_id));
        cursor = cursor.max(bin_id);
    }
    Ok((out, cursor))
}

fn scan_push_sync(db: &redb::Database, since: u64) -> Result<(Vec<(Address, u64)>, u64)> {
    let txn = db.begin_read()?;
    let table = txn.open_table(PUSH_SYNC)?;
    let start = push_sync_key(since + 1, &[0u8; 32]);
    let end = push_sync_key(u64::MAX, &[0xffu8; 32]);
    let mut out = Vec::new();
    let mut cursor = since;
    for entry in table.range(start.as_slice()..=end.as_slice())? {
        let (key, _value) = entry?;
        let key = key.value();
        let store_ts = decode_be64(&key[0..8]);
        let mut addr = [0u8; 32];
        addr.copy_from_slice(&key[8..40]);
        out.push((Address::new(addr), store_ts));
        cursor = cursor.max(store_ts);
    }
    Ok((out, cursor))
}

fn check_crash_recovery(db: &redb::Database) -> Result<()> {
    const TOLERANCE: u64 = 1;
    let txn = db.begin_write()?;
    let stored_size = gc::read_gc_size(&txn)?;
    let actual_size = {
        let table = txn.open_table(GC)?;
        table.len()?
    };
    let drift = stored_size.abs_diff(actual_size);
    if drift > TOLERANCE {
        return Err(StoreError::StoreCorrupt(format!(
            "gcSize drift {drift} exceeds tolerance (stored={stored_size}, actual={actual_size})"
        )));
    }
    if drift > 0 {
        gc::write_gc_size(&txn, actual_size)?;
        tracing::warn!(stored_size, actual_size, "reconciled gcSize drift on open");
    }
    txn.commit()?;
    Ok(())
}
