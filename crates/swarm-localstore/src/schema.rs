//! `redb::TableDefinition`s for the `spec.md` §4.3 index schema, plus the
//! byte-layout codecs for their composite keys/values. Every key is a
//! plain `&[u8]`/`Vec<u8>` built so the store's natural lexicographic key
//! order matches the logical order each index needs (oldest/lowest
//! first), per `SPEC_FULL.md` §3.

use redb::TableDefinition;

pub const RETRIEVAL_DATA: TableDefinition<&[u8], &[u8]> = TableDefinition::new("retrieval_data");
pub const RETRIEVAL_ACCESS: TableDefinition<&[u8], &[u8]> =
    TableDefinition::new("retrieval_access");
pub const PULL_SYNC: TableDefinition<&[u8], &[u8]> = TableDefinition::new("pull_sync");
pub const PUSH_SYNC: TableDefinition<&[u8], &[u8]> = TableDefinition::new("push_sync");
pub const GC: TableDefinition<&[u8], &[u8]> = TableDefinition::new("gc");
pub const BIN_IDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("bin_ids");
pub const GC_SIZE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("gc_size");
pub const SCHEMA: TableDefinition<&[u8], &[u8]> = TableDefinition::new("schema");

pub const GC_SIZE_KEY: &[u8] = b"gc_size";
pub const SCHEMA_KEY: &[u8] = b"schema";

/// `po` collapses to a single byte for key encoding. The only address
/// pair that could legitimately reach `po == 256` is two literally
/// identical 32-byte addresses, which collapses into bin 255 instead —
/// harmless, since it is not a real pair of distinct peers/chunks.
pub fn po_byte(po: u32) -> u8 {
    po.min(u8::MAX as u32) as u8
}

pub fn be64(x: u64) -> [u8; 8] {
    x.to_be_bytes()
}

pub fn decode_be64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_be_bytes(buf)
}

pub fn be32(x: u32) -> [u8; 4] {
    x.to_be_bytes()
}

pub fn decode_be32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_be_bytes(buf)
}

/// `retrievalData` value: `storeTs(8) ‖ binID(8) ‖ mode(1) ‖ data`.
pub fn encode_retrieval_data(store_ts: u64, bin_id: u64, mode: u8, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(17 + data.len());
    out.extend_from_slice(&be64(store_ts));
    out.extend_from_slice(&be64(bin_id));
    out.push(mode);
    out.extend_from_slice(data);
    out
}

pub struct RetrievalDataRow<'a> {
    pub store_ts: u64,
    pub bin_id: u64,
    pub mode: u8,
    pub data: &'a [u8],
}

pub fn decode_retrieval_data(bytes: &[u8]) -> RetrievalDataRow<'_> {
    RetrievalDataRow {
        store_ts: decode_be64(&bytes[0..8]),
        bin_id: decode_be64(&bytes[8..16]),
        mode: bytes[16],
        data: &bytes[17..],
    }
}

/// `pullSync` key: `po(1) ‖ binID(8) ‖ address(32)`.
pub fn pull_sync_key(po: u32, bin_id: u64, address: &[u8; 32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(41);
    out.push(po_byte(po));
    out.extend_from_slice(&be64(bin_id));
    out.extend_from_slice(address);
    out
}

/// `pushSync` key: `storeTs(8) ‖ address(32)`.
pub fn push_sync_key(store_ts: u64, address: &[u8; 32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(40);
    out.extend_from_slice(&be64(store_ts));
    out.extend_from_slice(address);
    out
}

/// `gc` key: `accessTs(8) ‖ binID(8) ‖ address(32)`.
pub fn gc_key(access_ts: u64, bin_id: u64, address: &[u8; 32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(48);
    out.extend_from_slice(&be64(access_ts));
    out.extend_from_slice(&be64(bin_id));
    out.extend_from_slice(address);
    out
}

/// `binIDs` key: `po` encoded as 8 bytes (the schema table's own width
/// for this index, wider than the 1-byte `po` used elsewhere).
pub fn bin_ids_key(po: u32) -> Vec<u8> {
    be64(po as u64).to_vec()
}
