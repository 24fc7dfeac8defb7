//! vlt-store
//!
//! Persisted two-slot store behind the balance vault.
//!
//! The external store is assumed to be localStorage-class: plain string
//! get/set under fixed keys, no transactions. Everything that needs atomic
//! intent (blob written before digest, single writer at a time) is the
//! controller's job; this crate only provides the seam and two adapters.

use anyhow::{Context, Result};

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Slot key for the obfuscated balance blob.
pub const BLOB_KEY: &str = "balanceData_v1";
/// Slot key for the hex integrity digest.
pub const DIGEST_KEY: &str = "balanceHash_v1";

/// Minimal string key/value store. No transactions, no watch, no delete —
/// mirrors the browser-storage surface the vault is designed around.
pub trait SlotStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// The two persisted halves, as read. Either may be absent; readers treat a
/// partial record as "no valid record".
#[derive(Clone, Debug, Default)]
pub struct PersistedRecord {
    pub blob: Option<String>,
    pub digest: Option<String>,
}

/// Read both halves of the record.
pub fn read_record(store: &dyn SlotStore) -> Result<PersistedRecord> {
    Ok(PersistedRecord {
        blob: store.get(BLOB_KEY).context("read blob slot")?,
        digest: store.get(DIGEST_KEY).context("read digest slot")?,
    })
}

/// Write both halves: blob first, then digest. Not transactional; callers
/// must serialize concurrent writers.
pub fn write_record(store: &dyn SlotStore, blob: &str, digest: &str) -> Result<()> {
    store.set(BLOB_KEY, blob).context("write blob slot")?;
    store.set(DIGEST_KEY, digest).context("write digest slot")?;
    Ok(())
}
