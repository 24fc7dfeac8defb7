//! vlt-testkit
//!
//! Deterministic test doubles for the vault crates: seeded noise, a store
//! that fails on schedule, a subscriber recorder, and a corruption helper.
//! Test-only tooling; unwraps here are deliberate.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use vlt_codec::NoiseSource;
use vlt_store::{MemoryStore, SlotStore};

/// Seeded [`NoiseSource`]: same seed, same noise, same blobs.
pub struct ScriptedNoise(StdRng);

impl ScriptedNoise {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl NoiseSource for ScriptedNoise {
    fn fill(&mut self, buf: &mut [u8]) {
        self.0.fill_bytes(buf);
    }
}

/// Store wrapper that starts failing every operation after a scripted number
/// of successful ones. Exercises the transient-write-failure paths.
pub struct FlakyStore {
    inner: MemoryStore,
    remaining: AtomicI64,
}

impl FlakyStore {
    /// Allow `ops` get/set operations, then fail everything.
    pub fn failing_after(ops: i64) -> Self {
        Self {
            inner: MemoryStore::new(),
            remaining: AtomicI64::new(ops),
        }
    }

    fn charge(&self, op: &str, key: &str) -> Result<()> {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) <= 0 {
            bail!("scripted store failure: {op} {key}");
        }
        Ok(())
    }
}

impl SlotStore for FlakyStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.charge("get", key)?;
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.charge("set", key)?;
        self.inner.set(key, value)
    }
}

/// Captures every balance a subscriber callback observes.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<u64>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback suitable for `BalanceController::subscribe`.
    pub fn callback(&self) -> impl Fn(u64) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |balance| seen.lock().unwrap().push(balance)
    }

    pub fn seen(&self) -> Vec<u64> {
        self.seen.lock().unwrap().clone()
    }
}

/// Return `s` with the byte at `idx` replaced by a different ASCII char.
pub fn flip_char(s: &str, idx: usize) -> String {
    let mut bytes = s.as_bytes().to_vec();
    bytes[idx] = if bytes[idx] == b'A' { b'B' } else { b'A' };
    String::from_utf8(bytes).expect("blob is ASCII")
}
