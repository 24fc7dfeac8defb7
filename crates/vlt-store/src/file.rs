use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};

use crate::SlotStore;

/// JSON-file-backed store adapter.
///
/// The whole slot map is rewritten on every `set`; with two short string
/// slots that is cheaper than being clever. A missing file starts empty; a
/// file that exists but does not parse is an error (silently discarding a
/// record would defeat tamper evidence).
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    slots: Mutex<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let slots = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("read slot store {:?}", path))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parse slot store {:?}", path))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            slots: Mutex::new(slots),
        })
    }

    fn persist(&self, slots: &HashMap<String, String>) -> Result<()> {
        let raw = serde_json::to_string(slots).context("serialize slot store")?;
        // Write-then-rename: a crash mid-write must leave the previous file
        // intact, never a truncated one that would fail to reopen.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw).with_context(|| format!("write slot store staging {:?}", tmp))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("commit slot store {:?}", self.path))
    }
}

impl SlotStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        self.persist(&slots)
    }
}
