//! Durable JSON stores
//!
//! Two independent whole-document stores under the data directory:
//! - warns.json: subject id -> chronological list of infractions
//! - ticket_counter.json: last issued ticket number
//!
//! Every mutation rewrites the full document through an atomic replace
//! (temp file + fsync + rename), so a crash mid-write never leaves a torn
//! document behind. Absent files are empty state, not errors. Single-writer
//! assumption: mutations are read-entire/modify/write-entire, so a second
//! process writing the same files is unsafe.

use crate::error::Result;
use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write `data` to `path` atomically: temp file in the same directory,
/// fsync, then rename over the target.
pub fn atomic_write(path: &Path, data: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// A single infraction as stored on disk. The issuer is recorded under the
/// "mod" key; changing it would break existing warns.json documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfractionRecord {
    #[serde(rename = "mod")]
    pub issuer: UserId,
    pub reason: String,
}

/// On-disk map backing the infraction ledger. Keys are subject ids rendered
/// as strings; values are append-only, in chronological order.
pub type InfractionMap = BTreeMap<String, Vec<InfractionRecord>>;

/// Handle on the warns.json document.
#[derive(Debug, Clone)]
pub struct InfractionStore {
    path: PathBuf,
}

impl InfractionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the full document. Absent file yields an empty map; malformed
    /// content is surfaced as `Corrupt`.
    pub fn load(&self) -> Result<InfractionMap> {
        if !self.path.exists() {
            return Ok(InfractionMap::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Rewrite the full document atomically.
    pub fn save(&self, records: &InfractionMap) -> Result<()> {
        let contents = serde_json::to_string_pretty(records)?;
        atomic_write(&self.path, &contents)?;
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CounterDoc {
    last: u64,
}

/// Handle on the ticket_counter.json document.
#[derive(Debug, Clone)]
pub struct CounterStore {
    path: PathBuf,
}

impl CounterStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Last issued ticket number; zero when no ticket was ever issued.
    pub fn load(&self) -> Result<u64> {
        if !self.path.exists() {
            return Ok(0);
        }
        let contents = fs::read_to_string(&self.path)?;
        let doc: CounterDoc = serde_json::from_str(&contents)?;
        Ok(doc.last)
    }

    /// Persist a newly issued number. Must only be called while holding the
    /// allocation lock in the ticket registry.
    pub fn save(&self, last: u64) -> Result<()> {
        let contents = serde_json::to_string(&CounterDoc { last })?;
        atomic_write(&self.path, &contents)?;
        Ok(())
    }
}
