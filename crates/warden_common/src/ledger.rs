//! Infraction ledger
//!
//! Append-only per-subject history of violations. Counts are monotonically
//! non-decreasing; records are never mutated or removed and never expire.
//!
//! The backing store is a whole-document rewrite, so the read-modify-write
//! sequence runs under a mutex: overlapping automod triggers for the same
//! or different subjects cannot lose appends.

use crate::error::Result;
use crate::ids::UserId;
use crate::store::{InfractionRecord, InfractionStore};
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Durable, serialized infraction ledger.
pub struct InfractionLedger {
    store: InfractionStore,
    write_lock: Mutex<()>,
}

impl InfractionLedger {
    pub fn new(path: PathBuf) -> Self {
        Self {
            store: InfractionStore::new(path),
            write_lock: Mutex::new(()),
        }
    }

    /// Append a record for `subject` and return the subject's new cumulative
    /// count. Persists synchronously before returning.
    pub async fn add_infraction(
        &self,
        subject: UserId,
        issuer: UserId,
        reason: &str,
    ) -> Result<usize> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.store.load()?;
        let entry = records.entry(subject.to_string()).or_default();
        entry.push(InfractionRecord {
            issuer,
            reason: reason.to_string(),
        });
        let count = entry.len();
        self.store.save(&records)?;

        Ok(count)
    }

    /// Current cumulative count for a subject; zero when unknown.
    pub async fn count_for(&self, subject: UserId) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let records = self.store.load()?;
        Ok(records.get(&subject.to_string()).map_or(0, Vec::len))
    }

    /// Full chronological record list for a subject.
    pub async fn records_for(&self, subject: UserId) -> Result<Vec<InfractionRecord>> {
        let _guard = self.write_lock.lock().await;
        let records = self.store.load()?;
        Ok(records.get(&subject.to_string()).cloned().unwrap_or_default())
    }
}
