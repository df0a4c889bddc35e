use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::backend::{MemoryBackend, StorageBackend, StorageError};
use crate::domain::{MissionResult, TaskId};

/// Every stored entry is keyed `festival_task_<task id>`; foreign keys in a
/// shared backend are left untouched.
pub const KEY_PREFIX: &str = "festival_task_";

/// Size-constrained local store for finished mission results.
#[derive(Clone)]
pub struct ResultStore {
    backend: Arc<dyn StorageBackend>,
}

impl ResultStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory(capacity: usize) -> Self {
        Self::new(Arc::new(MemoryBackend::new(capacity)))
    }

    fn key_for(task_id: &TaskId) -> String {
        format!("{KEY_PREFIX}{task_id}")
    }

    /// Persist a finished result. Never propagates an error: on a capacity
    /// rejection the stored collection is halved (keeping the most recently
    /// created entries) and the write retried once; a second rejection drops
    /// the write with a log line.
    pub fn save(&self, result: &MissionResult) {
        let key = Self::key_for(&result.task_id);
        let payload = match serde_json::to_string(result) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(task_id = %result.task_id, error = %err, "result not serializable, dropping");
                return;
            }
        };

        match self.backend.put(&key, payload.clone()) {
            Ok(()) => {
                debug!(task_id = %result.task_id, bytes = payload.len(), "result persisted");
            }
            Err(StorageError::CapacityExceeded) => {
                self.compact();
                if let Err(err) = self.backend.put(&key, payload) {
                    warn!(task_id = %result.task_id, error = %err, "dropping result write");
                }
            }
            Err(err) => {
                warn!(task_id = %result.task_id, error = %err, "dropping result write");
            }
        }
    }

    /// Halve the stored collection, newest first, leaving one slot free for
    /// the write being retried. Entries that no longer parse sort oldest and
    /// go first.
    fn compact(&self) {
        let mut stamped: Vec<(i64, String)> = self
            .task_keys()
            .into_iter()
            .map(|key| {
                let timestamp = self
                    .backend
                    .get(&key)
                    .and_then(|value| serde_json::from_str::<MissionResult>(&value).ok())
                    .map(|result| result.metadata.timestamp_ms)
                    .unwrap_or(i64::MIN);
                (timestamp, key)
            })
            .collect();
        stamped.sort_by(|a, b| b.0.cmp(&a.0));

        let keep = ((stamped.len() + 1) / 2).saturating_sub(1);
        let dropped = stamped.len().saturating_sub(keep);
        for (_, key) in stamped.into_iter().skip(keep) {
            self.backend.remove(&key);
        }
        info!(kept = keep, dropped, "compacted result store");
    }

    pub fn get(&self, task_id: &TaskId) -> Option<MissionResult> {
        self.backend
            .get(&Self::key_for(task_id))
            .and_then(|value| serde_json::from_str(&value).ok())
    }

    pub fn task_ids(&self) -> Vec<String> {
        self.task_keys()
            .into_iter()
            .map(|key| key[KEY_PREFIX.len()..].to_string())
            .collect()
    }

    /// Remove entries older than `retention` and entries that fail to
    /// deserialize. Returns how many were removed. Invoked by the caller;
    /// this store owns no timer.
    pub fn sweep(&self, retention: Duration) -> usize {
        let now = Utc::now().timestamp_millis();
        let max_age = retention.as_millis().min(i64::MAX as u128) as i64;
        let mut removed = 0usize;

        for key in self.task_keys() {
            let Some(value) = self.backend.get(&key) else {
                continue;
            };
            match serde_json::from_str::<MissionResult>(&value) {
                Ok(result) => {
                    let age = now.saturating_sub(result.metadata.timestamp_ms);
                    if age > max_age {
                        debug!(key = %key, age_ms = age, "removing expired result");
                        self.backend.remove(&key);
                        removed += 1;
                    }
                }
                Err(_) => {
                    debug!(key = %key, "removing corrupt result");
                    self.backend.remove(&key);
                    removed += 1;
                }
            }
        }

        info!(removed, "expiry sweep complete");
        removed
    }

    fn task_keys(&self) -> Vec<String> {
        self.backend
            .keys()
            .into_iter()
            .filter(|key| key.starts_with(KEY_PREFIX))
            .collect()
    }
}
