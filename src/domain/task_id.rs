use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one mission invocation.
///
/// Doubles as the persistence key and as the seed for the fallback
/// resolver's deterministic template ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// High-resolution timestamp plus random suffix; collisions are
    /// negligible, so the id is safe as the sole persistence key.
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let uuid = Uuid::new_v4().simple().to_string();
        Self(format!("task_{}_{}", millis, &uuid[..9]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Deterministic index into a pool of `len` entries. Same task id, same
    /// index: the resolver's retry order is reproducible within a run while
    /// different runs spread their starting template across the pool.
    pub fn hash_index(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        fnv1a32(&self.0) as usize % len
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn fnv1a32(input: &str) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for byte in input.bytes() {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}
