use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{ForgeError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub poller: PollerConfig,
    pub resolver: ResolverConfig,
    pub persistence: PersistenceConfig,
}

impl ForgeConfig {
    /// Load from `forge.toml` under `dir`, falling back to defaults when the
    /// file is absent.
    pub async fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join("forge.toml");
        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, dir: &Path) -> Result<()> {
        self.validate()?;
        let config_path = dir.join("forge.toml");
        let content = toml::to_string_pretty(self).map_err(|e| ForgeError::Config(e.to_string()))?;
        fs::write(&config_path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.poller.max_attempts == 0 {
            errors.push("poller.max_attempts must be greater than 0");
        }
        if self.poller.floor_ms == 0 {
            errors.push("poller.floor_ms must be greater than 0");
        }
        if self.poller.floor_ms > self.poller.mid_ms {
            errors.push("poller.floor_ms must not exceed poller.mid_ms");
        }
        if self.poller.mid_ms > self.poller.ceiling_ms {
            errors.push("poller.mid_ms must not exceed poller.ceiling_ms");
        }
        if self.poller.early_threshold_secs >= self.poller.late_threshold_secs {
            errors.push("poller.early_threshold_secs must be below poller.late_threshold_secs");
        }
        if self.persistence.capacity == 0 {
            errors.push("persistence.capacity must be greater than 0");
        }
        if self.persistence.retention_days == 0 {
            errors.push("persistence.retention_days must be greater than 0");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ForgeError::Config(errors.join("; ")))
        }
    }
}

/// Adaptive polling intervals: cheap frequent checks while a job is young,
/// widening as elapsed time grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollerConfig {
    pub floor_ms: u64,
    pub mid_ms: u64,
    pub ceiling_ms: u64,
    pub early_threshold_secs: u64,
    pub late_threshold_secs: u64,
    pub max_attempts: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            floor_ms: 1_000,
            mid_ms: 2_000,
            ceiling_ms: 3_000,
            early_threshold_secs: 20,
            late_threshold_secs: 60,
            max_attempts: 60,
        }
    }
}

impl PollerConfig {
    pub fn floor(&self) -> Duration {
        Duration::from_millis(self.floor_ms)
    }

    pub fn mid(&self) -> Duration {
        Duration::from_millis(self.mid_ms)
    }

    pub fn ceiling(&self) -> Duration {
        Duration::from_millis(self.ceiling_ms)
    }

    pub fn early_threshold(&self) -> Duration {
        Duration::from_secs(self.early_threshold_secs)
    }

    pub fn late_threshold(&self) -> Duration {
        Duration::from_secs(self.late_threshold_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Pause between fallback attempts so rapid retries do not trip provider
    /// rate limits.
    pub attempt_delay_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            attempt_delay_ms: 1_000,
        }
    }
}

impl ResolverConfig {
    pub fn attempt_delay(&self) -> Duration {
        Duration::from_millis(self.attempt_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Maximum stored results before the compaction policy kicks in.
    pub capacity: usize,
    /// Default retention window for the expiry sweep.
    pub retention_days: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            capacity: 32,
            retention_days: 7,
        }
    }
}

impl PersistenceConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.retention_days) * 24 * 60 * 60)
    }
}
