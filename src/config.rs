//! Configuration for a process group.

use std::path::Path;
use std::time::Duration;

use crate::error::{CausalError, CausalResult, ConfigError};

/// Bootstrap parameters shared by every process in a run.
///
/// Deserialises from JSON; missing fields fall back to [`Default`]. Delays
/// are given in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Number of participating processes. Fixed for the run, at least 2.
    pub num_processes: usize,

    /// Delay applied to every send that does not specify its own.
    #[serde(with = "millis")]
    pub default_delay: Duration,

    /// Upper bound on each pending queue. `None` leaves queues unbounded.
    pub pending_capacity: Option<usize>,

    /// Extra random delay in `[0, jitter]` added per envelope by the
    /// simulated network.
    #[serde(with = "millis")]
    pub jitter: Duration,

    /// Seed for the simulated network's jitter.
    pub seed: u64,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            num_processes: 4,
            default_delay: Duration::from_millis(10),
            pending_capacity: None,
            jitter: Duration::ZERO,
            seed: 12345,
        }
    }
}

impl GroupConfig {
    /// Create a configuration for `num_processes` with default delays.
    pub fn new(num_processes: usize) -> Self {
        Self { num_processes, ..Default::default() }
    }

    /// Set the default per-send delay.
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    /// Bound every pending queue.
    pub fn with_pending_capacity(mut self, capacity: usize) -> Self {
        self.pending_capacity = Some(capacity);
        self
    }

    /// Set the simulated network's jitter.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> CausalResult<()> {
        if self.num_processes < 2 {
            return Err(CausalError::InvalidConfig(format!(
                "num_processes must be at least 2, got {}",
                self.num_processes
            )));
        }
        if self.pending_capacity == Some(0) {
            return Err(CausalError::InvalidConfig("pending_capacity must be positive".into()));
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> CausalResult<Self> {
        let config: GroupConfig = serde_json::from_str(json).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> CausalResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&json)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
