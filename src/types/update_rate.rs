//! Update rate control for snapshot consumers

use serde::{Deserialize, Serialize};

/// How often a consumer wants snapshots delivered
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every published snapshot (up to the sample rate)
    Native,

    /// At most this many snapshots per second, latest wins.
    /// If the requested rate meets or exceeds the sample rate, Native is used.
    Max(u32),
}

impl Default for UpdateRate {
    fn default() -> Self {
        UpdateRate::Max(30)
    }
}

impl UpdateRate {
    /// Normalize rate against the source sample rate
    pub fn normalize(self, source_hz: f64) -> Self {
        match self {
            UpdateRate::Native => UpdateRate::Native,
            UpdateRate::Max(0) => UpdateRate::Native,
            UpdateRate::Max(hz) if hz as f64 >= source_hz => UpdateRate::Native,
            UpdateRate::Max(hz) => UpdateRate::Max(hz),
        }
    }

    /// Get throttle interval if needed
    pub fn throttle_interval(self, source_hz: f64) -> Option<std::time::Duration> {
        match self.normalize(source_hz) {
            UpdateRate::Native => None,
            UpdateRate::Max(hz) => Some(std::time::Duration::from_secs_f64(1.0 / hz as f64)),
        }
    }
}
