use serde::{Deserialize, Serialize};

/// Hysteresis thresholds for the detection tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Frames kept in the sliding window
    pub window_size: usize,

    /// Ranked ticks an identity needs before it counts as confirmed
    pub confirm_threshold: u32,

    /// Ticks of absence after which a tracked identity is forgotten
    pub forget_threshold: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            confirm_threshold: 3,
            forget_threshold: 40,
        }
    }
}
