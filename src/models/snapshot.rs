use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::detection::RankedCandidate;

/// A ranked candidate as the view layer sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricedCandidate {
    #[serde(flatten)]
    pub candidate: RankedCandidate,
    /// `None` while the price is unknown.
    pub price: Option<f64>,
    pub confirmed: bool,
}

/// State published after every processed tick or price resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSnapshot {
    pub session_id: Option<String>,
    pub frame_index: u64,
    pub candidates: Vec<PricedCandidate>,
    pub total: f64,
    pub updated_at: DateTime<Utc>,
}

impl Default for ScanSnapshot {
    fn default() -> Self {
        Self {
            session_id: None,
            frame_index: 0,
            candidates: Vec::new(),
            total: 0.0,
            updated_at: Utc::now(),
        }
    }
}
