//! Detection data model.
//!
//! One classifier response becomes one [`FrameBatch`]; ranking the sliding
//! window of batches produces [`RankedCandidate`]s.

use serde::{Deserialize, Serialize};

/// Separator between display name and set id inside an identity key.
pub const IDENTITY_SEPARATOR: char = '\u{0}';

/// Builds the deduplication key for a physical card variant.
pub fn identity_key(display_name: &str, set_id: &str) -> String {
    format!("{display_name}{IDENTITY_SEPARATOR}{set_id}")
}

/// A single labeled detection produced by the classifier for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    pub identity_key: String,
    pub display_name: String,
    pub set_id: String,
    pub score: Option<f64>,
    pub image_ref: Option<String>,
}

impl DetectionEvent {
    pub fn new(
        display_name: impl Into<String>,
        set_id: impl Into<String>,
        score: Option<f64>,
        image_ref: Option<String>,
    ) -> Self {
        let display_name = display_name.into();
        let set_id = set_id.into();
        Self {
            identity_key: identity_key(&display_name, &set_id),
            display_name,
            set_id,
            score,
            image_ref,
        }
    }
}

/// Every detection from one classifier response, tagged with the tick that
/// produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameBatch {
    pub frame_index: u64,
    pub detections: Vec<DetectionEvent>,
}

impl FrameBatch {
    pub fn new(frame_index: u64, detections: Vec<DetectionEvent>) -> Self {
        Self {
            frame_index,
            detections,
        }
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

/// A detection identity ranked by how often it occurs across the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub identity_key: String,
    pub display_name: String,
    pub set_id: String,
    pub score: Option<f64>,
    pub image_ref: Option<String>,
    pub occurrence_count: usize,
}

impl RankedCandidate {
    /// A candidate the ledger can act on: a non-empty key and a finite score.
    pub fn is_well_formed(&self) -> bool {
        !self.identity_key.is_empty() && self.score.map_or(false, f64::is_finite)
    }
}

impl From<&DetectionEvent> for RankedCandidate {
    fn from(event: &DetectionEvent) -> Self {
        Self {
            identity_key: event.identity_key.clone(),
            display_name: event.display_name.clone(),
            set_id: event.set_id.clone(),
            score: event.score,
            image_ref: event.image_ref.clone(),
            occurrence_count: 0,
        }
    }
}

/// The name/set pair the price collaborator is queried with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardRef {
    pub name: String,
    pub set_id: String,
}

impl CardRef {
    pub fn identity_key(&self) -> String {
        identity_key(&self.name, &self.set_id)
    }

    /// Splits an identity key back into its name and set id.
    pub fn from_identity_key(key: &str) -> Option<Self> {
        let (name, set_id) = key.split_once(IDENTITY_SEPARATOR)?;
        Some(Self {
            name: name.to_string(),
            set_id: set_id.to_string(),
        })
    }
}

impl From<&RankedCandidate> for CardRef {
    fn from(candidate: &RankedCandidate) -> Self {
        Self {
            name: candidate.display_name.clone(),
            set_id: candidate.set_id.clone(),
        }
    }
}
