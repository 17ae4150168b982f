use crate::feed::ConfidenceGate;

use super::config::ConsensusConfig;
use super::ocr::{BatchStatus, FieldKind, OcrBatch, ResolvedField};

#[derive(Debug, Clone, PartialEq)]
pub enum FieldReading {
    /// No card is steadily in view; samples are not being collected.
    Waiting,
    Collecting(usize),
    Resolved(Option<ResolvedField>),
}

/// Feeds per-frame OCR text into a batch only while the classifier is
/// confident a card is present. Losing the card discards the partial batch.
#[derive(Debug, Clone)]
pub struct FieldReader {
    gate: ConfidenceGate,
    batch: OcrBatch,
}

impl FieldReader {
    pub fn new(kind: FieldKind, config: &ConsensusConfig, window: usize, threshold: f64) -> Self {
        Self {
            gate: ConfidenceGate::new(window, threshold),
            batch: OcrBatch::new(kind, config),
        }
    }

    pub fn observe(&mut self, confidence: f64, text: impl Into<String>) -> FieldReading {
        if !self.gate.push(confidence) {
            self.batch.clear();
            return FieldReading::Waiting;
        }

        match self.batch.push(text) {
            BatchStatus::Collecting(held) => FieldReading::Collecting(held),
            BatchStatus::Resolved(value) => FieldReading::Resolved(value),
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.batch.kind()
    }

    pub fn reset(&mut self) {
        self.gate.reset();
        self.batch.clear();
    }
}
