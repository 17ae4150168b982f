//! Turns repeated OCR reads of one printed field into a single value.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::feed::OcrEngine;

use super::config::{ConsensusConfig, NumericRange};
use super::numeric::{resolve_numeric, resolve_set_number};
use super::vote::majority_vote;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Which printed field the samples were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum FieldKind {
    Hp { range: NumericRange },
    SetNumber { set_size_bound: u64 },
}

impl FieldKind {
    pub fn hp(config: &ConsensusConfig) -> Self {
        FieldKind::Hp { range: config.hp }
    }

    pub fn set_number(set_size_bound: Option<u64>, config: &ConsensusConfig) -> Self {
        FieldKind::SetNumber {
            set_size_bound: set_size_bound.unwrap_or(config.default_set_size_bound),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResolvedField {
    Number(u64),
    Text(String),
}

/// Cleans one raw sample for `kind`; `None` when nothing usable was read.
pub fn resolve_sample(raw: &str, kind: FieldKind, config: &ConsensusConfig) -> Option<ResolvedField> {
    match kind {
        FieldKind::Hp { range } => resolve_numeric(raw, &range).map(ResolvedField::Number),
        FieldKind::SetNumber { set_size_bound } => {
            resolve_set_number(raw, set_size_bound, config).map(ResolvedField::Text)
        }
    }
}

/// Cleans every sample of a complete batch and votes on the result.
pub fn reduce_samples<S: AsRef<str>>(
    samples: &[S],
    kind: FieldKind,
    config: &ConsensusConfig,
) -> Option<ResolvedField> {
    majority_vote(
        samples
            .iter()
            .map(|raw| resolve_sample(raw.as_ref(), kind, config)),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchStatus {
    /// Samples held so far.
    Collecting(usize),
    /// The batch filled up and was voted on; the collector is empty again.
    Resolved(Option<ResolvedField>),
}

/// Collects raw samples until the batch is full, then votes exactly once.
#[derive(Debug, Clone)]
pub struct OcrBatch {
    kind: FieldKind,
    capacity: usize,
    config: ConsensusConfig,
    samples: Vec<String>,
}

impl OcrBatch {
    pub fn new(kind: FieldKind, config: &ConsensusConfig) -> Self {
        let capacity = config.ocr_batch_size.max(1);
        Self {
            kind,
            capacity,
            config: config.clone(),
            samples: Vec::with_capacity(capacity),
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Adds a sample; a failed read should be pushed as an empty string so it
    /// still takes a slot in the batch.
    pub fn push(&mut self, sample: impl Into<String>) -> BatchStatus {
        self.samples.push(sample.into());
        if self.samples.len() < self.capacity {
            return BatchStatus::Collecting(self.samples.len());
        }

        let samples = std::mem::take(&mut self.samples);
        let resolved = reduce_samples(&samples, self.kind, &self.config);
        log_debug!(
            "ocr batch of {} samples for {:?} resolved to {:?}",
            samples.len(),
            self.kind,
            resolved
        );
        BatchStatus::Resolved(resolved)
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Sends 1..=batch-size crops of one field to the OCR engine and votes on
/// the decoded texts. Crops the engine returned no text for count as empty.
pub async fn decode_field(
    engine: &dyn OcrEngine,
    crops: &[Vec<u8>],
    kind: FieldKind,
    config: &ConsensusConfig,
) -> Result<Option<ResolvedField>> {
    if crops.is_empty() {
        bail!("at least one crop is required");
    }
    if crops.len() > config.ocr_batch_size {
        bail!(
            "{} crops exceed the batch size of {}",
            crops.len(),
            config.ocr_batch_size
        );
    }

    let mut texts = engine
        .recognize(crops)
        .await
        .context("ocr request failed")?;
    texts.resize(crops.len(), String::new());

    Ok(reduce_samples(&texts, kind, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FeedError;
    use async_trait::async_trait;

    struct ScriptedOcr(Vec<String>);

    #[async_trait]
    impl OcrEngine for ScriptedOcr {
        async fn recognize(&self, _crops: &[Vec<u8>]) -> Result<Vec<String>, FeedError> {
            Ok(self.0.clone())
        }
    }

    struct FailingOcr;

    #[async_trait]
    impl OcrEngine for FailingOcr {
        async fn recognize(&self, _crops: &[Vec<u8>]) -> Result<Vec<String>, FeedError> {
            Err(FeedError::Transport("connection reset".into()))
        }
    }

    #[test]
    fn hp_samples_vote_after_cleaning() {
        let config = ConsensusConfig::default();
        let samples = ["HP120", "1200", "120", "2920", ""];
        // "1200" cleans to 200, "2920" to nothing: 120 wins 2 to 1
        assert_eq!(
            reduce_samples(&samples, FieldKind::hp(&config), &config),
            Some(ResolvedField::Number(120))
        );
    }

    #[test]
    fn set_number_samples_vote_on_cleaned_prefix() {
        let config = ConsensusConfig::default();
        let samples = ["58/102", "581/102", "58/10", "5B/102"];
        assert_eq!(
            reduce_samples(&samples, FieldKind::set_number(Some(102), &config), &config),
            Some(ResolvedField::Text("58".into()))
        );
    }

    #[test]
    fn batch_votes_once_when_full() {
        let config = ConsensusConfig {
            ocr_batch_size: 3,
            ..ConsensusConfig::default()
        };
        let mut batch = OcrBatch::new(FieldKind::hp(&config), &config);
        assert_eq!(batch.push("90"), BatchStatus::Collecting(1));
        assert_eq!(batch.push(""), BatchStatus::Collecting(2));
        assert_eq!(batch.push("90"), BatchStatus::Resolved(Some(ResolvedField::Number(90))));
        assert!(batch.is_empty());
    }

    #[test]
    fn all_empty_batch_resolves_absent() {
        let config = ConsensusConfig {
            ocr_batch_size: 2,
            ..ConsensusConfig::default()
        };
        let mut batch = OcrBatch::new(FieldKind::set_number(None, &config), &config);
        batch.push("");
        assert_eq!(batch.push("  "), BatchStatus::Resolved(None));
    }

    #[tokio::test]
    async fn decode_field_pads_missing_texts() {
        let config = ConsensusConfig::default();
        let engine = ScriptedOcr(vec!["70".into()]);
        let crops = vec![vec![0u8]; 4];
        let value = decode_field(&engine, &crops, FieldKind::hp(&config), &config)
            .await
            .expect("decode should succeed");
        assert_eq!(value, Some(ResolvedField::Number(70)));
    }

    #[tokio::test]
    async fn decode_field_rejects_bad_crop_counts() {
        let config = ConsensusConfig::default();
        let engine = ScriptedOcr(Vec::new());
        assert!(decode_field(&engine, &[], FieldKind::hp(&config), &config)
            .await
            .is_err());
        let too_many = vec![vec![0u8]; config.ocr_batch_size + 1];
        assert!(decode_field(&engine, &too_many, FieldKind::hp(&config), &config)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn decode_field_surfaces_engine_failure() {
        let config = ConsensusConfig::default();
        let err = decode_field(&FailingOcr, &[vec![1u8]], FieldKind::hp(&config), &config)
            .await
            .expect_err("engine failure must propagate");
        assert!(format!("{err:#}").contains("connection reset"));
    }
}
