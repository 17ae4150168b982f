use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};

const DATA_URL_MARKER: &str = ";base64,";

/// One encoded camera frame (JPEG bytes) handed to the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub bytes: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            captured_at: Utc::now(),
        }
    }

    /// Decodes a base64 frame, with or without a `data:image/...;base64,` prefix.
    pub fn from_data_url(encoded: &str) -> Result<Self> {
        let payload = match encoded.find(DATA_URL_MARKER) {
            Some(idx) if encoded.starts_with("data:") => &encoded[idx + DATA_URL_MARKER.len()..],
            _ => encoded,
        };
        let bytes = general_purpose::STANDARD
            .decode(payload.trim())
            .context("frame payload is not valid base64")?;
        Ok(Self::new(bytes))
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/jpeg;base64,{}",
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }
}
