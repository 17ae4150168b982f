use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::consensus::ConsensusConfig;
use crate::tracking::TrackingConfig;

/// Environment switch for a slower, easier to follow capture cadence.
pub const DEBUG_ENV_VAR: &str = "CARDSCAN_DEBUG";

const DEBUG_FRAME_INTERVAL_MS: u64 = 1000;

/// Timing and gating knobs of the ingestion loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    pub frame_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub price_cache_ttl_secs: u64,
    pub price_cache_capacity: usize,
    /// Ticks to wait before asking again for a price that came back unknown
    pub price_retry_ticks: u64,
    pub confidence_threshold: f64,
    pub confidence_window: usize,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: 150,
            request_timeout_ms: 2000,
            price_cache_ttl_secs: 3600,
            price_cache_capacity: 50,
            price_retry_ticks: 10,
            confidence_threshold: 0.9,
            confidence_window: 10,
        }
    }
}

impl IngestionSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn price_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.price_cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub tracking: TrackingConfig,
    pub consensus: ConsensusConfig,
    pub ingestion: IngestionSettings,
}

impl ScannerSettings {
    /// Reads settings from a JSON file.
    ///
    /// A missing file yields defaults; a file that exists but does not parse
    /// is reported and replaced by defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!(
                "Ignoring unparsable settings in {}: {err}",
                path.display()
            );
            Self::default()
        }))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }

    /// Applies `CARDSCAN_DEBUG` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_debug_flag(std::env::var(DEBUG_ENV_VAR).ok().as_deref())
    }

    pub fn with_debug_flag(mut self, flag: Option<&str>) -> Self {
        let debug_mode = flag
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.ingestion.frame_interval_ms = DEBUG_FRAME_INTERVAL_MS;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = ScannerSettings::load(dir.path().join("absent.json")).expect("load ok");
        assert_eq!(settings, ScannerSettings::default());
        assert_eq!(settings.tracking.window_size, 5);
        assert_eq!(settings.tracking.confirm_threshold, 3);
        assert_eq!(settings.tracking.forget_threshold, 40);
        assert_eq!(settings.consensus.ocr_batch_size, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"tracking": {"confirm_threshold": 5}, "ingestion": {"frame_interval_ms": 100}}"#,
        )
        .expect("write settings");

        let settings = ScannerSettings::load(&path).expect("load ok");
        assert_eq!(settings.tracking.confirm_threshold, 5);
        assert_eq!(settings.tracking.forget_threshold, 40);
        assert_eq!(settings.ingestion.frame_interval_ms, 100);
        assert_eq!(settings.ingestion.request_timeout_ms, 2000);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        fs::write(&path, "{not json").expect("write settings");
        assert_eq!(
            ScannerSettings::load(&path).expect("load ok"),
            ScannerSettings::default()
        );
    }

    #[test]
    fn save_then_load_preserves_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("settings.json");
        let mut settings = ScannerSettings::default();
        settings.consensus.hp.max = 400;
        settings.save(&path).expect("save ok");
        assert_eq!(ScannerSettings::load(&path).expect("load ok").consensus.hp.max, 400);
    }

    #[test]
    fn debug_flag_slows_capture() {
        let settings = ScannerSettings::default().with_debug_flag(Some("true"));
        assert_eq!(settings.ingestion.frame_interval_ms, DEBUG_FRAME_INTERVAL_MS);
        let settings = ScannerSettings::default().with_debug_flag(Some("0"));
        assert_eq!(settings.ingestion.frame_interval_ms, 150);
    }
}
