use serde::{Deserialize, Serialize};

/// Accepted bounds for a printed numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NumericRange {
    pub min: u64,
    pub max: u64,
    /// Printed values are always a multiple of this; `0` or `1` disables the check.
    pub multiple: u64,
}

impl NumericRange {
    /// Card HP as printed: 30..=340 in steps of 10.
    pub const HP: NumericRange = NumericRange {
        min: 30,
        max: 340,
        multiple: 10,
    };

    pub fn contains(&self, value: u64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn is_multiple(&self, value: u64) -> bool {
        self.multiple <= 1 || value % self.multiple == 0
    }
}

impl Default for NumericRange {
    fn default() -> Self {
        Self::HP
    }
}

/// Configuration for the OCR consensus path with tunable thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    /// Samples collected before a batch is voted on
    pub ocr_batch_size: usize,

    /// Accepted HP range
    pub hp: NumericRange,

    /// Set-number prefix is cut to this many characters
    pub set_number_max_digits: usize,

    /// ...or to this many when the prefix overshoots the set size
    pub set_number_fallback_digits: usize,

    /// Set-size bound used when the caller does not know the set size
    pub default_set_size_bound: u64,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            ocr_batch_size: 10,
            hp: NumericRange::HP,
            set_number_max_digits: 3,
            set_number_fallback_digits: 2,
            default_set_size_bound: 300,
        }
    }
}
