//! Recovers plausible printed numbers from noisy OCR text.
//!
//! OCR on small card text tends to fuse neighbouring glyphs into the number
//! ("2920" for an HP of 290 next to a stray "0"). The rules here encode
//! properties of the printed values, not of the OCR engine.

use super::config::{ConsensusConfig, NumericRange};

/// First maximal run of ASCII digits in `raw`.
pub fn first_digit_run(raw: &str) -> Option<&str> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let rest = &raw[start..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Resolves a raw OCR string to an in-range value.
///
/// In-range values are accepted as-is. Values above the range are treated as
/// a digit-merge artifact and corrected to `v / 10` or `v % 1000`, keeping the
/// largest candidate that is in range and a multiple of `range.multiple`.
/// Values below the range are too unreliable to guess and resolve to `None`.
pub fn resolve_numeric(raw: &str, range: &NumericRange) -> Option<u64> {
    // A run too long for u64 is noise, not a number.
    let value: u64 = first_digit_run(raw)?.parse().ok()?;

    if range.contains(value) {
        return Some(value);
    }
    if value < range.min {
        return None;
    }

    [value / 10, value % 1000]
        .into_iter()
        .filter(|candidate| range.contains(*candidate) && range.is_multiple(*candidate))
        .max()
}

/// Cleans the card-number part of a set number such as `"58/102"`.
///
/// Keeps the text before the first `/`, cut to `set_number_max_digits`
/// characters. When that prefix parses above `set_size_bound` it is cut to
/// `set_number_fallback_digits` instead: a third digit on a number from a
/// small set is almost always a fused glyph.
pub fn resolve_set_number(raw: &str, set_size_bound: u64, config: &ConsensusConfig) -> Option<String> {
    let before_slash = raw.split('/').next().unwrap_or_default().trim();
    let mut prefix: String = before_slash
        .chars()
        .take(config.set_number_max_digits)
        .collect();

    let overshoots = first_digit_run(&prefix)
        .and_then(|digits| digits.parse::<u64>().ok())
        .map_or(false, |value| value > set_size_bound);
    if overshoots {
        prefix = prefix
            .chars()
            .take(config.set_number_fallback_digits)
            .collect();
    }

    let prefix = prefix.trim();
    if prefix.is_empty() {
        None
    } else {
        Some(prefix.to_string())
    }
}
