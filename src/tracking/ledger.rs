//! Per-identity sighting counters and the exactly-once price ledger.
//!
//! Lifecycle of a tracked identity: unseen -> seen (count below threshold)
//! -> confirmed. There is no explicit "gone" state; an identity that stays out
//! of the ranking for longer than the forget threshold is dropped, which lets
//! the same card be counted again when it comes back.
//!
//! Prices arrive asynchronously. A confirmation that happens before the
//! card's price is known is remembered as pending and credited as soon as
//! [`TrackingLedger::record_prices`] delivers the price.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::models::{PriceQuote, RankedCandidate};

use super::config::TrackingConfig;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedItem {
    pub identity_key: String,
    pub seen_count: u32,
    pub last_frame_index: u64,
    pub confirmed: bool,
    /// Whether this confirmation has been added to the total.
    pub credited: bool,
}

impl TrackedItem {
    fn new(identity_key: String, frame_index: u64) -> Self {
        Self {
            identity_key,
            seen_count: 1,
            last_frame_index: frame_index,
            confirmed: false,
            credited: false,
        }
    }

    pub fn awaiting_price(&self) -> bool {
        self.confirmed && !self.credited
    }
}

/// What a single tick or price update changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub confirmed: Vec<String>,
    pub credited: Vec<(String, f64)>,
    pub evicted: Vec<String>,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct TrackingLedger {
    config: TrackingConfig,
    items: HashMap<String, TrackedItem>,
    prices: HashMap<String, f64>,
    total: f64,
}

impl TrackingLedger {
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            items: HashMap::new(),
            prices: HashMap::new(),
            total: 0.0,
        }
    }

    /// Applies one ranked tick, then sweeps every tracked identity for staleness.
    ///
    /// Malformed candidates are skipped; they never abort the tick.
    pub fn observe(&mut self, frame_index: u64, candidates: &[RankedCandidate]) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let mut seen_this_tick: HashSet<&str> = HashSet::new();

        for candidate in candidates {
            if !candidate.is_well_formed() {
                log_warn!(
                    "skipping malformed candidate {:?} at frame {}",
                    candidate.display_name,
                    frame_index
                );
                outcome.skipped += 1;
                continue;
            }
            if !seen_this_tick.insert(candidate.identity_key.as_str()) {
                continue;
            }

            let key = candidate.identity_key.as_str();
            let item = self
                .items
                .entry(key.to_string())
                .and_modify(|item| {
                    item.seen_count = item.seen_count.saturating_add(1);
                    item.last_frame_index = frame_index;
                })
                .or_insert_with(|| TrackedItem::new(key.to_string(), frame_index));

            if !item.confirmed && item.seen_count >= self.config.confirm_threshold {
                item.confirmed = true;
                outcome.confirmed.push(key.to_string());
                log_info!(
                    "confirmed {:?} after {} ticks at frame {}",
                    candidate.display_name,
                    item.seen_count,
                    frame_index
                );
            }

            if item.awaiting_price() {
                if let Some(&price) = self.prices.get(key) {
                    item.credited = true;
                    self.total += price;
                    outcome.credited.push((key.to_string(), price));
                    log_info!(
                        "credited {:.2} for {:?}; total {:.2}",
                        price,
                        candidate.display_name,
                        self.total
                    );
                }
            }
        }

        outcome.evicted = self.sweep(frame_index);
        outcome
    }

    /// Stores newly resolved prices and credits every confirmed identity that
    /// was waiting on one. Quotes without a usable price are ignored.
    pub fn record_prices(&mut self, quotes: &[PriceQuote]) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        for quote in quotes {
            let Some(price) = quote.known_price() else {
                outcome.skipped += 1;
                continue;
            };
            let key = quote.identity_key();
            self.prices.insert(key.clone(), price);

            if let Some(item) = self.items.get_mut(&key) {
                if item.awaiting_price() {
                    item.credited = true;
                    self.total += price;
                    log_info!(
                        "late price {:.2} credited for {:?}; total {:.2}",
                        price,
                        quote.name,
                        self.total
                    );
                    outcome.credited.push((key, price));
                }
            }
        }

        outcome
    }

    fn sweep(&mut self, frame_index: u64) -> Vec<String> {
        let forget = self.config.forget_threshold;
        let stale: Vec<String> = self
            .items
            .values()
            .filter(|item| frame_index.saturating_sub(item.last_frame_index) > forget)
            .map(|item| item.identity_key.clone())
            .collect();

        for key in &stale {
            self.items.remove(key);
            log_debug!("forgot {:?} at frame {}", key, frame_index);
        }
        stale
    }

    pub fn item(&self, identity_key: &str) -> Option<&TrackedItem> {
        self.items.get(identity_key)
    }

    pub fn items(&self) -> impl Iterator<Item = &TrackedItem> {
        self.items.values()
    }

    pub fn is_confirmed(&self, identity_key: &str) -> bool {
        self.items
            .get(identity_key)
            .map_or(false, |item| item.confirmed)
    }

    pub fn price(&self, identity_key: &str) -> Option<f64> {
        self.prices.get(identity_key).copied()
    }

    pub fn has_price(&self, identity_key: &str) -> bool {
        self.prices.contains_key(identity_key)
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn config(&self) -> &TrackingConfig {
        &self.config
    }

    /// Drops every tracked identity, every known price and the total.
    pub fn reset(&mut self) {
        self.items.clear();
        self.prices.clear();
        self.total = 0.0;
    }
}
