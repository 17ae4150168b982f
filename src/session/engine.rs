//! One scanning session's tracking state: the sliding window, the ledger
//! and the bookkeeping for outstanding price lookups.
//!
//! The engine is plain synchronous state. Callers that share it between
//! tasks wrap it in a single mutex; the update rate is a handful per second.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use serde_json::Value;

use crate::feed::{normalize_response, FeedError};
use crate::models::{
    CardRef, DetectionEvent, FrameBatch, PriceQuote, PricedCandidate, RankedCandidate,
    ScanSnapshot,
};
use crate::tracking::{DetectionWindow, TickOutcome, TrackingConfig, TrackingLedger};

/// Result of feeding one classifier response through the window and ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    pub frame_index: u64,
    pub detections: usize,
    pub ranked: usize,
    pub tick: TickOutcome,
}

#[derive(Debug)]
pub struct ScanEngine {
    window: DetectionWindow,
    ledger: TrackingLedger,
    frame_index: u64,
    ranked: Vec<RankedCandidate>,
    session_id: Option<String>,
    /// Bumped on every reset so responses issued before it can be told apart.
    epoch: u64,
    price_in_flight: HashSet<String>,
    /// Identity -> frame index before which an unknown price is not retried.
    price_retry_at: HashMap<String, u64>,
    price_retry_ticks: u64,
}

impl ScanEngine {
    pub fn new(config: TrackingConfig, price_retry_ticks: u64) -> Self {
        Self {
            window: DetectionWindow::new(config.window_size),
            ledger: TrackingLedger::new(config),
            frame_index: 0,
            ranked: Vec::new(),
            session_id: None,
            epoch: 0,
            price_in_flight: HashSet::new(),
            price_retry_at: HashMap::new(),
            price_retry_ticks,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn ledger(&self) -> &TrackingLedger {
        &self.ledger
    }

    pub fn ranked(&self) -> &[RankedCandidate] {
        &self.ranked
    }

    pub fn total(&self) -> f64 {
        self.ledger.total()
    }

    /// Normalizes a raw classifier response and runs it as the next tick.
    /// A malformed response is rejected without consuming a tick.
    pub fn ingest_response(&mut self, response: &Value) -> Result<IngestOutcome, FeedError> {
        let batch = normalize_response(response, self.frame_index + 1)?;
        Ok(self.ingest_batch(batch.detections))
    }

    /// Runs one tick: window update, ranking, ledger update and sweep.
    pub fn ingest_batch(&mut self, detections: Vec<DetectionEvent>) -> IngestOutcome {
        self.frame_index += 1;
        let batch = FrameBatch::new(self.frame_index, detections);
        let detections = batch.len();

        self.ranked = self.window.push(batch);
        let tick = self.ledger.observe(self.frame_index, &self.ranked);
        for key in &tick.evicted {
            self.price_retry_at.remove(key);
        }

        IngestOutcome {
            frame_index: self.frame_index,
            detections,
            ranked: self.ranked.len(),
            tick,
        }
    }

    /// Cards that need a price: ranked candidates plus confirmed identities
    /// still waiting to be credited, minus those already known, in flight
    /// or backing off after an unknown answer. Returned cards are marked in
    /// flight until [`Self::apply_prices`] or [`Self::release_price_requests`].
    pub fn take_price_requests(&mut self) -> Vec<CardRef> {
        let mut wanted: Vec<CardRef> = self.ranked.iter().map(CardRef::from).collect();
        wanted.extend(
            self.ledger
                .items()
                .filter(|item| item.awaiting_price())
                .filter_map(|item| CardRef::from_identity_key(&item.identity_key)),
        );

        let mut requests = Vec::new();
        for card in wanted {
            let key = card.identity_key();
            let backing_off = self
                .price_retry_at
                .get(&key)
                .map_or(false, |retry_at| self.frame_index < *retry_at);
            if self.ledger.has_price(&key) || backing_off || self.price_in_flight.contains(&key) {
                continue;
            }
            self.price_in_flight.insert(key);
            requests.push(card);
        }
        requests
    }

    /// Records a price response for `requested`. Cards the response left out
    /// stay unknown and are retried after the back-off.
    pub fn apply_prices(&mut self, requested: &[CardRef], quotes: &[PriceQuote]) -> TickOutcome {
        let outcome = self.ledger.record_prices(quotes);
        let retry_at = self.frame_index + self.price_retry_ticks;

        for card in requested {
            let key = card.identity_key();
            self.price_in_flight.remove(&key);
            if self.ledger.has_price(&key) {
                self.price_retry_at.remove(&key);
            } else {
                self.price_retry_at.insert(key, retry_at);
            }
        }
        outcome
    }

    /// Forgets that `requested` is in flight, after a failed lookup.
    pub fn release_price_requests(&mut self, requested: &[CardRef]) {
        for card in requested {
            self.price_in_flight.remove(&card.identity_key());
        }
    }

    pub fn snapshot(&self) -> ScanSnapshot {
        let candidates = self
            .ranked
            .iter()
            .map(|candidate| PricedCandidate {
                price: self.ledger.price(&candidate.identity_key),
                confirmed: self.ledger.is_confirmed(&candidate.identity_key),
                candidate: candidate.clone(),
            })
            .collect();

        ScanSnapshot {
            session_id: self.session_id.clone(),
            frame_index: self.frame_index,
            candidates,
            total: self.ledger.total(),
            updated_at: Utc::now(),
        }
    }

    /// Clears every piece of session state and starts a new epoch.
    pub fn reset(&mut self, session_id: Option<String>) {
        self.window.clear();
        self.ledger.reset();
        self.frame_index = 0;
        self.ranked.clear();
        self.price_in_flight.clear();
        self.price_retry_at.clear();
        self.session_id = session_id;
        self.epoch = self.epoch.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> ScanEngine {
        ScanEngine::new(TrackingConfig::default(), 10)
    }

    fn pikachu() -> Value {
        json!({"name": "Pikachu", "set_id": "base1-58", "score": 4.0})
    }

    fn tick(engine: &mut ScanEngine, response: Value) -> IngestOutcome {
        engine.ingest_response(&response).expect("valid response")
    }

    fn pikachu_ref() -> CardRef {
        CardRef {
            name: "Pikachu".into(),
            set_id: "base1-58".into(),
        }
    }

    #[test]
    fn empty_responses_advance_ticks_without_candidates() {
        let mut engine = engine();
        let outcome = engine.ingest_response(&json!({"match": null})).expect("valid");
        assert_eq!(outcome.frame_index, 1);
        assert_eq!(outcome.ranked, 0);
        assert!(engine.snapshot().candidates.is_empty());
    }

    #[test]
    fn confirmation_then_late_price_updates_total() {
        let mut engine = engine();
        for _ in 0..3 {
            tick(&mut engine, pikachu());
        }
        let snapshot = engine.snapshot();
        assert!(snapshot.candidates[0].confirmed);
        assert_eq!(snapshot.candidates[0].price, None);
        assert_eq!(snapshot.total, 0.0);

        let requested = engine.take_price_requests();
        assert_eq!(requested, vec![pikachu_ref()]);
        engine.apply_prices(
            &requested,
            &[PriceQuote::new("Pikachu", "base1-58", Some(3.25))],
        );

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.candidates[0].price, Some(3.25));
        assert_eq!(snapshot.total, 3.25);
    }

    #[test]
    fn price_requests_are_not_duplicated_while_in_flight() {
        let mut engine = engine();
        tick(&mut engine, pikachu());
        assert_eq!(engine.take_price_requests().len(), 1);
        tick(&mut engine, pikachu());
        assert!(engine.take_price_requests().is_empty());

        engine.release_price_requests(&[pikachu_ref()]);
        assert_eq!(engine.take_price_requests().len(), 1);
    }

    #[test]
    fn unknown_price_backs_off_before_retry() {
        let mut engine = engine();
        tick(&mut engine, pikachu());
        let requested = engine.take_price_requests();
        engine.apply_prices(&requested, &[]);

        for _ in 0..9 {
            tick(&mut engine, pikachu());
            assert!(engine.take_price_requests().is_empty());
        }
        tick(&mut engine, pikachu());
        assert_eq!(engine.take_price_requests(), vec![pikachu_ref()]);
    }

    #[test]
    fn confirmed_card_out_of_ranking_still_gets_priced() {
        let mut engine = engine();
        for _ in 0..3 {
            tick(&mut engine, pikachu());
        }
        let first = engine.take_price_requests();
        engine.release_price_requests(&first);

        // Window of five empty frames pushes Pikachu out of the ranking.
        for _ in 0..5 {
            tick(&mut engine, json!([]));
        }
        assert!(engine.ranked().is_empty());
        assert_eq!(engine.take_price_requests(), vec![pikachu_ref()]);
    }

    #[test]
    fn reset_clears_state_and_bumps_epoch() {
        let mut engine = engine();
        engine.apply_prices(&[], &[PriceQuote::new("Pikachu", "base1-58", Some(1.0))]);
        for _ in 0..3 {
            tick(&mut engine, pikachu());
        }
        assert_eq!(engine.total(), 1.0);
        let epoch = engine.epoch();

        engine.reset(Some("next".into()));
        assert_eq!(engine.epoch(), epoch + 1);
        assert_eq!(engine.total(), 0.0);
        assert_eq!(engine.frame_index(), 0);
        assert!(engine.ranked().is_empty());
        assert_eq!(engine.session_id(), Some("next"));
    }

    #[test]
    fn malformed_response_does_not_consume_a_tick() {
        let mut engine = engine();
        tick(&mut engine, pikachu());
        let err = engine
            .ingest_response(&json!("not a detection"))
            .expect_err("scalar rejected");
        assert!(matches!(err, FeedError::MalformedResponse(_)));
        assert_eq!(engine.frame_index(), 1);
        assert_eq!(engine.ranked().len(), 1);
    }

    #[test]
    fn forgotten_card_drops_its_price_back_off() {
        let mut engine = engine();
        tick(&mut engine, pikachu());
        let requested = engine.take_price_requests();
        engine.apply_prices(&requested, &[]);
        assert!(engine.price_retry_at.contains_key(&pikachu_ref().identity_key()));

        // last seen at frame 1; frame 42 is more than 40 ticks later
        let mut evicted = Vec::new();
        for _ in 0..41 {
            evicted.extend(tick(&mut engine, json!([])).tick.evicted);
        }
        assert_eq!(evicted, vec![pikachu_ref().identity_key()]);
        assert!(engine.price_retry_at.is_empty());

        tick(&mut engine, pikachu());
        assert_eq!(engine.take_price_requests(), vec![pikachu_ref()]);
    }
}
