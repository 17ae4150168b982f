use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;

use crate::models::{CardRef, PriceQuote};

use super::{FeedError, PriceLookup};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Price variants in the order they are preferred when a card lists several.
pub const PRICE_VARIANT_PRIORITY: [&str; 5] = [
    "normal",
    "1stEditionNormal",
    "reverseHolofoil",
    "holofoil",
    "1stEditionHolofoil",
];

/// Picks the market price of the first available variant from a
/// `{"normal": {"market": 1.2}, "holofoil": {...}}` style price table.
pub fn select_variant_price(prices: &Value) -> Option<f64> {
    PRICE_VARIANT_PRIORITY
        .iter()
        .filter_map(|variant| prices.get(variant)?.get("market")?.as_f64())
        .find(|price| price.is_finite() && *price >= 0.0)
}

/// Builds the quote for `card` from a catalog card record, whose variant
/// table sits under `tcgplayer.prices`. A record without a usable variant
/// yields an unknown price.
pub fn quote_from_card_record(card: &CardRef, record: &Value) -> PriceQuote {
    let price = record
        .pointer("/tcgplayer/prices")
        .and_then(select_variant_price);
    PriceQuote::new(card.name.clone(), card.set_id.clone(), price)
}

struct CachedPrice {
    quote: PriceQuote,
    stored_at: Instant,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CachedPrice>,
    order: VecDeque<String>,
}

/// Caches known prices in front of another [`PriceLookup`].
///
/// Entries expire after `ttl`; once `capacity` is exceeded the oldest
/// inserted entry goes first. Unknown prices are never cached so they are
/// asked for again next time.
pub struct PriceCache {
    inner: Arc<dyn PriceLookup>,
    ttl: Duration,
    capacity: usize,
    state: Mutex<CacheState>,
}

impl PriceCache {
    pub fn new(inner: Arc<dyn PriceLookup>, ttl: Duration, capacity: usize) -> Self {
        Self {
            inner,
            ttl,
            capacity: capacity.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn split_cached(&self, cards: &[CardRef]) -> (Vec<PriceQuote>, Vec<CardRef>) {
        let now = Instant::now();
        let mut state = self.lock();
        let mut hits = Vec::new();
        let mut misses = Vec::new();

        for card in cards {
            let key = card.identity_key();
            let fresh = state
                .entries
                .get(&key)
                .filter(|cached| now.duration_since(cached.stored_at) < self.ttl)
                .map(|cached| cached.quote.clone());

            match fresh {
                Some(quote) => hits.push(quote),
                None => {
                    if state.entries.remove(&key).is_some() {
                        state.order.retain(|k| k != &key);
                    }
                    misses.push(card.clone());
                }
            }
        }
        (hits, misses)
    }

    fn store(&self, quotes: &[PriceQuote]) {
        let now = Instant::now();
        let mut state = self.lock();

        for quote in quotes.iter().filter(|q| q.known_price().is_some()) {
            let key = quote.identity_key();
            let previous = state.entries.insert(
                key.clone(),
                CachedPrice {
                    quote: quote.clone(),
                    stored_at: now,
                },
            );
            if previous.is_none() {
                state.order.push_back(key);
            }
        }

        while state.entries.len() > self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            state.entries.remove(&oldest);
        }
    }
}

#[async_trait]
impl PriceLookup for PriceCache {
    async fn lookup(&self, cards: &[CardRef]) -> Result<Vec<PriceQuote>, FeedError> {
        let (mut quotes, misses) = self.split_cached(cards);
        if misses.is_empty() {
            return Ok(quotes);
        }

        log_debug!(
            "price cache: {} hits, {} misses",
            quotes.len(),
            misses.len()
        );
        let fetched = self.inner.lookup(&misses).await?;
        self.store(&fetched);
        quotes.extend(fetched);
        Ok(quotes)
    }
}
