use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::feed::{ClassifierFeed, FeedError, FrameSource, PriceLookup};
use crate::models::{CardRef, ScanSnapshot};
use crate::session::ScanEngine;

use super::gate::{InFlightGate, InFlightPermit};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at crate root)
use crate::{log_debug, log_error, log_info, log_warn};

/// Everything one ingestion loop talks to.
pub struct IngestionContext {
    pub engine: Arc<Mutex<ScanEngine>>,
    pub frames: Arc<dyn FrameSource>,
    pub classifier: Arc<dyn ClassifierFeed>,
    pub prices: Arc<dyn PriceLookup>,
    pub snapshots: watch::Sender<ScanSnapshot>,
    pub frame_interval: Duration,
    pub request_timeout: Duration,
}

impl IngestionContext {
    fn publish(&self, snapshot: ScanSnapshot) {
        self.snapshots.send_replace(snapshot);
    }

    /// Runs one collaborator call, turning an elapsed `request_timeout` into
    /// [`FeedError::Timeout`].
    async fn timed<T>(
        &self,
        call: impl Future<Output = Result<T, FeedError>>,
    ) -> Result<T, FeedError> {
        tokio::time::timeout(self.request_timeout, call)
            .await
            .unwrap_or_else(|_| Err(FeedError::Timeout(self.request_timeout)))
    }
}

/// Fixed-period capture loop with at most one classifier request in flight.
///
/// A tick that finds the previous request still running is skipped. A
/// failed request is logged and dropped; the next tick retries. Responses
/// are applied only while the engine is still on `epoch`, so nothing from a
/// stopped session leaks into the next one.
pub async fn ingestion_loop(
    ctx: Arc<IngestionContext>,
    epoch: u64,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(ctx.frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let gate = InFlightGate::new();
    let mut requests: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("ingestion loop shutting down");
                break;
            }
            Some(joined) = requests.join_next(), if !requests.is_empty() => {
                if let Err(err) = joined {
                    if err.is_panic() {
                        log_error!("ingestion request panicked: {err}");
                    }
                }
            }
            _ = ticker.tick() => {
                let Some(permit) = gate.try_acquire() else {
                    log_debug!("classifier request still in flight; skipping tick");
                    continue;
                };
                requests.spawn(run_request(Arc::clone(&ctx), permit, epoch));
            }
        }
    }

    requests.shutdown().await;
}

async fn run_request(ctx: Arc<IngestionContext>, permit: InFlightPermit, epoch: u64) {
    let request_start = Instant::now();

    let pending_prices = match classify_and_ingest(&ctx, epoch).await {
        Ok(Some(cards)) => cards,
        Ok(None) => return,
        Err(err) => {
            log_error!(
                "classifier tick failed after {}ms: {err:#}",
                request_start.elapsed().as_millis()
            );
            return;
        }
    };

    // Price lookups must not hold up the next classifier request.
    drop(permit);

    if !pending_prices.is_empty() {
        resolve_prices(&ctx, pending_prices, epoch).await;
    }
}

/// Captures, classifies and ingests one frame. Returns the cards whose
/// price should be looked up, or `None` when there was nothing to do.
async fn classify_and_ingest(ctx: &IngestionContext, epoch: u64) -> Result<Option<Vec<CardRef>>> {
    let Some(frame) = ctx
        .timed(ctx.frames.capture())
        .await
        .context("frame capture failed")?
    else {
        log_debug!("no frame available; skipping tick");
        return Ok(None);
    };

    let response = ctx
        .timed(ctx.classifier.classify(&frame))
        .await
        .context("classifier request failed")?;

    let mut engine = ctx.engine.lock().await;
    if engine.epoch() != epoch {
        log_debug!("dropping classifier response from a previous session");
        return Ok(None);
    }

    let outcome = engine
        .ingest_response(&response)
        .context("classifier response rejected")?;
    log_debug!(
        "frame {}: {} detections, {} ranked, {} confirmed, {} evicted",
        outcome.frame_index,
        outcome.detections,
        outcome.ranked,
        outcome.tick.confirmed.len(),
        outcome.tick.evicted.len()
    );

    let pending = engine.take_price_requests();
    ctx.publish(engine.snapshot());
    Ok(Some(pending))
}

async fn resolve_prices(ctx: &IngestionContext, cards: Vec<CardRef>, epoch: u64) {
    let result = ctx.timed(ctx.prices.lookup(&cards)).await;

    let mut engine = ctx.engine.lock().await;
    if engine.epoch() != epoch {
        return;
    }

    match result {
        Ok(quotes) => {
            let outcome = engine.apply_prices(&cards, &quotes);
            if !outcome.credited.is_empty() {
                log_info!(
                    "price update credited {} cards; total {:.2}",
                    outcome.credited.len(),
                    engine.total()
                );
            }
            ctx.publish(engine.snapshot());
        }
        Err(FeedError::Timeout(limit)) => {
            log_warn!(
                "price lookup timeout (> {}ms) for {} cards",
                limit.as_millis(),
                cards.len()
            );
            engine.release_price_requests(&cards);
        }
        Err(err) => {
            log_warn!("price lookup for {} cards failed: {err}", cards.len());
            engine.release_price_requests(&cards);
        }
    }
}
