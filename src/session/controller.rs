use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::info;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::consensus::{decode_field, FieldKind, FieldReader, ResolvedField};
use crate::feed::{ClassifierFeed, FrameSource, OcrEngine, PriceCache, PriceLookup};
use crate::models::ScanSnapshot;
use crate::sensing::{IngestionContext, IngestionController};
use crate::settings::ScannerSettings;

use super::engine::ScanEngine;
use super::state::{SessionState, SessionSummary};

/// The external collaborators a session is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub frames: Arc<dyn FrameSource>,
    pub classifier: Arc<dyn ClassifierFeed>,
    pub prices: Arc<dyn PriceLookup>,
    pub ocr: Arc<dyn OcrEngine>,
}

/// A scanning session with an explicit `start()`/`stop()` lifecycle.
///
/// Every instance owns its own engine, so sessions (and tests) never share
/// tracking state. Stopping halts the ingestion loop, discards whatever was
/// in flight and clears the tracker and the total before returning.
#[derive(Clone)]
pub struct ScanSession {
    state: Arc<Mutex<SessionState>>,
    engine: Arc<Mutex<ScanEngine>>,
    ingestion: Arc<Mutex<IngestionController>>,
    context: Arc<IngestionContext>,
    ocr: Arc<dyn OcrEngine>,
    settings: ScannerSettings,
}

impl ScanSession {
    pub fn new(settings: ScannerSettings, collaborators: Collaborators) -> Self {
        let engine = Arc::new(Mutex::new(ScanEngine::new(
            settings.tracking.clone(),
            settings.ingestion.price_retry_ticks,
        )));
        let prices: Arc<dyn PriceLookup> = Arc::new(PriceCache::new(
            collaborators.prices,
            settings.ingestion.price_cache_ttl(),
            settings.ingestion.price_cache_capacity,
        ));
        let (snapshots, _) = watch::channel(ScanSnapshot::default());

        let context = Arc::new(IngestionContext {
            engine: Arc::clone(&engine),
            frames: collaborators.frames,
            classifier: collaborators.classifier,
            prices,
            snapshots,
            frame_interval: settings.ingestion.frame_interval(),
            request_timeout: settings.ingestion.request_timeout(),
        });

        Self {
            state: Arc::new(Mutex::new(SessionState::new())),
            engine,
            ingestion: Arc::new(Mutex::new(IngestionController::new())),
            context,
            ocr: collaborators.ocr,
            settings,
        }
    }

    pub fn settings(&self) -> &ScannerSettings {
        &self.settings
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn snapshot(&self) -> ScanSnapshot {
        self.engine.lock().await.snapshot()
    }

    /// Receives a snapshot after every processed tick and price update.
    pub fn subscribe(&self) -> watch::Receiver<ScanSnapshot> {
        self.context.snapshots.subscribe()
    }

    pub async fn start(&self) -> Result<SessionState> {
        let mut state = self.state.lock().await;
        if state.is_running() {
            bail!("scan session already active");
        }

        let session_id = Uuid::new_v4().to_string();
        let epoch = {
            let mut engine = self.engine.lock().await;
            engine.reset(Some(session_id.clone()));
            self.context.snapshots.send_replace(engine.snapshot());
            engine.epoch()
        };

        self.ingestion
            .lock()
            .await
            .start(Arc::clone(&self.context), epoch)
            .context("failed to start ingestion")?;

        state.begin_session(session_id.clone(), Utc::now());
        info!("Scan session {session_id} started");
        Ok(state.clone())
    }

    /// Stops the session. Returns `None` when no session was running.
    pub async fn stop(&self) -> Result<Option<SessionSummary>> {
        let mut state = self.state.lock().await;
        if !state.is_running() {
            return Ok(None);
        }

        self.ingestion.lock().await.stop().await?;

        let stopped_at = Utc::now();
        let summary = {
            let mut engine = self.engine.lock().await;
            let summary = SessionSummary {
                session_id: state.session_id.clone().unwrap_or_default(),
                started_at: state.started_at.unwrap_or(stopped_at),
                stopped_at,
                frames_processed: engine.frame_index(),
                confirmed_cards: engine.ledger().items().filter(|item| item.confirmed).count(),
                total: engine.total(),
            };
            engine.reset(None);
            self.context.snapshots.send_replace(engine.snapshot());
            summary
        };

        state.stop(stopped_at);
        info!(
            "Scan session {} stopped after {} frames; {} confirmed, total {:.2}",
            summary.session_id, summary.frames_processed, summary.confirmed_cards, summary.total
        );
        Ok(Some(summary))
    }

    /// Reads one printed field from 1..=batch-size crops of the same card.
    pub async fn read_field(
        &self,
        crops: &[Vec<u8>],
        kind: FieldKind,
    ) -> Result<Option<ResolvedField>> {
        decode_field(self.ocr.as_ref(), crops, kind, &self.settings.consensus).await
    }

    /// A streaming reader for the capture path that OCRs every frame.
    pub fn field_reader(&self, kind: FieldKind) -> FieldReader {
        FieldReader::new(
            kind,
            &self.settings.consensus,
            self.settings.ingestion.confidence_window,
            self.settings.ingestion.confidence_threshold,
        )
    }
}
