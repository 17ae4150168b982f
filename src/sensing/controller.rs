use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::{ingestion_loop, IngestionContext};

/// Owns the ingestion loop task of the current session.
pub struct IngestionController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl IngestionController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start(&mut self, ctx: Arc<IngestionContext>, epoch: u64) -> Result<()> {
        if self.handle.is_some() {
            bail!("ingestion already active");
        }

        info!(
            "Starting ingestion loop (epoch {epoch}, every {}ms)",
            ctx.frame_interval.as_millis()
        );
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(ingestion_loop(ctx, epoch, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Cancels the loop and waits for it and its in-flight requests to end.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("ingestion loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for IngestionController {
    fn default() -> Self {
        Self::new()
    }
}
