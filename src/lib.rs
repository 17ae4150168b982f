pub mod consensus;
pub mod feed;
pub mod models;
pub mod sensing;
pub mod session;
pub mod settings;
pub mod tracking;
pub mod utils;

use std::path::Path;

use anyhow::Result;

pub use feed::{ClassifierFeed, FeedError, FrameSource, OcrEngine, PriceLookup};
pub use models::{Frame, PriceQuote, ScanSnapshot};
pub use session::{Collaborators, ScanSession, SessionSummary};
pub use settings::ScannerSettings;

/// Sets up logging, loads settings from `settings_path` (applying
/// `CARDSCAN_DEBUG`) and wires a session to the given collaborators.
///
/// The session is idle until [`ScanSession::start`] is called.
pub fn open_session(
    settings_path: impl AsRef<Path>,
    collaborators: Collaborators,
) -> Result<ScanSession> {
    utils::init_logging();

    let settings = ScannerSettings::load(settings_path)?.with_env_overrides();
    log::info!(
        "Card scanner ready: {}ms frame interval, confirm after {} ticks",
        settings.ingestion.frame_interval_ms,
        settings.tracking.confirm_threshold
    );

    Ok(ScanSession::new(settings, collaborators))
}
