pub mod config;
pub mod ledger;
pub mod window;

pub use config::TrackingConfig;
pub use ledger::{TickOutcome, TrackedItem, TrackingLedger};
pub use window::DetectionWindow;
