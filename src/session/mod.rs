pub mod controller;
pub mod engine;
pub mod state;

pub use controller::{Collaborators, ScanSession};
pub use engine::{IngestOutcome, ScanEngine};
pub use state::{SessionState, SessionStatus, SessionSummary};
