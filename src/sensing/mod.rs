pub mod controller;
pub mod gate;
pub mod loop_worker;

pub use controller::IngestionController;
pub use gate::{InFlightGate, InFlightPermit};
pub use loop_worker::{ingestion_loop, IngestionContext};
