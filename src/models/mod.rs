pub mod detection;
pub mod frame;
pub mod price;
pub mod snapshot;

pub use detection::{identity_key, CardRef, DetectionEvent, FrameBatch, RankedCandidate};
pub use frame::Frame;
pub use price::PriceQuote;
pub use snapshot::{PricedCandidate, ScanSnapshot};
