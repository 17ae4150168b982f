//! Narrow interfaces to the collaborators outside the consensus core:
//! camera, classifier, price lookup and OCR engine.

pub mod classifier;
pub mod error;
pub mod gate;
pub mod pricing;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{CardRef, Frame, PriceQuote};

pub use classifier::normalize_response;
pub use error::FeedError;
pub use gate::ConfidenceGate;
pub use pricing::{
    quote_from_card_record, select_variant_price, PriceCache, PRICE_VARIANT_PRIORITY,
};

/// Produces camera frames. `Ok(None)` means no frame is available right now.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn capture(&self) -> Result<Option<Frame>, FeedError>;
}

/// Remote image classifier. The raw response may be empty, a single
/// detection object or an array of them; see [`normalize_response`].
#[async_trait]
pub trait ClassifierFeed: Send + Sync {
    async fn classify(&self, frame: &Frame) -> Result<Value, FeedError>;
}

/// Batch price lookup. Cards missing from the response have an unknown price.
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn lookup(&self, cards: &[CardRef]) -> Result<Vec<PriceQuote>, FeedError>;
}

/// OCR engine returning the raw decoded text of every crop, in order.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, crops: &[Vec<u8>]) -> Result<Vec<String>, FeedError>;
}
