use std::time::Duration;

use thiserror::Error;

/// Failures reported by the external collaborators.
///
/// All of them are recoverable: the ingestion loop logs them and retries on
/// the next tick.
#[derive(Debug, Error, PartialEq)]
pub enum FeedError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}
