pub mod config;
pub mod numeric;
pub mod ocr;
pub mod reader;
pub mod vote;

pub use config::{ConsensusConfig, NumericRange};
pub use numeric::{resolve_numeric, resolve_set_number};
pub use ocr::{decode_field, reduce_samples, BatchStatus, FieldKind, OcrBatch, ResolvedField};
pub use reader::{FieldReader, FieldReading};
pub use vote::{majority_vote, majority_vote_str};
