pub mod cus;
pub mod import;
pub mod segments;
pub mod transcripts;

mod error;
mod types;

pub use error::Error;
pub use types::{CanonicalUnit, CuDraft, CuOccurrence, NewSegment, SegSpan, Segment, TranscriptMeta};
