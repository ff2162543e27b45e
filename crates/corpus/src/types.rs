use std::collections::BTreeMap;

use serde::Serialize;

/// One time-aligned text unit of a transcript. Total order within a
/// transcript is `(start_ms, id)`; text is immutable once inserted.
#[derive(Debug, Clone, Serialize)]
pub struct Segment {
    pub id: i64,
    pub transcript_id: i64,
    pub start_ms: i64,
    pub end_ms: Option<i64>,
    pub speaker: Option<String>,
    pub text: String,
}

/// A segment about to be inserted (the canonical shape the ingest boundary
/// normalizes into).
#[derive(Debug, Clone, PartialEq)]
pub struct NewSegment {
    pub start_ms: i64,
    pub end_ms: Option<i64>,
    pub speaker: Option<String>,
    pub text: String,
}

/// Inclusive segment-id range within one transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SegSpan {
    pub start_id: i64,
    pub end_id: i64,
}

impl SegSpan {
    pub fn new(start_id: i64, end_id: i64) -> Self {
        Self { start_id, end_id }
    }
}

/// A canonical unit ready to be persisted: the representative phrase and
/// one segment span per member transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct CuDraft {
    pub phrase: String,
    pub spans: BTreeMap<i64, SegSpan>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CanonicalUnit {
    pub id: i64,
    pub rep_text: String,
    pub token_len: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CuOccurrence {
    pub cu_id: i64,
    pub transcript_id: i64,
    pub segment_start_id: i64,
    pub segment_end_id: i64,
}

#[derive(Debug, Clone, Default)]
pub struct TranscriptMeta {
    pub source_id: String,
    pub title: Option<String>,
}
