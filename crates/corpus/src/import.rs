//! JSON importer for externally produced transcript dumps.
//!
//! Upstream records arrive with heterogeneous field names (`start` in
//! seconds vs `start_ms`, source ids under `source_id`/`video_id`/`id`).
//! This boundary canonicalizes everything into the store's shape; the rest
//! of the system only ever sees `{start_ms, text}`.

use std::collections::HashSet;
use std::path::Path;

use libsql::TransactionBehavior;
use serde::Deserialize;

use crate::{Error, NewSegment, TranscriptMeta, segments, transcripts};

#[derive(Debug, Deserialize)]
pub struct TranscriptRecord {
    #[serde(default, alias = "video_id", alias = "id")]
    pub source_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
pub struct RawSegment {
    #[serde(default)]
    start_ms: Option<i64>,
    /// Seconds, used when `start_ms` is absent.
    #[serde(default)]
    start: Option<f64>,
    #[serde(default)]
    end_ms: Option<i64>,
    #[serde(default)]
    end: Option<f64>,
    #[serde(default)]
    text: String,
    #[serde(default, alias = "speaker_name")]
    speaker: Option<String>,
}

impl RawSegment {
    fn canonical(&self) -> Option<NewSegment> {
        let text = self.text.trim();
        if text.is_empty() {
            return None;
        }
        let start_ms = self
            .start_ms
            .or_else(|| self.start.map(|s| (s * 1000.0) as i64))?;
        let end_ms = self
            .end_ms
            .or_else(|| self.end.map(|s| (s * 1000.0) as i64));

        Some(NewSegment {
            start_ms,
            end_ms,
            speaker: self.speaker.clone(),
            text: text.to_string(),
        })
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct ImportReport {
    pub transcripts: usize,
    pub segments: usize,
    pub skipped: usize,
}

/// Import a JSON file (either a bare array of records or an object with a
/// `transcripts` array) into the given project, in one transaction.
pub async fn import_path(
    conn: &libsql::Connection,
    path: impl AsRef<Path>,
    project_slug: &str,
) -> Result<ImportReport, Error> {
    let raw = std::fs::read_to_string(path)?;
    let records = parse_records(&raw)?;
    import_records(conn, project_slug, &records).await
}

pub fn parse_records(raw: &str) -> Result<Vec<TranscriptRecord>, Error> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    let list = match value {
        serde_json::Value::Object(mut map) => map
            .remove("transcripts")
            .unwrap_or(serde_json::Value::Array(Vec::new())),
        other => other,
    };
    Ok(serde_json::from_value(list)?)
}

pub async fn import_records(
    conn: &libsql::Connection,
    project_slug: &str,
    records: &[TranscriptRecord],
) -> Result<ImportReport, Error> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .await?;

    let mut report = ImportReport::default();

    let result: Result<(), Error> = async {
        let project = transcripts::get_or_create_project(&tx, project_slug, None).await?;

        for record in records {
            let Some(source_id) = record.source_id.as_deref().filter(|s| !s.is_empty()) else {
                report.skipped += 1;
                tracing::warn!("skipping record without a source id");
                continue;
            };

            let meta = TranscriptMeta {
                source_id: source_id.to_string(),
                title: record.title.clone(),
            };
            let tid = transcripts::upsert(&tx, project, &meta).await?;

            let mut existing: HashSet<(i64, String)> = HashSet::new();
            for seg in segments::ordered(&tx, tid).await? {
                existing.insert((seg.start_ms, seg.text));
            }

            let fresh: Vec<NewSegment> = record
                .segments
                .iter()
                .filter_map(RawSegment::canonical)
                .filter(|s| !existing.contains(&(s.start_ms, s.text.clone())))
                .collect();

            report.segments += segments::insert_many(&tx, tid, &fresh).await?;
            report.transcripts += 1;
        }
        Ok(())
    }
    .await;

    match result {
        Ok(()) => {
            tx.commit().await?;
            tracing::info!(
                "imported {} transcripts, {} segments ({} skipped)",
                report.transcripts,
                report.segments,
                report.skipped
            );
            Ok(report)
        }
        Err(err) => {
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_seconds_and_millis() {
        let raw: RawSegment = serde_json::from_str(r#"{"start": 1.5, "text": " hi there "}"#)
            .unwrap();
        let seg = raw.canonical().unwrap();
        assert_eq!(seg.start_ms, 1500);
        assert_eq!(seg.text, "hi there");

        let raw: RawSegment =
            serde_json::from_str(r#"{"start_ms": 2500, "end_ms": 3000, "text": "x"}"#).unwrap();
        let seg = raw.canonical().unwrap();
        assert_eq!(seg.start_ms, 2500);
        assert_eq!(seg.end_ms, Some(3000));
    }

    #[test]
    fn empty_text_or_missing_start_is_dropped() {
        let raw: RawSegment = serde_json::from_str(r#"{"start_ms": 1, "text": "   "}"#).unwrap();
        assert!(raw.canonical().is_none());

        let raw: RawSegment = serde_json::from_str(r#"{"text": "no offset"}"#).unwrap();
        assert!(raw.canonical().is_none());
    }

    #[test]
    fn source_id_key_variants_are_accepted() {
        let records = parse_records(
            r#"[
                {"source_id": "a", "segments": []},
                {"video_id": "b", "segments": []},
                {"id": "c", "segments": []}
            ]"#,
        )
        .unwrap();
        let ids: Vec<_> = records
            .iter()
            .map(|r| r.source_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn import_is_idempotent_per_segment() {
        let db = refrain_db_core::DatabaseBuilder::default()
            .memory()
            .build()
            .await
            .unwrap();
        let conn = db.conn();

        let raw = r#"[{"video_id": "vid", "segments": [
            {"start": 0.0, "text": "hello world"},
            {"start": 1.0, "text": "again"}
        ]}]"#;

        let records = parse_records(raw).unwrap();
        let first = import_records(&conn, "proj", &records).await.unwrap();
        assert_eq!(first.segments, 2);

        let second = import_records(&conn, "proj", &records).await.unwrap();
        assert_eq!(second.segments, 0);
        assert_eq!(second.transcripts, 1);
    }
}
