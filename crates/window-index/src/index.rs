use itertools::Itertools;
use libsql::TransactionBehavior;

use crate::Error;

struct WindowRow {
    transcript_id: i64,
    seg_start_id: i64,
    seg_end_id: i64,
    text: String,
}

/// Atomic rebuild of the whole window index for window size `k`.
///
/// Every contiguous run of exactly `k` segments (in `(start_ms, id)` order)
/// becomes one row. The candidate rows are staged in memory first; if the
/// stage comes out empty the transaction is rolled back and the prior index
/// survives untouched. Otherwise the live table is deleted and the stage
/// copied in, all inside one exclusive transaction — readers see either the
/// old index or the new one, never a partial state.
///
/// Returns the number of rows swapped in.
pub async fn rebuild(conn: &libsql::Connection, k: usize) -> Result<usize, Error> {
    if k == 0 {
        return Err(Error::InvalidWindowSize);
    }

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .await?;

    match stage_and_swap(&tx, k).await {
        Ok(count) => {
            tx.commit().await?;
            tracing::info!("window index rebuilt: {} rows (k={})", count, k);
            Ok(count)
        }
        Err(err) => {
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

async fn stage_and_swap(conn: &libsql::Connection, k: usize) -> Result<usize, Error> {
    let mut staged: Vec<WindowRow> = Vec::new();

    let mut tids = Vec::new();
    let mut rows = conn
        .query("SELECT id FROM transcripts ORDER BY id", ())
        .await?;
    while let Some(row) = rows.next().await? {
        tids.push(row.get::<i64>(0)?);
    }

    for tid in tids {
        let mut segs: Vec<(i64, String)> = Vec::new();
        let mut rows = conn
            .query(
                "SELECT id, text FROM segments
                 WHERE transcript_id = ?1
                 ORDER BY start_ms, id",
                libsql::params![tid],
            )
            .await?;
        while let Some(row) = rows.next().await? {
            segs.push((row.get::<i64>(0)?, row.get::<String>(1)?));
        }

        for window in segs.windows(k) {
            let text = window
                .iter()
                .map(|(_, text)| text.as_str())
                .join(" ")
                .trim()
                .to_string();
            staged.push(WindowRow {
                transcript_id: tid,
                seg_start_id: window[0].0,
                seg_end_id: window[k - 1].0,
                text,
            });
        }
    }

    if staged.is_empty() {
        return Err(Error::EmptyStage);
    }

    conn.execute("DELETE FROM fts_windows", ()).await?;
    for row in &staged {
        conn.execute(
            "INSERT INTO fts_windows (transcript_id, seg_start_id, seg_end_id, text)
             VALUES (?1, ?2, ?3, ?4)",
            libsql::params![
                row.transcript_id,
                row.seg_start_id,
                row.seg_end_id,
                row.text.as_str()
            ],
        )
        .await?;
    }

    Ok(staged.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn corpus_with(transcripts: &[&[&str]]) -> refrain_db_core::Database {
        let db = refrain_db_core::DatabaseBuilder::default()
            .memory()
            .build()
            .await
            .unwrap();
        let conn = db.conn();

        let project = refrain_corpus::transcripts::get_or_create_project(&conn, "p", None)
            .await
            .unwrap();
        for (i, texts) in transcripts.iter().enumerate() {
            let tid = refrain_corpus::transcripts::upsert(
                &conn,
                project,
                &refrain_corpus::TranscriptMeta {
                    source_id: format!("vid-{i}"),
                    title: None,
                },
            )
            .await
            .unwrap();
            let segs: Vec<refrain_corpus::NewSegment> = texts
                .iter()
                .enumerate()
                .map(|(j, t)| refrain_corpus::NewSegment {
                    start_ms: (j as i64) * 1000,
                    end_ms: None,
                    speaker: None,
                    text: t.to_string(),
                })
                .collect();
            refrain_corpus::segments::insert_many(&conn, tid, &segs)
                .await
                .unwrap();
        }
        db
    }

    async fn window_texts(conn: &libsql::Connection) -> Vec<String> {
        let mut rows = conn
            .query(
                "SELECT text FROM fts_windows ORDER BY transcript_id, seg_start_id",
                (),
            )
            .await
            .unwrap();
        let mut out = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            out.push(row.get::<String>(0).unwrap());
        }
        out
    }

    #[tokio::test]
    async fn builds_every_k_window() {
        let db = corpus_with(&[&["a b", "c", "d e"], &["x", "y"]]).await;
        let conn = db.conn();

        let n = rebuild(&conn, 2).await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(window_texts(&conn).await, vec!["a b c", "c d e", "x y"]);
    }

    #[tokio::test]
    async fn short_transcripts_produce_no_windows() {
        let db = corpus_with(&[&["only", "two"], &["a", "b", "c"]]).await;
        let conn = db.conn();

        rebuild(&conn, 3).await.unwrap();
        assert_eq!(window_texts(&conn).await, vec!["a b c"]);
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let db = corpus_with(&[&["a", "b", "c"]]).await;
        let conn = db.conn();

        rebuild(&conn, 2).await.unwrap();
        let first = window_texts(&conn).await;
        rebuild(&conn, 2).await.unwrap();
        assert_eq!(window_texts(&conn).await, first);
    }

    #[tokio::test]
    async fn empty_stage_preserves_prior_index() {
        let db = corpus_with(&[&["a", "b", "c"]]).await;
        let conn = db.conn();

        rebuild(&conn, 2).await.unwrap();
        let before = window_texts(&conn).await;

        conn.execute("DELETE FROM segments", ()).await.unwrap();
        let err = rebuild(&conn, 2).await;
        assert!(matches!(err, Err(Error::EmptyStage)));

        assert_eq!(window_texts(&conn).await, before);
    }

    #[tokio::test]
    async fn zero_window_size_is_rejected() {
        let db = corpus_with(&[&["a"]]).await;
        let err = rebuild(&db.conn(), 0).await;
        assert!(matches!(err, Err(Error::InvalidWindowSize)));
    }
}
