use crate::{Error, NewSegment, Segment};

fn opt_i64(row: &libsql::Row, idx: i32) -> Option<i64> {
    match row.get_value(idx) {
        Ok(libsql::Value::Integer(v)) => Some(v),
        _ => None,
    }
}

fn opt_text(row: &libsql::Row, idx: i32) -> Option<String> {
    match row.get_value(idx) {
        Ok(libsql::Value::Text(v)) => Some(v),
        _ => None,
    }
}

/// Full ordered read of one transcript's segments.
pub async fn ordered(conn: &libsql::Connection, transcript_id: i64) -> Result<Vec<Segment>, Error> {
    let mut rows = conn
        .query(
            "SELECT id, transcript_id, start_ms, end_ms, speaker, text
             FROM segments
             WHERE transcript_id = ?1
             ORDER BY start_ms, id",
            libsql::params![transcript_id],
        )
        .await?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(Segment {
            id: row.get::<i64>(0)?,
            transcript_id: row.get::<i64>(1)?,
            start_ms: row.get::<i64>(2)?,
            end_ms: opt_i64(&row, 3),
            speaker: opt_text(&row, 4),
            text: row.get::<String>(5)?,
        });
    }
    Ok(out)
}

/// Batch read of an id-range, space-joined with per-segment trim.
pub async fn joined_text(
    conn: &libsql::Connection,
    transcript_id: i64,
    start_id: i64,
    end_id: i64,
) -> Result<String, Error> {
    let mut rows = conn
        .query(
            "SELECT text FROM segments
             WHERE transcript_id = ?1 AND id BETWEEN ?2 AND ?3
             ORDER BY start_ms, id",
            libsql::params![transcript_id, start_id, end_id],
        )
        .await?;

    let mut parts = Vec::new();
    while let Some(row) = rows.next().await? {
        parts.push(row.get::<String>(0)?.trim().to_string());
    }
    Ok(parts.join(" ").trim().to_string())
}

/// Append segments to a transcript. Returns the number inserted.
pub async fn insert_many(
    conn: &libsql::Connection,
    transcript_id: i64,
    segments: &[NewSegment],
) -> Result<usize, Error> {
    for seg in segments {
        let params: Vec<libsql::Value> = vec![
            transcript_id.into(),
            seg.start_ms.into(),
            seg.end_ms.map(Into::into).unwrap_or(libsql::Value::Null),
            seg.speaker
                .clone()
                .map(Into::into)
                .unwrap_or(libsql::Value::Null),
            seg.text.clone().into(),
        ];
        conn.execute(
            "INSERT INTO segments (transcript_id, start_ms, end_ms, speaker, text)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params,
        )
        .await?;
    }
    Ok(segments.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcripts;

    async fn setup() -> (refrain_db_core::Database, i64) {
        let db = refrain_db_core::DatabaseBuilder::default()
            .memory()
            .build()
            .await
            .unwrap();
        let conn = db.conn();
        let project = transcripts::get_or_create_project(&conn, "test", None)
            .await
            .unwrap();
        let tid = transcripts::upsert(
            &conn,
            project,
            &crate::TranscriptMeta {
                source_id: "vid-1".into(),
                title: None,
            },
        )
        .await
        .unwrap();
        (db, tid)
    }

    fn seg(start_ms: i64, text: &str) -> NewSegment {
        NewSegment {
            start_ms,
            end_ms: None,
            speaker: None,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn ordered_sorts_by_start_then_id() {
        let (db, tid) = setup().await;
        let conn = db.conn();

        insert_many(
            &conn,
            tid,
            &[seg(2000, "third"), seg(1000, "first"), seg(1000, "second")],
        )
        .await
        .unwrap();

        let segs = ordered(&conn, tid).await.unwrap();
        let texts: Vec<&str> = segs.iter().map(|s| s.text.as_str()).collect();
        // equal start_ms falls back to insertion (id) order
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn joined_text_trims_and_joins() {
        let (db, tid) = setup().await;
        let conn = db.conn();

        insert_many(&conn, tid, &[seg(0, "  we hold "), seg(1, "these truths ")])
            .await
            .unwrap();

        let segs = ordered(&conn, tid).await.unwrap();
        let text = joined_text(&conn, tid, segs[0].id, segs[1].id)
            .await
            .unwrap();
        assert_eq!(text, "we hold these truths");
    }
}
