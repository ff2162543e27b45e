use crate::Error;

/// One window row matching a phrase lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    pub rowid: i64,
    pub transcript_id: i64,
    pub seg_start_id: i64,
    pub seg_end_id: i64,
}

/// All windows whose text contains `phrase` as an exact FTS5 phrase
/// (case-insensitive under the unicode61 tokenizer).
///
/// Embedded double quotes are escaped here; a phrase with nothing the
/// tokenizer can index yields the empty set, as does any miss.
pub async fn phrase_hits(
    conn: &libsql::Connection,
    phrase: &str,
) -> Result<Vec<WindowHit>, Error> {
    if !phrase.chars().any(|c| c.is_alphanumeric()) {
        return Ok(Vec::new());
    }

    let escaped = phrase.replace('"', "\"\"");
    let mut rows = conn
        .query(
            "SELECT rowid, transcript_id, seg_start_id, seg_end_id
             FROM fts_windows
             WHERE fts_windows MATCH '\"' || ?1 || '\"'",
            libsql::params![escaped],
        )
        .await?;

    let mut hits = Vec::new();
    while let Some(row) = rows.next().await? {
        hits.push(WindowHit {
            rowid: row.get::<i64>(0)?,
            transcript_id: row.get::<i64>(1)?,
            seg_start_id: row.get::<i64>(2)?,
            seg_end_id: row.get::<i64>(3)?,
        });
    }
    Ok(hits)
}
