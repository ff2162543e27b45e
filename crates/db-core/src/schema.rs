use crate::Error;

/// Idempotent schema for the transcript corpus and the mined canonical
/// units. `fts_windows` stores its coordinate columns (UNINDEXED) so phrase
/// lookups can return them directly and the rebuild swap can use DELETE.
const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
  id         INTEGER PRIMARY KEY,
  slug       TEXT UNIQUE NOT NULL,
  name       TEXT NOT NULL,
  created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS transcripts (
  id         INTEGER PRIMARY KEY,
  project_id INTEGER NOT NULL REFERENCES projects(id),
  source_id  TEXT NOT NULL,
  title      TEXT,
  created_at TEXT DEFAULT CURRENT_TIMESTAMP
);
CREATE UNIQUE INDEX IF NOT EXISTS unq_transcripts_project_source
  ON transcripts(project_id, source_id);

CREATE TABLE IF NOT EXISTS segments (
  id            INTEGER PRIMARY KEY,
  transcript_id INTEGER NOT NULL REFERENCES transcripts(id),
  start_ms      INTEGER NOT NULL,
  end_ms        INTEGER,
  speaker       TEXT,
  text          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_segments_transcript
  ON segments(transcript_id, start_ms);

CREATE VIRTUAL TABLE IF NOT EXISTS fts_windows USING fts5(
  transcript_id UNINDEXED,
  seg_start_id  UNINDEXED,
  seg_end_id    UNINDEXED,
  text
);

CREATE TABLE IF NOT EXISTS canonical_units (
  id         INTEGER PRIMARY KEY,
  rep_text   TEXT NOT NULL,
  token_len  INTEGER NOT NULL,
  created_at TEXT DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS cu_occurrences (
  id               INTEGER PRIMARY KEY,
  cu_id            INTEGER NOT NULL REFERENCES canonical_units(id) ON DELETE CASCADE,
  transcript_id    INTEGER NOT NULL REFERENCES transcripts(id),
  segment_start_id INTEGER NOT NULL,
  segment_end_id   INTEGER NOT NULL,
  UNIQUE(cu_id, transcript_id)
);
";

pub(crate) async fn bootstrap(conn: &libsql::Connection) -> Result<(), Error> {
    conn.execute_batch(SCHEMA).await?;
    Ok(())
}
