use std::path::{Path, PathBuf};

use crate::{Error, schema};

#[derive(Debug, Clone)]
enum Target {
    Memory,
    Local(PathBuf),
}

/// Builds a [`Database`] backed by a local SQLite file or an in-memory
/// database (tests).
#[derive(Debug, Default)]
pub struct DatabaseBuilder {
    target: Option<Target>,
}

impl DatabaseBuilder {
    pub fn memory(mut self) -> Self {
        self.target = Some(Target::Memory);
        self
    }

    pub fn local(mut self, path: impl AsRef<Path>) -> Self {
        self.target = Some(Target::Local(path.as_ref().to_path_buf()));
        self
    }

    pub async fn build(self) -> Result<Database, Error> {
        let target = self.target.ok_or(Error::MissingTarget)?;

        let db = match &target {
            Target::Memory => libsql::Builder::new_local(":memory:").build().await?,
            Target::Local(path) => libsql::Builder::new_local(path).build().await?,
        };

        let conn = db.connect()?;

        // journal_mode replies with a row; the rest are silent.
        let _ = conn.query("PRAGMA journal_mode=WAL", ()).await?;
        conn.execute("PRAGMA foreign_keys=ON", ()).await?;
        conn.execute("PRAGMA synchronous=NORMAL", ()).await?;

        schema::bootstrap(&conn).await?;

        tracing::debug!("database ready ({:?})", target);

        Ok(Database {
            db,
            conn,
            memory: matches!(target, Target::Memory),
        })
    }
}

/// Shared handle over one local database.
///
/// `conn()` clones the primary connection (libsql connections are cheaply
/// clonable and internally synchronized). `reader()` opens a separate
/// read-only connection for long scans, so they never sit inside the write
/// connection's transactions. In-memory databases have a single connection,
/// so `reader()` falls back to the shared one there.
pub struct Database {
    db: libsql::Database,
    conn: libsql::Connection,
    memory: bool,
}

impl Database {
    pub fn conn(&self) -> libsql::Connection {
        self.conn.clone()
    }

    pub async fn reader(&self) -> Result<libsql::Connection, Error> {
        if self.memory {
            return Ok(self.conn.clone());
        }

        let conn = self.db.connect()?;
        conn.execute("PRAGMA foreign_keys=ON", ()).await?;
        conn.execute("PRAGMA query_only=ON", ()).await?;
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_without_target_fails() {
        let err = DatabaseBuilder::default().build().await.err().unwrap();
        assert!(matches!(err, Error::MissingTarget));
    }

    #[tokio::test]
    async fn memory_database_bootstraps_schema() {
        let db = DatabaseBuilder::default().memory().build().await.unwrap();
        let conn = db.conn();

        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type IN ('table', 'view') ORDER BY name",
                (),
            )
            .await
            .unwrap();

        let mut names = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            names.push(row.get::<String>(0).unwrap());
        }

        for expected in [
            "canonical_units",
            "cu_occurrences",
            "fts_windows",
            "projects",
            "segments",
            "transcripts",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }

    #[tokio::test]
    async fn local_database_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refrain.db");

        {
            let db = DatabaseBuilder::default().local(&path).build().await.unwrap();
            db.conn()
                .execute(
                    "INSERT INTO projects (slug, name) VALUES ('p', 'P')",
                    (),
                )
                .await
                .unwrap();
        }

        let db = DatabaseBuilder::default().local(&path).build().await.unwrap();
        let mut rows = db
            .conn()
            .query("SELECT COUNT(*) FROM projects", ())
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<i64>(0).unwrap(), 1);
    }

    #[tokio::test]
    async fn reader_is_query_only_for_local_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refrain.db");
        let db = DatabaseBuilder::default().local(&path).build().await.unwrap();

        let reader = db.reader().await.unwrap();
        let err = reader
            .execute("INSERT INTO projects (slug, name) VALUES ('x', 'X')", ())
            .await;
        assert!(err.is_err());
    }
}
