use std::collections::BTreeMap;

use crate::{Error, TranscriptMeta};

/// Look a project up by slug, creating it when absent.
pub async fn get_or_create_project(
    conn: &libsql::Connection,
    slug: &str,
    name: Option<&str>,
) -> Result<i64, Error> {
    let mut rows = conn
        .query(
            "SELECT id FROM projects WHERE slug = ?1",
            libsql::params![slug],
        )
        .await?;
    if let Some(row) = rows.next().await? {
        return Ok(row.get::<i64>(0)?);
    }

    conn.execute(
        "INSERT INTO projects (slug, name) VALUES (?1, ?2)",
        libsql::params![slug, name.unwrap_or(slug)],
    )
    .await?;
    Ok(conn.last_insert_rowid())
}

/// Insert a transcript, or update its metadata when `(project, source_id)`
/// already exists. Returns the transcript id either way.
pub async fn upsert(
    conn: &libsql::Connection,
    project_id: i64,
    meta: &TranscriptMeta,
) -> Result<i64, Error> {
    let mut rows = conn
        .query(
            "SELECT id FROM transcripts WHERE project_id = ?1 AND source_id = ?2",
            libsql::params![project_id, meta.source_id.as_str()],
        )
        .await?;

    if let Some(row) = rows.next().await? {
        let id = row.get::<i64>(0)?;
        conn.execute(
            "UPDATE transcripts SET title = COALESCE(?1, title) WHERE id = ?2",
            vec![
                meta.title
                    .clone()
                    .map(Into::into)
                    .unwrap_or(libsql::Value::Null),
                id.into(),
            ],
        )
        .await?;
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO transcripts (project_id, source_id, title) VALUES (?1, ?2, ?3)",
        vec![
            project_id.into(),
            meta.source_id.clone().into(),
            meta.title
                .clone()
                .map(Into::into)
                .unwrap_or(libsql::Value::Null),
        ],
    )
    .await?;
    Ok(conn.last_insert_rowid())
}

/// Source identifiers for a set of transcript ids (join-back for display).
pub async fn source_ids(
    conn: &libsql::Connection,
    ids: &[i64],
) -> Result<BTreeMap<i64, String>, Error> {
    let mut out = BTreeMap::new();
    if ids.is_empty() {
        return Ok(out);
    }

    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!("SELECT id, source_id FROM transcripts WHERE id IN ({placeholders})");
    let params: Vec<libsql::Value> = ids.iter().map(|id| (*id).into()).collect();

    let mut rows = conn.query(&sql, params).await?;
    while let Some(row) = rows.next().await? {
        out.insert(row.get::<i64>(0)?, row.get::<String>(1)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_dedupes_on_project_and_source() {
        let db = refrain_db_core::DatabaseBuilder::default()
            .memory()
            .build()
            .await
            .unwrap();
        let conn = db.conn();
        let project = get_or_create_project(&conn, "p", Some("Project"))
            .await
            .unwrap();

        let a = upsert(
            &conn,
            project,
            &TranscriptMeta {
                source_id: "vid".into(),
                title: None,
            },
        )
        .await
        .unwrap();
        let b = upsert(
            &conn,
            project,
            &TranscriptMeta {
                source_id: "vid".into(),
                title: Some("now titled".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(a, b);
        let map = source_ids(&conn, &[a]).await.unwrap();
        assert_eq!(map.get(&a).map(String::as_str), Some("vid"));
    }

    #[tokio::test]
    async fn project_lookup_is_stable() {
        let db = refrain_db_core::DatabaseBuilder::default()
            .memory()
            .build()
            .await
            .unwrap();
        let conn = db.conn();

        let first = get_or_create_project(&conn, "slug", None).await.unwrap();
        let second = get_or_create_project(&conn, "slug", None).await.unwrap();
        assert_eq!(first, second);
    }
}
