use libsql::TransactionBehavior;

use crate::{CanonicalUnit, CuDraft, CuOccurrence, Error};

/// Persist a parent CU and its children in one write transaction.
///
/// Either the whole family lands or nothing does; on any failure the
/// transaction is rolled back and the store is left as it was.
pub async fn insert_family(
    conn: &libsql::Connection,
    parent: &CuDraft,
    children: &[CuDraft],
) -> Result<i64, Error> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .await?;

    match write_family(&tx, parent, children).await {
        Ok(parent_id) => {
            tx.commit().await?;
            Ok(parent_id)
        }
        Err(err) => {
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

async fn write_family(
    conn: &libsql::Connection,
    parent: &CuDraft,
    children: &[CuDraft],
) -> Result<i64, Error> {
    let parent_id = write_one(conn, parent).await?;
    for child in children {
        write_one(conn, child).await?;
    }
    Ok(parent_id)
}

async fn write_one(conn: &libsql::Connection, draft: &CuDraft) -> Result<i64, Error> {
    let token_len = draft.phrase.split_whitespace().count() as i64;
    conn.execute(
        "INSERT INTO canonical_units (rep_text, token_len) VALUES (?1, ?2)",
        libsql::params![draft.phrase.as_str(), token_len],
    )
    .await?;
    let cu_id = conn.last_insert_rowid();

    for (transcript_id, span) in &draft.spans {
        conn.execute(
            "INSERT INTO cu_occurrences (cu_id, transcript_id, segment_start_id, segment_end_id)
             VALUES (?1, ?2, ?3, ?4)",
            libsql::params![cu_id, *transcript_id, span.start_id, span.end_id],
        )
        .await?;
    }
    Ok(cu_id)
}

/// Delete every CU and occurrence row in one transaction.
pub async fn clear(conn: &libsql::Connection) -> Result<(), Error> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .await?;
    tx.execute("DELETE FROM cu_occurrences", ()).await?;
    tx.execute("DELETE FROM canonical_units", ()).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn list(conn: &libsql::Connection) -> Result<Vec<CanonicalUnit>, Error> {
    let mut rows = conn
        .query(
            "SELECT id, rep_text, token_len FROM canonical_units ORDER BY id",
            (),
        )
        .await?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(CanonicalUnit {
            id: row.get::<i64>(0)?,
            rep_text: row.get::<String>(1)?,
            token_len: row.get::<i64>(2)?,
        });
    }
    Ok(out)
}

pub async fn occurrences(
    conn: &libsql::Connection,
    cu_id: i64,
) -> Result<Vec<CuOccurrence>, Error> {
    let mut rows = conn
        .query(
            "SELECT cu_id, transcript_id, segment_start_id, segment_end_id
             FROM cu_occurrences
             WHERE cu_id = ?1
             ORDER BY transcript_id",
            libsql::params![cu_id],
        )
        .await?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(CuOccurrence {
            cu_id: row.get::<i64>(0)?,
            transcript_id: row.get::<i64>(1)?,
            segment_start_id: row.get::<i64>(2)?,
            segment_end_id: row.get::<i64>(3)?,
        });
    }
    Ok(out)
}
