use std::collections::HashSet;

use anyhow::Context;
use refrain_corpus::cus;
use refrain_db_core::Database;

pub async fn run(db: &Database) -> anyhow::Result<()> {
    let conn = db.conn();

    println!("== Row counts ==");
    for table in [
        "projects",
        "transcripts",
        "segments",
        "fts_windows",
        "canonical_units",
        "cu_occurrences",
    ] {
        println!("{:<16}: {}", table, count(&conn, table).await?);
    }

    let mut rows = conn.query("PRAGMA integrity_check", ()).await?;
    let row = rows
        .next()
        .await?
        .context("integrity check returned nothing")?;
    let integrity = row.get::<String>(0)?;
    println!("\nintegrity_check : {integrity}");

    let mut violations = 0usize;
    for cu in cus::list(&conn).await? {
        if cu.token_len != cu.rep_text.split_whitespace().count() as i64 {
            println!("✗ cu {}: token_len does not match rep_text", cu.id);
            violations += 1;
        }

        let occs = cus::occurrences(&conn, cu.id).await?;
        let distinct: HashSet<i64> = occs.iter().map(|o| o.transcript_id).collect();
        if distinct.len() < 2 {
            println!("✗ cu {}: fewer than two member transcripts", cu.id);
            violations += 1;
        }

        for occ in &occs {
            for seg_id in [occ.segment_start_id, occ.segment_end_id] {
                match segment_owner(&conn, seg_id).await? {
                    Some(tid) if tid == occ.transcript_id => {}
                    Some(_) => {
                        println!(
                            "✗ cu {}: occurrence endpoint {} belongs to another transcript",
                            cu.id, seg_id
                        );
                        violations += 1;
                    }
                    None => {
                        println!(
                            "✗ cu {}: occurrence endpoint {} is missing from segments",
                            cu.id, seg_id
                        );
                        violations += 1;
                    }
                }
            }
        }
    }

    if integrity != "ok" {
        anyhow::bail!("database integrity check failed");
    }
    if violations > 0 {
        anyhow::bail!("{violations} canonical-unit invariant violations");
    }

    println!("\nAll checks passed.");
    Ok(())
}

async fn count(conn: &libsql::Connection, table: &str) -> anyhow::Result<i64> {
    let mut rows = conn
        .query(&format!("SELECT COUNT(*) FROM {table}"), ())
        .await?;
    let row = rows.next().await?.context("count returned nothing")?;
    Ok(row.get::<i64>(0)?)
}

async fn segment_owner(conn: &libsql::Connection, seg_id: i64) -> anyhow::Result<Option<i64>> {
    let mut rows = conn
        .query(
            "SELECT transcript_id FROM segments WHERE id = ?1",
            libsql::params![seg_id],
        )
        .await?;
    Ok(match rows.next().await? {
        Some(row) => Some(row.get::<i64>(0)?),
        None => None,
    })
}
