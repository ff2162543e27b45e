use std::path::Path;

use anyhow::Context;
use refrain_db_core::Database;

pub async fn run(db: &Database, file: &Path, project: &str) -> anyhow::Result<()> {
    let conn = db.conn();
    let report = refrain_corpus::import::import_path(&conn, file, project)
        .await
        .with_context(|| format!("importing {}", file.display()))?;

    println!(
        "Imported {} transcripts, {} segments ({} records skipped).",
        report.transcripts, report.segments, report.skipped
    );
    Ok(())
}
