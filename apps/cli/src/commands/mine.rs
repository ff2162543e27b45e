use anyhow::Context;
use refrain_db_core::Database;
use refrain_miner::MinerConfig;

pub struct Options {
    pub seed: i64,
    pub k: usize,
    pub min_tokens: usize,
    pub refresh: bool,
    pub clear: bool,
    pub json: bool,
}

pub async fn run(db: &Database, opts: Options) -> anyhow::Result<()> {
    let conn = db.conn();

    if opts.clear {
        refrain_corpus::cus::clear(&conn)
            .await
            .context("clearing canonical units")?;
        println!("Cleared canonical units and occurrences.");
    }

    if opts.refresh {
        let rows = refrain_window_index::rebuild(&conn, opts.k)
            .await
            .context("rebuilding window index")?;
        println!("Rebuilt window index (k={}) with {} rows.", opts.k, rows);
    }

    let config = MinerConfig {
        window_size: opts.k,
        min_seed_tokens: opts.min_tokens,
        ..MinerConfig::default()
    };
    let summary = refrain_miner::build_first_cu(db, opts.seed, &config)
        .await
        .context("mining")?;

    let Some(summary) = summary else {
        println!("No CU found starting from transcript {}.", opts.seed);
        return Ok(());
    };

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Built CU {}", summary.cu_id);
    println!("Tokens: {}", summary.phrase.split_whitespace().count());
    if summary.phrase.chars().count() > 1000 {
        let head: String = summary.phrase.chars().take(1000).collect();
        println!("Phrase: {head} …");
    } else {
        println!("Phrase: {}", summary.phrase);
    }

    println!("Members:");
    let tids: Vec<i64> = summary.members.keys().copied().collect();
    let sources = refrain_corpus::transcripts::source_ids(&conn, &tids)
        .await
        .context("resolving transcript sources")?;
    for (tid, span) in &summary.members {
        let source = sources.get(tid).map(String::as_str).unwrap_or("?");
        println!("  T{} [{}]: segs {}-{}", tid, source, span.start_id, span.end_id);
    }

    println!("Children CUs created: {}", summary.children_created);
    Ok(())
}
