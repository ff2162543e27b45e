use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "refrain", about = "Mine recurring phrases from transcript corpora")]
struct Cli {
    /// Database file.
    #[arg(long, env = "REFRAIN_DB", default_value = "data/refrain.db", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Mine one canonical unit family starting from a seed transcript.
    Mine {
        /// Seed transcript id.
        #[arg(long, default_value_t = 1)]
        seed: i64,

        /// Window size for the sliding index.
        #[arg(long, default_value_t = 3)]
        k: usize,

        /// Minimum word tokens for a seed window.
        #[arg(long, default_value_t = 10)]
        min_tokens: usize,

        /// Rebuild the window index before mining.
        #[arg(long)]
        refresh: bool,

        /// Clear canonical units and occurrences first.
        #[arg(long)]
        clear: bool,

        /// Print the summary as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Import a JSON transcript dump into a project.
    Import {
        file: PathBuf,

        /// Project slug to import into.
        #[arg(long, default_value = "default")]
        project: String,
    },

    /// Check store health and canonical-unit invariants.
    Verify,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Some(parent) = cli.db.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).context("creating database directory")?;
    }

    let db = refrain_db_core::DatabaseBuilder::default()
        .local(&cli.db)
        .build()
        .await
        .context("opening database")?;

    match cli.command {
        Command::Mine {
            seed,
            k,
            min_tokens,
            refresh,
            clear,
            json,
        } => {
            commands::mine::run(
                &db,
                commands::mine::Options {
                    seed,
                    k,
                    min_tokens,
                    refresh,
                    clear,
                    json,
                },
            )
            .await
        }
        Command::Import { file, project } => commands::import::run(&db, &file, &project).await,
        Command::Verify => commands::verify::run(&db).await,
    }
}
