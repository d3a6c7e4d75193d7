use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use top_films::catalog::{counts, Db};
use top_films::fetch::{FetcherConfig, TopFilmsFetcher, OUTPUT_FILENAME};
use top_films::util::env as env_util;
use top_films::{import, logging};

#[derive(Parser, Debug)]
#[command(name = "top-films", version, about = "IMDB top-100 film catalogue pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Scrape the ranked top-100 list and write the interchange TSV
    Fetch {
        /// Output path (defaults to the fixed filename in the working directory)
        #[arg(long, default_value = OUTPUT_FILENAME)]
        out: PathBuf,
    },
    /// Import an interchange TSV into the catalogue database
    Import {
        /// Absolute or relative path of the source TSV file
        tsv_path: PathBuf,
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
    },
    /// Print row counts for the catalogue tables
    DbCounts {
        /// Optional override for the database URL
        #[arg(long)]
        db_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_util::init_env();
    logging::init_tracing("info,sqlx=warn")?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Fetch { out } => {
            let fetcher = TopFilmsFetcher::new(FetcherConfig::from_env()?)?;
            let written = fetcher.run(&out).await?;
            info!(written, path = %out.display(), "fetch finished");
        }
        Commands::Import { tsv_path, db_url } => {
            let db = Db::connect(&db_url.unwrap_or_else(env_util::database_url)).await?;
            let summary = import::run(&db, &tsv_path).await?;
            info!(
                added = summary.added,
                skipped = summary.skipped,
                "import finished"
            );
        }
        Commands::DbCounts { db_url } => {
            let db = Db::connect(&db_url.unwrap_or_else(env_util::database_url)).await?;
            counts::run(&db).await?;
        }
    }
    Ok(())
}
