mod config;
mod error;
mod extract;
mod geography;
mod llm;
mod passes;
mod probe;
mod reconcile;
mod resolve;
mod store;
mod text;
mod variants;

#[cfg(test)]
mod test_support;

use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::{Pacing, Settings};
use crate::llm::OpenAiClient;
use crate::probe::HttpFetcher;
use crate::store::{SqliteStore, Store, StoreStats};

#[derive(Parser)]
#[command(
    name = "startup_scout",
    about = "European accelerator and startup lead pipeline"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and its tables
    Init,
    /// Discover European accelerators and store verified rows
    Scout {
        /// How many accelerator names to ask the model for
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// Find startups for each verified accelerator that has none yet
    Startups {
        /// Where candidates come from
        #[arg(short, long, value_enum, default_value = "knowledge")]
        strategy: passes::Strategy,
    },
    /// Write one-line value propositions for startups missing one
    Propositions,
    /// Re-check rows still waiting for a verification verdict
    Verify {
        #[arg(value_enum)]
        target: VerifyTarget,
    },
    /// Show table counts
    Stats,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VerifyTarget {
    Accelerators,
    Startups,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let pacing = Pacing::default();

    let result = match cli.command {
        Commands::Init => {
            SqliteStore::open(&settings.db_path)?;
            println!("Database ready at {}", settings.db_path);
            Ok(())
        }
        Commands::Scout { count } => {
            let store = SqliteStore::open(&settings.db_path)?;
            let llm = OpenAiClient::from_settings(&settings)?;
            let fetcher = HttpFetcher::new()?;
            let summary =
                passes::scout_accelerators(&store, &llm, &fetcher, count, &pacing).await?;
            summary.print();
            Ok(())
        }
        Commands::Startups { strategy } => {
            let store = SqliteStore::open(&settings.db_path)?;
            if store.accelerators()?.is_empty() {
                println!("No accelerators yet. Run 'scout' first.");
                return Ok(());
            }
            let llm = OpenAiClient::from_settings(&settings)?;
            let fetcher = HttpFetcher::new()?;
            let summary =
                passes::find_startups(&store, &llm, &fetcher, strategy, &pacing).await?;
            summary.print();
            Ok(())
        }
        Commands::Propositions => {
            let store = SqliteStore::open(&settings.db_path)?;
            if store.startups()?.is_empty() {
                println!("No startups yet. Run 'startups' first.");
                return Ok(());
            }
            let llm = OpenAiClient::from_settings(&settings)?;
            let summary =
                passes::generate_value_propositions(&store, &llm, &pacing).await?;
            summary.print();
            Ok(())
        }
        Commands::Verify { target } => {
            let store = SqliteStore::open(&settings.db_path)?;
            let fetcher = HttpFetcher::new()?;
            let summary = match target {
                VerifyTarget::Accelerators => {
                    passes::verify_accelerators(&store, &fetcher, &pacing).await?
                }
                VerifyTarget::Startups => {
                    passes::verify_startups(&store, &fetcher, &pacing).await?
                }
            };
            summary.print();
            Ok(())
        }
        Commands::Stats => {
            let store = SqliteStore::open(&settings.db_path)?;
            let stats = StoreStats::compute(&store.accelerators()?, &store.startups()?);
            stats.print();
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
