mod config;
mod models;
mod pipeline;
mod reconcile;
mod scraper;
mod utils;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;
use crate::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "ipo-radar", about = "IPO calendar, GMP and subscription scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Print the IPO calendar with reconciled GMP links as a JSON array
    Calendar,

    /// Print details and/or GMP timeline for one IPO
    Details {
        /// Company detail-page URL (skipped when absent)
        #[arg(long)]
        details_url: Option<String>,

        /// GMP detail-page URL (skipped when absent)
        #[arg(long)]
        gmp_url: Option<String>,
    },

    /// Print live subscription figures from the aggregate page
    Subscription,

    /// Enrich every calendar entry and write one JSON snapshot file
    Export {
        /// Output path (written in one shot)
        #[arg(short, long, default_value = "stocks.json")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "ipo_radar=info,warn",
        1 => "ipo_radar=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let pipeline = Pipeline::new(&config)?;

    match cli.command {
        Command::Calendar => {
            let _t = utils::Timer::start("Calendar scrape");
            let listings = pipeline.calendar().await?;
            println!("{}", serde_json::to_string_pretty(&listings)?);
        }

        Command::Details { details_url, gmp_url } => {
            let _t = utils::Timer::start("Detail scrape");
            let response = pipeline
                .details(details_url.as_deref(), gmp_url.as_deref())
                .await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }

        Command::Subscription => match pipeline.subscriptions().await {
            Ok(records) => println!("{}", serde_json::to_string_pretty(&records)?),
            Err(e) => {
                error!("Subscription scrape failed: {:#}", e);
                println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
                std::process::exit(1);
            }
        },

        Command::Export { out } => {
            let _t = utils::Timer::start("Snapshot export");
            let stats = pipeline.export(&out).await?;
            info!(
                "Done: {} listings exported, {} errors → {:?}",
                stats.listings, stats.errors, out
            );
        }
    }

    Ok(())
}
