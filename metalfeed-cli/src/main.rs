//! metalfeed CLI — daily update and historical backfill commands.
//!
//! Commands:
//! - `update` — fetch today's quotes (one batched rates call + per-ticker CSV
//!   closes) and upsert them into the per-symbol series files
//! - `backfill` — one-shot historical load via chunked timeframe calls
//!
//! Configuration comes from the environment (optionally a `.env` file):
//! `METALPRICE_API_KEY` (required), `BASE_CURRENCY` (default USD),
//! `FORCE_UPDATE=1` to bypass the daily gate.

use anyhow::Result;
use clap::{Parser, Subcommand};
use metalfeed_core::config::Config;
use metalfeed_core::metalprice::MetalpriceClient;
use metalfeed_core::stooq::StooqClient;
use metalfeed_core::store::JsonStore;
use metalfeed_core::{backfill, update};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "metalfeed", about = "metalfeed CLI — daily metal price feed")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch today's quotes and upsert them into the series files.
    Update {
        /// Data directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Re-fetch even if already updated today (UTC).
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// One-shot historical backfill via chunked timeframe calls.
    Backfill {
        /// Data directory. Defaults to ./data.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Years of history to fetch.
        #[arg(long, default_value_t = 5)]
        years: u32,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Update { data_dir, force } => run_update_cmd(data_dir, force),
        Commands::Backfill { data_dir, years } => run_backfill_cmd(data_dir, years),
    }
}

fn run_update_cmd(data_dir: PathBuf, force_flag: bool) -> Result<()> {
    let config = Config::from_env()?;
    let store = JsonStore::new(data_dir);
    let rates = MetalpriceClient::new(config.api_key.clone());
    let closes = StooqClient::new();

    let outcome = update::run_update(
        &store,
        &rates,
        &closes,
        &config.base,
        force_flag || config.force,
    )?;

    if outcome.skipped {
        println!("Already updated today (UTC). Skipping API call.");
        return Ok(());
    }

    for (symbol, date, value) in &outcome.saved {
        println!("Saved {symbol} @ {date} ({value})");
    }
    println!("Done.");
    Ok(())
}

fn run_backfill_cmd(data_dir: PathBuf, years: u32) -> Result<()> {
    let config = Config::from_env()?;
    let store = JsonStore::new(data_dir);
    let rates = MetalpriceClient::new(config.api_key.clone());

    let outcome = backfill::run_backfill(&store, &rates, &config.base, years)?;

    for (symbol, rows) in &outcome.written {
        println!("Wrote {symbol}: {rows} rows");
    }
    println!("Backfill complete ({} timeframe calls).", outcome.calls);
    Ok(())
}
