//! sales-bot: post recent OpenSea sales of one collection to Discord.
//!
//! Meant to be run on a schedule: each invocation fetches the sales in the
//! lookback window, keeps the allow-listed ones, and posts one embed per sale
//! to every configured channel. Exits non-zero if anything fails.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use opensea_sales_bot::api::OpenSeaClient;
use opensea_sales_bot::config::{self, BotConfig};
use opensea_sales_bot::discord::DiscordConnector;
use opensea_sales_bot::engine;
use opensea_sales_bot::filter::AllowList;
use opensea_sales_bot::reporter::DryRunConnector;
use opensea_sales_bot::types::RunOutcome;

#[derive(Parser)]
#[command(name = "sales-bot", about = "Announce recent OpenSea sales on Discord")]
struct Args {
    /// Print the embeds as JSON lines instead of posting them
    #[arg(long)]
    dry_run: bool,

    /// Load environment from this file instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // The env file may set RUST_LOG, so load it before the filter is built.
    let args = Args::parse();
    config::load_env_file(args.env_file.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = BotConfig::from_env()?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("opensea-sales-bot/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let opensea = OpenSeaClient::new(
        http.clone(),
        config.opensea_api_base.clone(),
        config.opensea_api_key.clone(),
    );
    let allow = AllowList::builtin();
    if allow.is_empty() {
        warn!("Allow-list is empty; no sale will be announced");
    }
    let now = chrono::Utc::now();

    let outcome = if args.dry_run {
        info!("Dry run: embeds are printed, nothing is posted");
        engine::run(&config, &opensea, &allow, &DryRunConnector, now).await?
    } else {
        let discord = DiscordConnector::new(
            http,
            config.discord_api_base.clone(),
            config.bot_token.clone(),
        );
        engine::run(&config, &opensea, &allow, &discord, now).await?
    };

    match outcome {
        RunOutcome::NoRecentSales => info!("No recent sales"),
        RunOutcome::Published { sales, deliveries } => {
            info!("Announced {sales} sale(s) with {deliveries} delivery(ies)")
        }
    }
    Ok(())
}
