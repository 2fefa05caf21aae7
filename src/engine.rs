use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::api::{OpenSeaClient, window_floor};
use crate::config::BotConfig;
use crate::error::Result;
use crate::filter::{AllowList, display_name};
use crate::message::build_message;
use crate::publisher::{ChatConnector, publish};
use crate::types::{DisplayMessage, RunOutcome, SaleEvent};

/// Keep the sales whose name passes the allow-list and build their messages.
///
/// Order is preserved (oldest first). Bundle sales, which have no single
/// asset, are skipped.
pub fn select_messages(sales: &[SaleEvent], allow: &AllowList) -> Result<Vec<DisplayMessage>> {
    let mut messages = Vec::new();
    for sale in sales {
        let Some(asset) = &sale.asset else {
            debug!("Skipping sale without a single asset");
            continue;
        };
        let name = display_name(asset.name.as_deref());
        if !allow.accepts(name) {
            debug!("Skipping \"{name}\": not in allow-list");
            continue;
        }
        messages.push(build_message(sale)?);
    }
    Ok(messages)
}

/// One full pass: fetch, filter, build, publish.
///
/// The chat connector is only used when at least one sale qualifies, so a
/// quiet window makes no chat calls at all. Delivery failures are collected
/// across every channel before the run is failed.
pub async fn run<C>(
    config: &BotConfig,
    opensea: &OpenSeaClient,
    allow: &AllowList,
    connector: &C,
    now: DateTime<Utc>,
) -> Result<RunOutcome>
where
    C: ChatConnector,
{
    let floor = window_floor(now, config.lookback_secs);
    info!(
        "Fetching sales for {} since {floor} (lookback {}s)",
        config.collection_slug, config.lookback_secs
    );
    let sales = opensea.fetch_sales(&config.collection_slug, floor).await?;

    debug!("Filtering against {} allow-listed name(s)", allow.len());
    let messages = select_messages(&sales, allow)?;
    if messages.is_empty() {
        debug!("No qualifying sales among {} fetched event(s)", sales.len());
        return Ok(RunOutcome::NoRecentSales);
    }
    info!(
        "{} of {} sale(s) match, posting to {} channel(s)",
        messages.len(),
        sales.len(),
        config.channels.len()
    );

    let client = connector.connect().await?;
    let report = publish(
        &client,
        &config.channels,
        &messages,
        config.max_concurrent_deliveries,
    )
    .await;
    let deliveries = report.into_result()?;

    Ok(RunOutcome::Published {
        sales: messages.len(),
        deliveries,
    })
}
