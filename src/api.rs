use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{BotError, Result};
use crate::types::{EventsResponse, SaleEvent};

/// The lookback window is scaled by this factor when computing the fetch floor.
///
/// Kept from the deployed bot, which queried four windows back on every run.
pub const LOOKBACK_MULTIPLIER: i64 = 4;

/// Longest slice of an error body carried into a transport error.
const ERROR_BODY_LIMIT: usize = 200;

/// Epoch seconds of the oldest sale to request: `now - 4 * lookback_secs`.
pub fn window_floor(now: DateTime<Utc>, lookback_secs: u64) -> i64 {
    let lookback = i64::try_from(lookback_secs).unwrap_or(i64::MAX);
    now.timestamp()
        .saturating_sub(lookback.saturating_mul(LOOKBACK_MULTIPLIER))
}

/// Client for the OpenSea v1 events endpoint.
#[derive(Debug, Clone)]
pub struct OpenSeaClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenSeaClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn events_url(&self) -> String {
        format!("{}/api/v1/events", self.base_url)
    }

    /// Fetch successful sales for `collection_slug` that occurred after `occurred_after`.
    ///
    /// Returns the events oldest-first (the API sends newest-first).
    pub async fn fetch_sales(
        &self,
        collection_slug: &str,
        occurred_after: i64,
    ) -> Result<Vec<SaleEvent>> {
        let url = self.events_url();
        let occurred_after = occurred_after.to_string();

        let mut req = self.http.get(&url).query(&[
            ("offset", "0"),
            ("event_type", "successful"),
            ("only_opensea", "false"),
            ("occurred_after", occurred_after.as_str()),
            ("collection_slug", collection_slug),
        ]);
        if let Some(key) = &self.api_key {
            req = req.header("X-API-KEY", key);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| BotError::transport(&url, e))?;
        let body = read_body(resp, &url).await?;

        let parsed: EventsResponse =
            serde_json::from_str(&body).map_err(|e| BotError::parse("events response", e))?;

        let mut events = parsed.asset_events;
        events.reverse();
        debug!("Fetched {} sale event(s) for {collection_slug}", events.len());
        Ok(events)
    }
}

/// Read a response body, turning non-2xx statuses into transport errors.
pub(crate) async fn read_body(resp: reqwest::Response, endpoint: &str) -> Result<String> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| BotError::transport(endpoint, e))?;

    if !status.is_success() {
        return Err(BotError::transport(
            endpoint,
            format!("HTTP {status}: {}", body_snippet(&body)),
        ));
    }
    Ok(body)
}

/// Leading slice of an error body, for error messages.
pub(crate) fn body_snippet(body: &str) -> String {
    body.chars().take(ERROR_BODY_LIMIT).collect()
}
