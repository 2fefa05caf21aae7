use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::{body_snippet, read_body};
use crate::error::{BotError, Result};
use crate::publisher::{ChatClient, ChatConnector};
use crate::types::{Channel, ChannelTarget, DisplayMessage};

/// 429 responses honoured for one request before it is failed.
const MAX_RATE_LIMIT_WAITS: u32 = 3;

/// Longest `retry_after` the client will sleep through.
const MAX_RATE_LIMIT_DELAY: Duration = Duration::from_secs(60);

/// The bot account behind the token, as returned by `GET /users/@me`.
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
}

/// Body Discord sends with a 429.
#[derive(Debug, Deserialize)]
struct RateLimited {
    retry_after: f64,
}

/// Logs in to the Discord REST API with a bot token.
#[derive(Debug, Clone)]
pub struct DiscordConnector {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl DiscordConnector {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl ChatConnector for DiscordConnector {
    type Client = DiscordClient;

    /// Validate the token once; the returned client reuses it for every call.
    async fn connect(&self) -> Result<DiscordClient> {
        let url = format!("{}/users/@me", self.base_url);
        let authorization = format!("Bot {}", self.token);

        let body = execute(
            || self.http.get(&url).header(AUTHORIZATION, &authorization),
            &url,
        )
        .await?;
        let user: CurrentUser =
            serde_json::from_str(&body).map_err(|e| BotError::parse("Discord user", e))?;

        info!("Logged in to Discord as {} ({})", user.username, user.id);
        Ok(DiscordClient {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            authorization,
        })
    }
}

/// An authenticated Discord client. Read-only once built.
#[derive(Debug, Clone)]
pub struct DiscordClient {
    http: reqwest::Client,
    base_url: String,
    authorization: String,
}

#[async_trait]
impl ChatClient for DiscordClient {
    async fn resolve_channel(&self, target: &ChannelTarget) -> Result<Channel> {
        let url = format!("{}/channels/{}", self.base_url, target.0);
        let body = execute(
            || self.http.get(&url).header(AUTHORIZATION, &self.authorization),
            &url,
        )
        .await?;
        let channel: Channel =
            serde_json::from_str(&body).map_err(|e| BotError::parse("Discord channel", e))?;
        debug!("Resolved channel {target} as {:?}", channel.name);
        Ok(channel)
    }

    async fn send_message(&self, channel: &Channel, message: &DisplayMessage) -> Result<()> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel.id);
        let payload = json!({ "embeds": [message] });
        execute(
            || {
                self.http
                    .post(&url)
                    .header(AUTHORIZATION, &self.authorization)
                    .json(&payload)
            },
            &url,
        )
        .await?;
        Ok(())
    }
}

/// Send a Discord request, waiting out rate limits.
///
/// A 429 carries how long to back off (`retry_after` in the body, or the
/// `Retry-After` header); the request is rebuilt and sent again after that
/// delay, up to `MAX_RATE_LIMIT_WAITS` times.
async fn execute<F>(build: F, url: &str) -> Result<String>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut waits = 0;
    loop {
        let resp = build()
            .send()
            .await
            .map_err(|e| BotError::transport(url, e))?;
        if resp.status() != StatusCode::TOO_MANY_REQUESTS {
            return read_body(resp, url).await;
        }

        let header = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = resp
            .text()
            .await
            .map_err(|e| BotError::transport(url, e))?;

        match retry_delay(header.as_deref(), &body) {
            Some(delay) if waits < MAX_RATE_LIMIT_WAITS && delay <= MAX_RATE_LIMIT_DELAY => {
                waits += 1;
                warn!("Rate limited on {url}, retrying in {delay:?} ({waits}/{MAX_RATE_LIMIT_WAITS})");
                tokio::time::sleep(delay).await;
            }
            _ => {
                return Err(BotError::transport(
                    url,
                    format!("HTTP 429 Too Many Requests: {}", body_snippet(&body)),
                ));
            }
        }
    }
}

/// Back-off for a 429: the body's `retry_after` seconds, else the header's.
fn retry_delay(header: Option<&str>, body: &str) -> Option<Duration> {
    serde_json::from_str::<RateLimited>(body)
        .ok()
        .map(|r| r.retry_after)
        .or_else(|| header.and_then(|h| h.trim().parse::<f64>().ok()))
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}
