use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── OpenSea events API ─────────────────────────────────────────────

/// Body of `GET /api/v1/events`. Only `asset_events` is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct EventsResponse {
    pub asset_events: Vec<SaleEvent>,
}

/// One completed sale as returned by the events endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SaleEvent {
    /// `None` for bundle sales, which carry `asset_bundle` instead.
    #[serde(default)]
    pub asset: Option<Asset>,
    /// Total price in wei. OpenSea sends a decimal string, but numbers are tolerated.
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub total_price: Option<String>,
    #[serde(default)]
    pub winner_account: Option<Account>,
    #[serde(default)]
    pub seller: Option<Account>,
    /// UTC-naive ISO-8601 completion time, e.g. `2021-10-01T12:34:56.123456`.
    #[serde(default)]
    pub created_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Asset {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub collection: Option<Collection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub address: Option<String>,
}

/// Wei amounts overflow `u64` above ~18.4 ETH, so numbers are kept as their
/// exact decimal text (serde_json `arbitrary_precision`).
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number for an amount, got {other}"
        ))),
    }
}

// ── Display message (Discord embed) ────────────────────────────────

/// A formatted sale announcement. Serializes to a Discord embed object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayMessage {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub color: u32,
    pub author: EmbedAuthor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<EmbedImage>,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub footer: EmbedFooter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
    pub icon_url: String,
}

// ── Channels ───────────────────────────────────────────────────────

/// A configured destination channel id, not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelTarget(pub String);

impl fmt::Display for ChannelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A channel the chat client has confirmed exists and is reachable.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

// ── Run results ────────────────────────────────────────────────────

/// A single delivery that did not go through.
#[derive(Debug, Clone)]
pub struct DeliveryFailure {
    pub channel: String,
    pub error: String,
}

/// Aggregate result of the publish phase.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failures: Vec<DeliveryFailure>,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NoRecentSales,
    Published { sales: usize, deliveries: usize },
}
