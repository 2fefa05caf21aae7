use async_trait::async_trait;
use serde::Serialize;

use crate::error::{BotError, Result};
use crate::publisher::{ChatClient, ChatConnector};
use crate::types::{Channel, ChannelTarget, DisplayMessage};

/// One would-be delivery, as printed in dry-run mode.
#[derive(Debug, Serialize)]
pub struct DryRunDelivery<'a> {
    pub channel: &'a str,
    pub embed: &'a DisplayMessage,
}

/// Emit a would-be delivery as a single JSON line to stdout.
pub fn report_delivery(delivery: &DryRunDelivery<'_>) -> Result<()> {
    let json = serde_json::to_string(delivery).map_err(|e| BotError::parse("embed", e))?;
    println!("{json}");
    Ok(())
}

/// Chat connector for `--dry-run`: no login, every target resolves to itself,
/// and sends are printed instead of posted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunConnector;

#[async_trait]
impl ChatConnector for DryRunConnector {
    type Client = DryRunClient;

    async fn connect(&self) -> Result<DryRunClient> {
        Ok(DryRunClient)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunClient;

#[async_trait]
impl ChatClient for DryRunClient {
    async fn resolve_channel(&self, target: &ChannelTarget) -> Result<Channel> {
        Ok(Channel {
            id: target.0.clone(),
            name: None,
        })
    }

    async fn send_message(&self, channel: &Channel, message: &DisplayMessage) -> Result<()> {
        report_delivery(&DryRunDelivery {
            channel: &channel.id,
            embed: message,
        })
    }
}
