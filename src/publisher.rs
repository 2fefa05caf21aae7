use async_trait::async_trait;
use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::error::{BotError, Result};
use crate::types::{Channel, ChannelTarget, DeliveryFailure, DeliveryReport, DisplayMessage};

/// A connected chat client. Shared read-only across concurrent deliveries.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Look up a configured channel, failing if it is unknown or inaccessible.
    async fn resolve_channel(&self, target: &ChannelTarget) -> Result<Channel>;

    /// Post one message to a resolved channel.
    async fn send_message(&self, channel: &Channel, message: &DisplayMessage) -> Result<()>;
}

/// Performs the one-time login handshake and hands back a ready client.
#[async_trait]
pub trait ChatConnector: Send + Sync {
    type Client: ChatClient;

    async fn connect(&self) -> Result<Self::Client>;
}

/// Deliver every message to every target.
///
/// Each target is resolved once, then all (channel, message) pairs are sent
/// concurrently, at most `max_in_flight` at a time when a cap is given.
/// Failures never cancel sibling deliveries; every attempt settles and the
/// outcome is returned in the report.
pub async fn publish<C>(
    client: &C,
    targets: &[ChannelTarget],
    messages: &[DisplayMessage],
    max_in_flight: Option<usize>,
) -> DeliveryReport
where
    C: ChatClient + ?Sized,
{
    let mut report = DeliveryReport::default();

    let resolutions = join_all(
        targets
            .iter()
            .map(|target| async move { (target, client.resolve_channel(target).await) }),
    )
    .await;

    let mut channels = Vec::with_capacity(targets.len());
    for (target, resolution) in resolutions {
        match resolution {
            Ok(channel) => channels.push(channel),
            Err(e) => {
                warn!("Failed to resolve channel {target}: {e}");
                report.attempted += messages.len();
                report
                    .failures
                    .extend(messages.iter().map(|_| DeliveryFailure {
                        channel: target.to_string(),
                        error: e.to_string(),
                    }));
            }
        }
    }

    let jobs: Vec<(&Channel, &DisplayMessage)> = channels
        .iter()
        .flat_map(|channel| messages.iter().map(move |message| (channel, message)))
        .collect();
    report.attempted += jobs.len();

    let limit = max_in_flight.unwrap_or(jobs.len()).max(1);
    let results: Vec<(&Channel, &DisplayMessage, Result<()>)> = stream::iter(jobs)
        .map(|(channel, message)| async move {
            let result = client.send_message(channel, message).await;
            (channel, message, result)
        })
        .buffer_unordered(limit)
        .collect()
        .await;

    for (channel, message, result) in results {
        match result {
            Ok(()) => {
                info!("Posted \"{}\" to {}", message.title, channel_label(channel));
                report.delivered += 1;
            }
            Err(e) => {
                warn!(
                    "Failed to post \"{}\" to {}: {e}",
                    message.title,
                    channel_label(channel)
                );
                report.failures.push(DeliveryFailure {
                    channel: channel.id.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    report
}

impl DeliveryReport {
    /// Collapse into the run result: any failure fails the whole run.
    pub fn into_result(self) -> Result<usize> {
        match self.failures.first() {
            None => Ok(self.delivered),
            Some(first) => Err(BotError::Delivery {
                failed: self.failures.len(),
                attempted: self.attempted,
                first: format!("{}: {}", first.channel, first.error),
            }),
        }
    }
}

fn channel_label(channel: &Channel) -> String {
    match &channel.name {
        Some(name) => format!("#{name} ({})", channel.id),
        None => channel.id.clone(),
    }
}

/// In-memory chat doubles shared by the publisher and engine tests.
#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;

    #[derive(Default)]
    pub struct Recorder {
        /// `(channel id, message title)` per successful send.
        pub sent: Mutex<Vec<(String, String)>>,
        pub connects: AtomicUsize,
        pub resolves: AtomicUsize,
        pub in_flight: AtomicUsize,
        pub max_in_flight: AtomicUsize,
    }

    impl Recorder {
        pub fn sent(&self) -> Vec<(String, String)> {
            let mut sent = self.sent.lock().unwrap().clone();
            sent.sort();
            sent
        }
    }

    #[derive(Clone, Default)]
    pub struct RecordingClient {
        pub recorder: Arc<Recorder>,
        pub unknown_channels: HashSet<String>,
        pub failing_channels: HashSet<String>,
        pub send_delay: Option<Duration>,
    }

    #[async_trait]
    impl ChatClient for RecordingClient {
        async fn resolve_channel(&self, target: &ChannelTarget) -> Result<Channel> {
            self.recorder.resolves.fetch_add(1, Ordering::SeqCst);
            if self.unknown_channels.contains(&target.0) {
                return Err(BotError::transport(
                    format!("channels/{target}"),
                    "HTTP 404 Not Found",
                ));
            }
            Ok(Channel {
                id: target.0.clone(),
                name: Some(format!("sales-{target}")),
            })
        }

        async fn send_message(&self, channel: &Channel, message: &DisplayMessage) -> Result<()> {
            let now = self.recorder.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.recorder.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.send_delay {
                tokio::time::sleep(delay).await;
            }
            self.recorder.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing_channels.contains(&channel.id) {
                return Err(BotError::transport(
                    format!("channels/{}/messages", channel.id),
                    "HTTP 403 Forbidden",
                ));
            }
            self.recorder
                .sent
                .lock()
                .unwrap()
                .push((channel.id.clone(), message.title.clone()));
            Ok(())
        }
    }

    /// Connector that hands out a clone of its client and counts connects.
    #[derive(Clone, Default)]
    pub struct RecordingConnector {
        pub client: RecordingClient,
        pub refuse: bool,
    }

    impl RecordingConnector {
        pub fn recorder(&self) -> Arc<Recorder> {
            Arc::clone(&self.client.recorder)
        }
    }

    #[async_trait]
    impl ChatConnector for RecordingConnector {
        type Client = RecordingClient;

        async fn connect(&self) -> Result<RecordingClient> {
            self.client.recorder.connects.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                return Err(BotError::transport("users/@me", "HTTP 401 Unauthorized"));
            }
            Ok(self.client.clone())
        }
    }
}
