use std::path::Path;

use anyhow::Context;
use url::Url;

use crate::error::ConfigError;
use crate::types::ChannelTarget;
use crate::{DISCORD_API_BASE, OPENSEA_API_BASE};

/// Default lookback window in seconds when `SECONDS` is unset.
pub const DEFAULT_LOOKBACK_SECS: u64 = 3_600;

/// Separator between channel ids in `DISCORD_CHANNEL_ID`.
pub const CHANNEL_SEPARATOR: char = ';';

/// Settings for one run, read from the environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Discord bot token (`DISCORD_BOT_TOKEN`).
    pub bot_token: String,
    /// Destination channels (`DISCORD_CHANNEL_ID`, `;`-separated).
    pub channels: Vec<ChannelTarget>,
    /// OpenSea collection slug (`COLLECTION_SLUG`).
    pub collection_slug: String,
    /// Optional OpenSea API key (`OPENSEA_TOKEN`).
    pub opensea_api_key: Option<String>,
    /// Lookback window in seconds (`SECONDS`).
    pub lookback_secs: u64,
    /// Cap on in-flight deliveries (`MAX_CONCURRENT_DELIVERIES`); `None` is unbounded.
    pub max_concurrent_deliveries: Option<usize>,
    pub opensea_api_base: String,
    pub discord_api_base: String,
}

impl BotConfig {
    /// Read config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read config through an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |field: &'static str| get(field).ok_or(ConfigError::MissingField { field });

        // Token first: without it nothing else matters.
        let bot_token = require("DISCORD_BOT_TOKEN")?;

        let channels = parse_channels(&require("DISCORD_CHANNEL_ID")?);
        if channels.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "DISCORD_CHANNEL_ID",
                reason: "no channel ids listed".into(),
            });
        }

        let collection_slug = require("COLLECTION_SLUG")?;

        let lookback_secs = match get("SECONDS") {
            Some(raw) => parse_number("SECONDS", &raw)?,
            None => DEFAULT_LOOKBACK_SECS,
        };

        let max_concurrent_deliveries = match get("MAX_CONCURRENT_DELIVERIES") {
            Some(raw) => match parse_number::<usize>("MAX_CONCURRENT_DELIVERIES", &raw)? {
                0 => {
                    return Err(ConfigError::InvalidValue {
                        field: "MAX_CONCURRENT_DELIVERIES",
                        reason: "must be at least 1".into(),
                    });
                }
                n => Some(n),
            },
            None => None,
        };

        let opensea_api_base = parse_base_url(
            "OPENSEA_API_BASE",
            get("OPENSEA_API_BASE").as_deref().unwrap_or(OPENSEA_API_BASE),
        )?;
        let discord_api_base = parse_base_url(
            "DISCORD_API_BASE",
            get("DISCORD_API_BASE").as_deref().unwrap_or(DISCORD_API_BASE),
        )?;

        Ok(Self {
            bot_token,
            channels,
            collection_slug,
            opensea_api_key: get("OPENSEA_TOKEN"),
            lookback_secs,
            max_concurrent_deliveries,
            opensea_api_base,
            discord_api_base,
        })
    }
}

/// Load a dotenv file into the process environment.
///
/// With no explicit path, a missing `.env` is fine; an explicit path must exist.
pub fn load_env_file(path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }
    Ok(())
}

/// Split a `;`-separated channel list, dropping blank entries.
pub fn parse_channels(raw: &str) -> Vec<ChannelTarget> {
    raw.split(CHANNEL_SEPARATOR)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| ChannelTarget(id.to_string()))
        .collect()
}

fn parse_number<T>(field: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            field,
            reason: format!("{raw:?}: {e}"),
        })
}

/// Validate a base URL and strip any trailing slash so paths can be appended.
fn parse_base_url(field: &'static str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
        field,
        reason: format!("{raw:?}: {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("unsupported scheme {:?}", url.scheme()),
        });
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("DISCORD_BOT_TOKEN", "token"),
        ("DISCORD_CHANNEL_ID", "111;222"),
        ("COLLECTION_SLUG", "my-collection"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut pairs = MINIMAL.to_vec();
        pairs.extend_from_slice(extra);
        pairs
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = BotConfig::from_lookup(lookup(MINIMAL)).unwrap();
        assert_eq!(config.bot_token, "token");
        assert_eq!(
            config.channels,
            vec![ChannelTarget("111".into()), ChannelTarget("222".into())]
        );
        assert_eq!(config.collection_slug, "my-collection");
        assert_eq!(config.opensea_api_key, None);
        assert_eq!(config.lookback_secs, DEFAULT_LOOKBACK_SECS);
        assert_eq!(config.max_concurrent_deliveries, None);
        assert_eq!(config.opensea_api_base, "https://api.opensea.io");
        assert_eq!(config.discord_api_base, "https://discord.com/api/v10");
    }

    #[test]
    fn missing_token_fails_first() {
        let err = BotConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField {
                field: "DISCORD_BOT_TOKEN"
            }
        ));
    }

    #[test]
    fn empty_token_counts_as_missing() {
        let err = BotConfig::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "  "),
            ("DISCORD_CHANNEL_ID", "1"),
            ("COLLECTION_SLUG", "c"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingField { .. }));
    }

    #[test]
    fn missing_collection_is_rejected() {
        let err = BotConfig::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "t"),
            ("DISCORD_CHANNEL_ID", "1"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField {
                field: "COLLECTION_SLUG"
            }
        ));
    }

    #[test]
    fn channel_list_of_separators_is_invalid() {
        let err = BotConfig::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "t"),
            ("DISCORD_CHANNEL_ID", ";;"),
            ("COLLECTION_SLUG", "c"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn optional_settings_are_read() {
        let config = BotConfig::from_lookup(lookup(&with(&[
            ("OPENSEA_TOKEN", "key"),
            ("SECONDS", "600"),
            ("MAX_CONCURRENT_DELIVERIES", "4"),
            ("OPENSEA_API_BASE", "http://127.0.0.1:9000/"),
        ])))
        .unwrap();
        assert_eq!(config.opensea_api_key.as_deref(), Some("key"));
        assert_eq!(config.lookback_secs, 600);
        assert_eq!(config.max_concurrent_deliveries, Some(4));
        assert_eq!(config.opensea_api_base, "http://127.0.0.1:9000");
    }

    #[test]
    fn bad_seconds_is_invalid() {
        let err = BotConfig::from_lookup(lookup(&with(&[("SECONDS", "an hour")]))).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "SECONDS", .. }));
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        let err = BotConfig::from_lookup(lookup(&with(&[("MAX_CONCURRENT_DELIVERIES", "0")])))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "MAX_CONCURRENT_DELIVERIES",
                ..
            }
        ));
    }

    #[test]
    fn non_http_base_is_invalid() {
        let err = BotConfig::from_lookup(lookup(&with(&[("DISCORD_API_BASE", "ftp://x")])))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "DISCORD_API_BASE",
                ..
            }
        ));
    }

    #[test]
    fn channels_are_trimmed() {
        let channels = parse_channels(" 1 ;2;; 3");
        assert_eq!(
            channels,
            vec![
                ChannelTarget("1".into()),
                ChannelTarget("2".into()),
                ChannelTarget("3".into())
            ]
        );
    }

    #[test]
    fn env_file_settings_reach_the_process_environment() {
        let path = std::env::temp_dir().join(format!("sales-bot-{}.env", std::process::id()));
        std::fs::write(&path, "SALES_BOT_TEST_RUST_LOG=opensea_sales_bot=debug\n").unwrap();

        load_env_file(Some(&path)).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(
            std::env::var("SALES_BOT_TEST_RUST_LOG").as_deref(),
            Ok("opensea_sales_bot=debug")
        );
    }

    #[test]
    fn missing_explicit_env_file_is_an_error() {
        let path = std::env::temp_dir().join("sales-bot-does-not-exist.env");
        let err = load_env_file(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("failed to load"), "{err}");
    }
}
