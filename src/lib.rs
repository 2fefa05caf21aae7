pub mod api;
pub mod config;
pub mod discord;
pub mod engine;
pub mod error;
pub mod filter;
pub mod message;
pub mod publisher;
pub mod reporter;
pub mod types;

/// OpenSea REST API base URL (events endpoint lives under `/api/v1`)
pub const OPENSEA_API_BASE: &str = "https://api.opensea.io";

/// Discord REST API base URL
pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Display name substituted for sales whose asset has no name.
pub const UNNAMED_NFT: &str = "Unnamed NFT";
