use thiserror::Error;

/// Configuration errors, raised before any network I/O.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required setting: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Every way a run can fail. None of these are retried.
#[derive(Error, Debug)]
pub enum BotError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("failed to parse {what}: {reason}")]
    Parse { what: &'static str, reason: String },

    #[error("{failed} of {attempted} deliveries failed (first: {first})")]
    Delivery {
        failed: usize,
        attempted: usize,
        first: String,
    },
}

impl BotError {
    pub(crate) fn transport(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn parse(what: &'static str, reason: impl ToString) -> Self {
        Self::Parse {
            what,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
