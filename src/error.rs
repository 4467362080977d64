use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unable to initialize trap, check manager is disabled")]
    Disabled,

    #[error("Invalid {kind} CID [{cid}]")]
    InvalidCid { kind: &'static str, cid: String },

    #[error("Invalid submission URL [{url}]: {reason}")]
    InvalidSubmissionUrl { url: String, reason: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Multiple possibilities, {active} active check bundles match criteria {criteria}")]
    AmbiguousSearch { criteria: String, active: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No valid brokers available: {0}")]
    NoBrokers(String),

    #[error("Unable to match URL host ({host}) to broker {broker}")]
    BrokerMismatch { host: String, broker: String },

    #[error("Random source failure: {0}")]
    Random(#[from] rand::Error),

    #[error("Trap has not been resolved")]
    Unresolved,
}

impl CheckError {
    /// True for errors that describe local misconfiguration rather than a remote failure.
    pub fn is_config(&self) -> bool {
        matches!(self, CheckError::Config(_) | CheckError::Disabled)
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
