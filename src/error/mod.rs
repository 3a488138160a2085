//! Error types for warplink.

use thiserror::Error;

/// Primary error type for all warplink operations.
///
/// Inside [`LinkSession`](crate::link::LinkSession) every request failure is
/// collapsed into [`LinkStatus::Error`](crate::link::LinkStatus::Error); these
/// variants only surface from the client, configuration and QR layers.
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("QR encoding error: {0}")]
    Qr(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),
}

impl From<qrcode::types::QrError> for LinkError {
    fn from(error: qrcode::types::QrError) -> Self {
        Self::Qr(error.to_string())
    }
}

impl From<toml::de::Error> for LinkError {
    fn from(error: toml::de::Error) -> Self {
        Self::Configuration(error.to_string())
    }
}

impl LinkError {
    /// Whether the failure came from talking to the remote API.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Serialization(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, LinkError>;
