//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Caller input rejected before any network call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Gateway rejected the request (auth, business rule, unknown resource)
    #[error("Gateway error (HTTP {}): {}", .status, .details.as_deref().unwrap_or("no details"))]
    Gateway {
        status: u16,
        details: Option<String>,
    },

    /// Gateway answered successfully but the payload was not what we expect
    #[error("Unexpected gateway response: {0}")]
    UnexpectedResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport failure talking to the gateway
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PaymentError {
    /// Build a gateway rejection without a detail payload
    pub fn gateway(status: u16) -> Self {
        Self::Gateway { status, details: None }
    }

    /// Message surfaced in the result envelope.
    ///
    /// Gateway rejections carry the gateway's detail string when it sent one,
    /// otherwise the operation's `fallback` phrase. Everything else uses its
    /// own message.
    pub fn envelope_message(&self, fallback: &str) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Gateway { details: Some(details), .. } => details.clone(),
            Self::Gateway { details: None, .. } => fallback.to_string(),
            other => other.to_string(),
        }
    }
}
