//! Gateway Configuration

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

const SANDBOX_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
const LIVE_BASE_URL: &str = "https://api-m.paypal.com";

/// Gateway environment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Sandbox,
    Live,
}

impl Mode {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "live" => Ok(Self::Live),
            other => Err(PaymentError::Validation(format!(
                "mode must be one of [sandbox, live], got \"{other}\""
            ))),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Live => "live",
        }
    }

    pub const fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => SANDBOX_BASE_URL,
            Self::Live => LIVE_BASE_URL,
        }
    }
}

/// Credentials and endpoint for the payment gateway
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub mode: Mode,
    pub client_id: String,
    pub client_secret: SecretString,

    /// API root; defaults to the mode's public endpoint
    pub base_url: String,

    /// Per-request timeout. `None` leaves timing to the caller.
    pub timeout: Option<Duration>,
}

impl GatewayConfig {
    pub fn new(mode: Mode, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            mode,
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            base_url: mode.base_url().to_string(),
            timeout: None,
        }
    }

    /// Create from environment variables
    ///
    /// Reads `PAYPAL_MODE` (default sandbox), `PAYPAL_CLIENT_ID`,
    /// `PAYPAL_CLIENT_SECRET`, and optionally `PAYPAL_BASE_URL` and
    /// `PAYPAL_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        let mode = match std::env::var("PAYPAL_MODE") {
            Ok(m) => Mode::parse(&m)?,
            Err(_) => Mode::default(),
        };
        let client_id = std::env::var("PAYPAL_CLIENT_ID")
            .map_err(|_| PaymentError::Config("PAYPAL_CLIENT_ID not set".into()))?;
        let client_secret = std::env::var("PAYPAL_CLIENT_SECRET")
            .map_err(|_| PaymentError::Config("PAYPAL_CLIENT_SECRET not set".into()))?;

        let mut config = Self::new(mode, client_id, client_secret);
        if let Ok(url) = std::env::var("PAYPAL_BASE_URL") {
            config = config.with_base_url(url);
        }
        if let Some(secs) = std::env::var("PAYPAL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Point at a different API root (mock servers in tests)
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_is_case_insensitive() {
        assert_eq!(Mode::parse("LIVE").unwrap(), Mode::Live);
        assert_eq!(Mode::parse(" sandbox ").unwrap(), Mode::Sandbox);
        assert!(Mode::parse("production").is_err());
    }

    #[test]
    fn test_config_defaults_to_mode_url() {
        let config = GatewayConfig::new(Mode::Live, "id", "secret");
        assert_eq!(config.base_url, LIVE_BASE_URL);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_base_url_override_strips_trailing_slash() {
        let config = GatewayConfig::new(Mode::Sandbox, "id", "secret")
            .with_base_url("http://127.0.0.1:9000/");
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
    }
}
