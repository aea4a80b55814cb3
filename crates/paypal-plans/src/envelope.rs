//! Result Envelope
//!
//! Every public operation resolves to `{error, message, response}` instead of
//! returning an error past the crate boundary.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Uniform result shape returned by every public operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub error: bool,
    pub message: String,
    pub response: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(response: T) -> Self {
        Self {
            error: false,
            message: String::new(),
            response: Some(response),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: true,
            message: message.into(),
            response: None,
        }
    }

    /// Collapse a result, using `fallback` when a gateway failure has no detail
    pub fn from_result(result: Result<T>, fallback: &str) -> Self {
        match result {
            Ok(response) => Self::success(response),
            Err(err) => Self::failure(err.envelope_message(fallback)),
        }
    }

    pub fn is_success(&self) -> bool {
        !self.error
    }

    pub fn into_response(self) -> Option<T> {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PaymentError;

    #[test]
    fn test_failure_has_no_response() {
        let env: Envelope<String> =
            Envelope::from_result(Err(PaymentError::gateway(502)), "Could not make payment");
        assert!(env.error);
        assert!(env.response.is_none());
        assert_eq!(env.message, "Could not make payment");
    }

    #[test]
    fn test_success_shape_serializes() {
        let env = Envelope::success("SALE-1".to_string());
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": false, "message": "", "response": "SALE-1"})
        );
    }
}
