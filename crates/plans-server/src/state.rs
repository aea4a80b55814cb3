//! Application State

use std::sync::Arc;

use paypal_plans::PaymentGateway;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment gateway (None if credentials are missing)
    pub gateway: Option<Arc<dyn PaymentGateway>>,
}
