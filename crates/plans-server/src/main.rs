//! paypal-plans HTTP Server
//!
//! Axum-based server exposing one-time payments, subscriptions,
//! installment plans, cancellation and refunds as JSON endpoints.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paypal_plans::{PayPalClient, PaymentGateway};

use crate::handlers::{
    cancel, confirm_agreement, confirm_payment, create_fixed, create_installments,
    create_payment, create_recurring, health_check, latest_sale, refund,
};
use crate::state::AppState;

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        // One-time payments
        .route("/api/payments", post(create_payment))
        .route("/api/payments/execute", post(confirm_payment))
        // Subscriptions
        .route("/api/plans/recurring", post(create_recurring))
        .route("/api/plans/fixed", post(create_fixed))
        .route("/api/plans/installments", post(create_installments))
        .route("/api/agreements/execute", post(confirm_agreement))
        .route("/api/subscriptions/{id}/cancel", post(cancel))
        .route("/api/subscriptions/{id}/latest-sale", get(latest_sale))
        // Refunds
        .route("/api/refunds", post(refund))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let gateway: Option<Arc<dyn PaymentGateway>> = match PayPalClient::from_env() {
        Ok(client) => {
            tracing::info!(mode = client.config().mode.as_str(), "✓ PayPal configured");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!("⚠ PayPal not configured - payments disabled: {}", e);
            tracing::warn!("  Set PAYPAL_CLIENT_ID and PAYPAL_CLIENT_SECRET in .env");
            None
        }
    };

    let app = router(AppState { gateway });

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 plans-server running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                               - Health check");
    tracing::info!("  POST /api/payments                         - One-time payment");
    tracing::info!("  POST /api/payments/execute                 - Execute payment");
    tracing::info!("  POST /api/plans/recurring                  - Recurring subscription");
    tracing::info!("  POST /api/plans/fixed                      - Fixed recurring subscription");
    tracing::info!("  POST /api/plans/installments               - Installment plan");
    tracing::info!("  POST /api/agreements/execute               - Execute billing agreement");
    tracing::info!("  POST /api/subscriptions/{{id}}/cancel        - Cancel subscription");
    tracing::info!("  GET  /api/subscriptions/{{id}}/latest-sale   - Latest sale id");
    tracing::info!("  POST /api/refunds                          - Refund a sale");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use paypal_plans::{GatewayStep, MockGateway};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app(gateway: MockGateway) -> Router {
        router(AppState {
            gateway: Some(Arc::new(gateway)),
        })
    }

    async fn call(app: Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_reports_gateway() {
        let app = router(AppState { gateway: None });
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["gateway_configured"], false);
    }

    #[tokio::test]
    async fn test_recurring_plan_returns_envelope() {
        let body = json!({
            "amount": "25.00",
            "currency": "usd",
            "frequency": "month",
            "return_url": "https://shop.test/return"
        });
        let (status, envelope) = call(app(MockGateway::new()), "POST", "/api/plans/recurring", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(envelope["error"], false);
        assert_eq!(envelope["response"]["link"]["rel"], "approval_url");
    }

    #[tokio::test]
    async fn test_failure_is_unprocessable() {
        let gateway = MockGateway::new().failing_at(GatewayStep::CancelBillingAgreement);
        let (status, envelope) =
            call(app(gateway), "POST", "/api/subscriptions/I-1/cancel", Value::Null).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(envelope["error"], true);
        assert_eq!(envelope["message"], "Could not cancel subscription");
        assert_eq!(envelope["response"], Value::Null);
    }

    #[tokio::test]
    async fn test_unparseable_body_returns_envelope() {
        let gateway = MockGateway::new();
        let body = json!({"amount": "10", "return_url": "https://shop.test/return"});
        let (status, envelope) = call(app(gateway), "POST", "/api/payments", body).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(envelope["error"], true);
        assert_eq!(envelope["response"], Value::Null);
        assert!(
            envelope["message"].as_str().unwrap().contains("missing field `currency`"),
            "{envelope}"
        );

        let (status, envelope) =
            call(app(MockGateway::new()), "POST", "/api/refunds", json!({"sale_id": 7})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(envelope["error"], true);
    }

    #[tokio::test]
    async fn test_missing_gateway_is_unavailable() {
        let app = router(AppState { gateway: None });
        let body = json!({"sale_id": "S-1", "amount": "5", "currency": "usd"});
        let (status, envelope) = call(app, "POST", "/api/refunds", body).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(envelope["message"], "Payments not configured");
    }
}
