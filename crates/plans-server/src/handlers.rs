//! HTTP Handlers
//!
//! Every payment route answers with the library's envelope, including
//! bodies that fail to parse. Failures are `422 Unprocessable Entity`, or
//! `503` when no gateway is configured.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use paypal_plans::{
    AgreementLink, CancellationConfirmation, Envelope, PaymentLink, PlanRequest,
    cancel_subscription, create_fixed_recurring_plan,
    create_installment_plan, create_one_time_payment, create_recurring_plan,
    execute_billing_agreement, execute_payment, get_latest_sale_id,
    payload::{BillingAgreement, Payment, Refund},
    refund_payment,
};

use crate::state::AppState;

type Reply<T> = (StatusCode, Json<Envelope<T>>);

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub gateway_configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExecutePaymentBody {
    pub payment_id: String,
    pub payer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteAgreementBody {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefundBody {
    pub sale_id: String,
    pub amount: Decimal,
    pub currency: String,
}

// ============================================================================
// Helpers
// ============================================================================

fn reply<T>(envelope: Envelope<T>) -> Reply<T> {
    let status = if envelope.error {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::OK
    };
    (status, Json(envelope))
}

/// Malformed or incomplete body, answered as a failed envelope
fn rejected<T>(rejection: &JsonRejection) -> Reply<T> {
    tracing::debug!(status = %rejection.status(), "Rejected request body");
    reply(Envelope::failure(rejection.body_text()))
}

fn unavailable<T>() -> Reply<T> {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(Envelope::failure("Payments not configured")),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        gateway_configured: state.gateway.is_some(),
    })
}

pub async fn create_payment(
    State(state): State<AppState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Reply<PaymentLink> {
    let Json(plan) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected(&rejection),
    };
    let Some(gateway) = state.gateway.as_deref() else {
        return unavailable();
    };
    reply(create_one_time_payment(plan, gateway).await)
}

pub async fn confirm_payment(
    State(state): State<AppState>,
    payload: Result<Json<ExecutePaymentBody>, JsonRejection>,
) -> Reply<Payment> {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected(&rejection),
    };
    let Some(gateway) = state.gateway.as_deref() else {
        return unavailable();
    };
    reply(execute_payment(&body.payment_id, &body.payer_id, gateway).await)
}

pub async fn create_recurring(
    State(state): State<AppState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Reply<AgreementLink> {
    let Json(plan) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected(&rejection),
    };
    let Some(gateway) = state.gateway.as_deref() else {
        return unavailable();
    };
    reply(create_recurring_plan(plan, gateway).await)
}

pub async fn create_fixed(
    State(state): State<AppState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Reply<AgreementLink> {
    let Json(plan) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected(&rejection),
    };
    let Some(gateway) = state.gateway.as_deref() else {
        return unavailable();
    };
    reply(create_fixed_recurring_plan(plan, gateway).await)
}

pub async fn create_installments(
    State(state): State<AppState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Reply<AgreementLink> {
    let Json(plan) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected(&rejection),
    };
    let Some(gateway) = state.gateway.as_deref() else {
        return unavailable();
    };
    reply(create_installment_plan(plan, gateway).await)
}

pub async fn confirm_agreement(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteAgreementBody>, JsonRejection>,
) -> Reply<BillingAgreement> {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected(&rejection),
    };
    let Some(gateway) = state.gateway.as_deref() else {
        return unavailable();
    };
    reply(execute_billing_agreement(&body.token, gateway).await)
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(subscription_id): Path<String>,
) -> Reply<CancellationConfirmation> {
    let Some(gateway) = state.gateway.as_deref() else {
        return unavailable();
    };
    reply(cancel_subscription(&subscription_id, gateway).await)
}

pub async fn latest_sale(
    State(state): State<AppState>,
    Path(subscription_id): Path<String>,
) -> Reply<String> {
    let Some(gateway) = state.gateway.as_deref() else {
        return unavailable();
    };
    reply(get_latest_sale_id(&subscription_id, gateway).await)
}

pub async fn refund(
    State(state): State<AppState>,
    payload: Result<Json<RefundBody>, JsonRejection>,
) -> Reply<Refund> {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => return rejected(&rejection),
    };
    let Some(gateway) = state.gateway.as_deref() else {
        return unavailable();
    };
    reply(refund_payment(&body.sale_id, body.amount, &body.currency, gateway).await)
}
