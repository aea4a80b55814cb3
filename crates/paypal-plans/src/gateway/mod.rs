//! Payment Gateway Integration
//!
//! The gateway is an external collaborator. Everything above this seam is
//! pure data shaping; everything below it is one HTTP round trip per call.

mod mock;
mod rest;

pub use mock::{GatewayStep, MockGateway, RecordedCall};
pub use rest::PayPalClient;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::payload::{
    AgreementTransaction, BillingAgreement, BillingAgreementRequest, BillingPlan,
    BillingPlanRequest, PatchOperation, Payment, PaymentRequest, Refund, RefundRequest,
};

/// Payment gateway client trait (Strategy pattern)
///
/// One method per gateway endpoint. Implementations never retry.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a one-time payment awaiting payer approval
    async fn create_payment(&self, request: &PaymentRequest) -> Result<Payment>;

    /// Capture an approved payment
    async fn execute_payment(&self, payment_id: &str, payer_id: &str) -> Result<Payment>;

    async fn create_billing_plan(&self, request: &BillingPlanRequest) -> Result<BillingPlan>;

    /// Apply a JSON-patch to a billing plan
    async fn update_billing_plan(&self, plan_id: &str, patch: &[PatchOperation]) -> Result<()>;

    async fn create_billing_agreement(
        &self,
        request: &BillingAgreementRequest,
    ) -> Result<BillingAgreement>;

    /// Finalize an agreement the payer approved
    async fn execute_billing_agreement(&self, token: &str) -> Result<BillingAgreement>;

    async fn cancel_billing_agreement(&self, agreement_id: &str, note: &str) -> Result<()>;

    /// Transactions recorded against an agreement between two dates
    async fn agreement_transactions(
        &self,
        agreement_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AgreementTransaction>>;

    async fn refund_sale(&self, sale_id: &str, request: &RefundRequest) -> Result<Refund>;

    /// Gateway name
    fn name(&self) -> &str;
}
