//! Mock Gateway
//!
//! For testing and demo purposes. Returns canned records, records every call
//! with its JSON body, and fails on request at any chosen step.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

use super::PaymentGateway;
use crate::error::{PaymentError, Result};
use crate::payload::{
    AgreementTransaction, BillingAgreement, BillingAgreementRequest, BillingPlan,
    BillingPlanRequest, Link, PatchOperation, Payment, PaymentRequest, Refund, RefundRequest,
};

/// Gateway endpoints, as seen by the mock
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GatewayStep {
    CreatePayment,
    ExecutePayment,
    CreateBillingPlan,
    UpdateBillingPlan,
    CreateBillingAgreement,
    ExecuteBillingAgreement,
    CancelBillingAgreement,
    AgreementTransactions,
    RefundSale,
}

/// A recorded gateway call
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub step: GatewayStep,
    /// Path identifier the call targeted, if any
    pub target: Option<String>,
    pub body: Value,
}

/// Mock gateway with scripted failures
#[derive(Default)]
pub struct MockGateway {
    failures: HashSet<GatewayStep>,
    failure_details: Option<String>,
    transactions: Vec<AgreementTransaction>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject `step` with a gateway error
    #[must_use]
    pub fn failing_at(mut self, step: GatewayStep) -> Self {
        self.failures.insert(step);
        self
    }

    /// Detail string attached to scripted failures
    #[must_use]
    pub fn with_failure_details(mut self, details: impl Into<String>) -> Self {
        self.failure_details = Some(details.into());
        self
    }

    /// Transactions returned for every agreement
    #[must_use]
    pub fn with_transactions(mut self, transactions: Vec<AgreementTransaction>) -> Self {
        self.transactions = transactions;
        self
    }

    /// Calls made so far, in order
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    /// Steps called so far, in order
    pub async fn steps(&self) -> Vec<GatewayStep> {
        self.calls.lock().await.iter().map(|c| c.step).collect()
    }

    async fn record(
        &self,
        step: GatewayStep,
        target: Option<&str>,
        body: &(impl Serialize + Sync),
    ) -> Result<()> {
        self.calls.lock().await.push(RecordedCall {
            step,
            target: target.map(str::to_string),
            body: serde_json::to_value(body)?,
        });

        if self.failures.contains(&step) {
            return Err(PaymentError::Gateway {
                status: 400,
                details: self.failure_details.clone(),
            });
        }
        Ok(())
    }
}

fn approval_links(token: &str) -> Vec<Link> {
    vec![
        Link {
            href: format!("https://www.sandbox.paypal.com/checkoutnow?token={token}"),
            rel: "approval_url".into(),
            method: Some("REDIRECT".into()),
        },
        Link {
            href: format!("https://api-m.sandbox.paypal.com/v1/payments/{token}/execute"),
            rel: "execute".into(),
            method: Some("POST".into()),
        },
    ]
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<Payment> {
        self.record(GatewayStep::CreatePayment, None, request).await?;
        Ok(Payment {
            id: "PAYID-MOCK-1".into(),
            state: Some("created".into()),
            links: approval_links("EC-PAYMENT"),
            details: Map::new(),
        })
    }

    async fn execute_payment(&self, payment_id: &str, payer_id: &str) -> Result<Payment> {
        self.record(GatewayStep::ExecutePayment, Some(payment_id), &json!({ "payer_id": payer_id }))
            .await?;
        Ok(Payment {
            id: payment_id.to_string(),
            state: Some("approved".into()),
            links: Vec::new(),
            details: Map::new(),
        })
    }

    async fn create_billing_plan(&self, request: &BillingPlanRequest) -> Result<BillingPlan> {
        self.record(GatewayStep::CreateBillingPlan, None, request).await?;
        Ok(BillingPlan {
            id: "P-MOCK-PLAN".into(),
            state: Some("CREATED".into()),
            details: Map::new(),
        })
    }

    async fn update_billing_plan(&self, plan_id: &str, patch: &[PatchOperation]) -> Result<()> {
        self.record(GatewayStep::UpdateBillingPlan, Some(plan_id), &patch).await
    }

    async fn create_billing_agreement(
        &self,
        request: &BillingAgreementRequest,
    ) -> Result<BillingAgreement> {
        self.record(GatewayStep::CreateBillingAgreement, Some(&request.plan.id), request)
            .await?;
        Ok(BillingAgreement {
            id: None,
            state: None,
            links: approval_links("EC-AGREEMENT"),
            details: Map::new(),
        })
    }

    async fn execute_billing_agreement(&self, token: &str) -> Result<BillingAgreement> {
        self.record(GatewayStep::ExecuteBillingAgreement, Some(token), &json!({})).await?;
        Ok(BillingAgreement {
            id: Some("I-MOCK-AGREEMENT".into()),
            state: Some("Active".into()),
            links: Vec::new(),
            details: Map::new(),
        })
    }

    async fn cancel_billing_agreement(&self, agreement_id: &str, note: &str) -> Result<()> {
        self.record(GatewayStep::CancelBillingAgreement, Some(agreement_id), &json!({ "note": note }))
            .await
    }

    async fn agreement_transactions(
        &self,
        agreement_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AgreementTransaction>> {
        self.record(
            GatewayStep::AgreementTransactions,
            Some(agreement_id),
            &json!({ "start_date": start.to_string(), "end_date": end.to_string() }),
        )
        .await?;
        Ok(self.transactions.clone())
    }

    async fn refund_sale(&self, sale_id: &str, request: &RefundRequest) -> Result<Refund> {
        self.record(GatewayStep::RefundSale, Some(sale_id), request).await?;
        Ok(Refund {
            id: "REFUND-MOCK-1".into(),
            state: Some("completed".into()),
            details: Map::new(),
        })
    }

    fn name(&self) -> &str {
        "MockGateway"
    }
}
