//! PayPal REST Client
//!
//! Implementation of `PaymentGateway` over the gateway's published v1 REST
//! API. Each call exchanges the client credentials for a bearer token, then
//! issues the request. The client holds no mutable state.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Method, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::PaymentGateway;
use crate::config::GatewayConfig;
use crate::error::{PaymentError, Result};
use crate::payload::{
    AgreementTransaction, AgreementTransactions, BillingAgreement, BillingAgreementRequest,
    BillingPlan, BillingPlanRequest, CancelAgreementRequest, ExecutePaymentRequest,
    GatewayErrorBody, PatchOperation, Payment, PaymentRequest, Refund, RefundRequest,
};

const TOKEN_PATH: &str = "/v1/oauth2/token";
const PAYMENTS_PATH: &str = "/v1/payments/payment";
const PLANS_PATH: &str = "/v1/payments/billing-plans";
const AGREEMENTS_PATH: &str = "/v1/payments/billing-agreements";
const SALES_PATH: &str = "/v1/payments/sale";

#[derive(Debug, Deserialize)]
struct AccessToken {
    access_token: String,
}

/// Configured gateway handle
#[derive(Clone, Debug)]
pub struct PayPalClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl PayPalClient {
    /// Create a client from configuration
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| PaymentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(GatewayConfig::from_env()?)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn access_token(&self) -> Result<String> {
        let response = self
            .http
            .post(self.url(TOKEN_PATH))
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let token: AccessToken = read_json(check(response).await?).await?;
        Ok(token.access_token)
    }

    /// Request builder carrying a fresh bearer token
    async fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.access_token().await?;
        tracing::debug!(%method, path, mode = self.config.mode.as_str(), "PayPal request");
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }
}

/// Turn a non-2xx response into `PaymentError::Gateway`
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let details = serde_json::from_str::<GatewayErrorBody>(&body)
        .ok()
        .and_then(|b| b.describe());

    tracing::warn!(status = status.as_u16(), details = ?details, "PayPal rejected request");

    Err(PaymentError::Gateway {
        status: status.as_u16(),
        details,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| PaymentError::UnexpectedResponse(e.to_string()))
}

async fn send(request: RequestBuilder) -> Result<Response> {
    check(request.send().await?).await
}

#[async_trait]
impl PaymentGateway for PayPalClient {
    async fn create_payment(&self, request: &PaymentRequest) -> Result<Payment> {
        let builder = self.authorized(Method::POST, PAYMENTS_PATH).await?;
        read_json(send(builder.json(request)).await?).await
    }

    async fn execute_payment(&self, payment_id: &str, payer_id: &str) -> Result<Payment> {
        let path = format!("{PAYMENTS_PATH}/{payment_id}/execute");
        let builder = self.authorized(Method::POST, &path).await?;
        read_json(send(builder.json(&ExecutePaymentRequest { payer_id })).await?).await
    }

    async fn create_billing_plan(&self, request: &BillingPlanRequest) -> Result<BillingPlan> {
        let builder = self.authorized(Method::POST, PLANS_PATH).await?;
        read_json(send(builder.json(request)).await?).await
    }

    async fn update_billing_plan(&self, plan_id: &str, patch: &[PatchOperation]) -> Result<()> {
        let path = format!("{PLANS_PATH}/{plan_id}");
        let builder = self.authorized(Method::PATCH, &path).await?;
        send(builder.json(patch)).await?;
        Ok(())
    }

    async fn create_billing_agreement(
        &self,
        request: &BillingAgreementRequest,
    ) -> Result<BillingAgreement> {
        let builder = self.authorized(Method::POST, AGREEMENTS_PATH).await?;
        read_json(send(builder.json(request)).await?).await
    }

    async fn execute_billing_agreement(&self, token: &str) -> Result<BillingAgreement> {
        let path = format!("{AGREEMENTS_PATH}/{token}/agreement-execute");
        let builder = self.authorized(Method::POST, &path).await?;
        read_json(send(builder.json(&serde_json::json!({}))).await?).await
    }

    async fn cancel_billing_agreement(&self, agreement_id: &str, note: &str) -> Result<()> {
        let path = format!("{AGREEMENTS_PATH}/{agreement_id}/cancel");
        let builder = self.authorized(Method::POST, &path).await?;
        send(builder.json(&CancelAgreementRequest { note })).await?;
        Ok(())
    }

    async fn agreement_transactions(
        &self,
        agreement_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<AgreementTransaction>> {
        let path = format!("{AGREEMENTS_PATH}/{agreement_id}/transactions");
        let builder = self.authorized(Method::GET, &path).await?.query(&[
            ("start_date", start.to_string()),
            ("end_date", end.to_string()),
        ]);
        let list: AgreementTransactions = read_json(send(builder).await?).await?;
        Ok(list.agreement_transaction_list)
    }

    async fn refund_sale(&self, sale_id: &str, request: &RefundRequest) -> Result<Refund> {
        let path = format!("{SALES_PATH}/{sale_id}/refund");
        let builder = self.authorized(Method::POST, &path).await?;
        read_json(send(builder.json(request)).await?).await
    }

    fn name(&self) -> &str {
        "PayPal"
    }
}
