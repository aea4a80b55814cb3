//! Gateway Client Adapter
//!
//! The public operations. Each validates its input, shapes the payload,
//! makes one call (or the fixed plan -> activate -> agreement sequence) and
//! resolves to an `Envelope`. Nothing is retried and nothing is rolled back:
//! if activation or agreement creation fails, the plan created before it is
//! left on the gateway.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::builder;
use crate::config::{GatewayConfig, Mode};
use crate::envelope::Envelope;
use crate::error::{PaymentError, Result};
use crate::gateway::{PayPalClient, PaymentGateway};
use crate::model::{PlanKind, PlanRequest, PreparedPlan};
use crate::normalize::to_money_string;
use crate::payload::{BillingAgreement, Link, Payment, Refund, RefundAmount, RefundRequest};
use crate::validation::{check_money_bound, require_id, validate_currency_code, validate_plan};

const PAYMENT_FAILED: &str = "Could not make payment";
const INSTALLMENT_PLAN_FAILED: &str = "Could not create payment plan";
const ACTIVATION_FAILED: &str = "Could not activate billing plan";
const AGREEMENT_FAILED: &str = "Could not create billing agreement";
const EXECUTE_PAYMENT_FAILED: &str = "Could not execute payment";
const EXECUTE_AGREEMENT_FAILED: &str = "Could not execute billing agreement";
const CANCEL_FAILED: &str = "Could not cancel subscription";
const SALE_LOOKUP_FAILED: &str = "Could not fetch transactions";
const REFUND_FAILED: &str = "Could not refund payment";

const CANCEL_NOTE: &str = "Subscription cancelled by merchant";

/// First day of the window scanned for sales
const SALE_HISTORY_START: (i32, u32, u32) = (2015, 1, 1);

/// Created one-time payment and where to send the payer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PaymentLink {
    pub payment: Payment,
    pub link: Option<Link>,
}

/// Created billing agreement and where to send the payer
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgreementLink {
    pub billing_agreement: BillingAgreement,
    pub link: Option<Link>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationConfirmation {
    pub subscription_id: String,
    pub state: String,
}

/// Build the gateway handle threaded into every other operation
pub fn configure(mode: &str, client_id: &str, client_secret: &str) -> Envelope<PayPalClient> {
    let result = build_client(mode, client_id, client_secret);
    if let Ok(client) = &result {
        tracing::info!(mode = client.config().mode.as_str(), "Payment gateway configured");
    }
    Envelope::from_result(result, "Could not configure gateway")
}

fn build_client(mode: &str, client_id: &str, client_secret: &str) -> Result<PayPalClient> {
    let mode = Mode::parse(mode)?;
    require_id("client_id", client_id)?;
    require_id("client_secret", client_secret)?;
    PayPalClient::new(GatewayConfig::new(mode, client_id, client_secret))
}

/// One-time sale awaiting payer approval
pub async fn create_one_time_payment<G>(plan: PlanRequest, gateway: &G) -> Envelope<PaymentLink>
where
    G: PaymentGateway + ?Sized,
{
    let result: Result<PaymentLink> = async {
        validate_plan(&plan, PlanKind::OneTime)?;
        let prepared = plan.prepare(PlanKind::OneTime);
        let request = builder::payment_request(&prepared);
        tracing::debug!(total = %request.transactions[0].amount.total, "Built payment request");

        let payment = gateway.create_payment(&request).await?;
        let link = builder::approval_link(&payment.links);
        tracing::info!(payment_id = %payment.id, approval = link.is_some(), "Created one-time payment");

        Ok(PaymentLink { payment, link })
    }
    .await;

    Envelope::from_result(result, PAYMENT_FAILED)
}

/// Open-ended subscription
pub async fn create_recurring_plan<G>(plan: PlanRequest, gateway: &G) -> Envelope<AgreementLink>
where
    G: PaymentGateway + ?Sized,
{
    create_subscription(PlanKind::Recurring, plan, gateway).await
}

/// Subscription bounded to `cycles` charges
pub async fn create_fixed_recurring_plan<G>(
    plan: PlanRequest,
    gateway: &G,
) -> Envelope<AgreementLink>
where
    G: PaymentGateway + ?Sized,
{
    create_subscription(PlanKind::FixedRecurring, plan, gateway).await
}

/// Upfront charge plus the remainder over `cycles` installments
pub async fn create_installment_plan<G>(plan: PlanRequest, gateway: &G) -> Envelope<AgreementLink>
where
    G: PaymentGateway + ?Sized,
{
    create_subscription(PlanKind::Installments, plan, gateway).await
}

async fn create_subscription<G>(
    kind: PlanKind,
    plan: PlanRequest,
    gateway: &G,
) -> Envelope<AgreementLink>
where
    G: PaymentGateway + ?Sized,
{
    let prepared = match validate_plan(&plan, kind) {
        Ok(()) => plan.prepare(kind),
        Err(err) => return Envelope::failure(err.envelope_message(plan_failed(kind))),
    };

    match subscription_sequence(&prepared, gateway).await {
        Ok(created) => Envelope::success(created),
        Err((err, fallback)) => Envelope::failure(err.envelope_message(fallback)),
    }
}

const fn plan_failed(kind: PlanKind) -> &'static str {
    match kind {
        PlanKind::Installments => INSTALLMENT_PLAN_FAILED,
        _ => PAYMENT_FAILED,
    }
}

/// create plan -> activate -> create agreement, strictly in order.
///
/// The error is paired with the fallback message of the step that failed.
async fn subscription_sequence<G>(
    plan: &PreparedPlan,
    gateway: &G,
) -> std::result::Result<AgreementLink, (PaymentError, &'static str)>
where
    G: PaymentGateway + ?Sized,
{
    let kind = plan.kind.as_str();

    let plan_request =
        builder::billing_plan_request(plan).map_err(|e| (e, plan_failed(plan.kind)))?;
    let created = gateway
        .create_billing_plan(&plan_request)
        .await
        .map_err(|e| (e, plan_failed(plan.kind)))?;
    tracing::info!(plan_id = %created.id, kind, "Created billing plan");

    if let Err(err) = gateway
        .update_billing_plan(&created.id, &builder::activation_patch())
        .await
    {
        tracing::warn!(plan_id = %created.id, kind, error = %err, "Activation failed; plan left in CREATED state");
        return Err((err, ACTIVATION_FAILED));
    }

    let agreement_request = builder::billing_agreement_request(plan, &created.id, Utc::now());
    let billing_agreement = match gateway.create_billing_agreement(&agreement_request).await {
        Ok(agreement) => agreement,
        Err(err) => {
            tracing::warn!(plan_id = %created.id, kind, error = %err, "Agreement creation failed; active plan left in place");
            return Err((err, AGREEMENT_FAILED));
        }
    };

    let link = builder::approval_link(&billing_agreement.links);
    tracing::info!(
        plan_id = %created.id,
        kind,
        start_date = %agreement_request.start_date,
        approval = link.is_some(),
        "Created billing agreement"
    );

    Ok(AgreementLink { billing_agreement, link })
}

/// Capture a payment the payer approved
pub async fn execute_payment<G>(payment_id: &str, payer_id: &str, gateway: &G) -> Envelope<Payment>
where
    G: PaymentGateway + ?Sized,
{
    let result: Result<Payment> = async {
        require_id("payment_id", payment_id)?;
        require_id("payer_id", payer_id)?;
        let payment = gateway.execute_payment(payment_id, payer_id).await?;
        tracing::info!(payment_id, state = ?payment.state, "Executed payment");
        Ok(payment)
    }
    .await;

    Envelope::from_result(result, EXECUTE_PAYMENT_FAILED)
}

/// Finalize an approved billing agreement
pub async fn execute_billing_agreement<G>(token: &str, gateway: &G) -> Envelope<BillingAgreement>
where
    G: PaymentGateway + ?Sized,
{
    let result: Result<BillingAgreement> = async {
        require_id("token", token)?;
        let agreement = gateway.execute_billing_agreement(token).await?;
        tracing::info!(agreement_id = ?agreement.id, state = ?agreement.state, "Executed billing agreement");
        Ok(agreement)
    }
    .await;

    Envelope::from_result(result, EXECUTE_AGREEMENT_FAILED)
}

pub async fn cancel_subscription<G>(
    subscription_id: &str,
    gateway: &G,
) -> Envelope<CancellationConfirmation>
where
    G: PaymentGateway + ?Sized,
{
    let result: Result<CancellationConfirmation> = async {
        require_id("subscription_id", subscription_id)?;
        gateway.cancel_billing_agreement(subscription_id, CANCEL_NOTE).await?;
        tracing::info!(subscription_id, "Cancelled subscription");
        Ok(CancellationConfirmation {
            subscription_id: subscription_id.to_string(),
            state: "Cancelled".into(),
        })
    }
    .await;

    Envelope::from_result(result, CANCEL_FAILED)
}

/// Most recent completed sale on a subscription
pub async fn get_latest_sale_id<G>(subscription_id: &str, gateway: &G) -> Envelope<String>
where
    G: PaymentGateway + ?Sized,
{
    let result: Result<String> = async {
        require_id("subscription_id", subscription_id)?;
        let (start, end) = sale_window();
        let transactions = gateway
            .agreement_transactions(subscription_id, start, end)
            .await?;

        let latest = transactions
            .into_iter()
            .filter(|t| t.status.as_deref() == Some("Completed"))
            .max_by(|a, b| a.time_stamp.cmp(&b.time_stamp))
            .ok_or_else(|| PaymentError::Gateway {
                status: 404,
                details: Some("No completed sale found for subscription".into()),
            })?;

        tracing::info!(subscription_id, sale_id = %latest.transaction_id, "Found latest sale");
        Ok(latest.transaction_id)
    }
    .await;

    Envelope::from_result(result, SALE_LOOKUP_FAILED)
}

/// Fixed window: the history start through tomorrow (UTC)
fn sale_window() -> (NaiveDate, NaiveDate) {
    let (y, m, d) = SALE_HISTORY_START;
    let start = NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default();
    let end = (Utc::now() + Duration::days(1)).date_naive();
    (start, end)
}

/// Refund `amount` of a sale
pub async fn refund_payment<G>(
    sale_id: &str,
    amount: Decimal,
    currency: &str,
    gateway: &G,
) -> Envelope<Refund>
where
    G: PaymentGateway + ?Sized,
{
    let result: Result<Refund> = async {
        require_id("sale_id", sale_id)?;
        if amount <= Decimal::ZERO {
            return Err(PaymentError::Validation("amount must be greater than 0".into()));
        }
        check_money_bound("amount", amount)?;
        validate_currency_code(currency)
            .map_err(|_| PaymentError::Validation("currency: must be a 3-letter ISO 4217 code".into()))?;

        let request = RefundRequest {
            amount: RefundAmount {
                total: to_money_string(amount),
                currency: currency.to_uppercase(),
            },
        };
        let refund = gateway.refund_sale(sale_id, &request).await?;
        tracing::info!(sale_id, refund_id = %refund.id, total = %request.amount.total, "Refunded sale");
        Ok(refund)
    }
    .await;

    Envelope::from_result(result, REFUND_FAILED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayStep, MockGateway};
    use crate::model::{DiscountType, Frequency};
    use crate::payload::AgreementTransaction;
    use rust_decimal_macros::dec;

    fn subscription_request() -> PlanRequest {
        let mut req = PlanRequest::new(dec!(100), "usd", "https://shop.test/return");
        req.frequency = Some(Frequency::Month);
        req.cycles = 4;
        req.plan_name = Some("Pro".into());
        req
    }

    #[test]
    fn test_configure_rejects_unknown_mode() {
        let env = configure("staging", "id", "secret");
        assert!(env.error);
        assert!(env.message.contains("mode"));

        let env = configure("live", "id", "");
        assert_eq!(env.message, "client_secret is required");
    }

    #[test]
    fn test_configure_returns_handle() {
        let env = configure("sandbox", "id", "secret");
        assert!(env.is_success());
        assert_eq!(env.response.unwrap().config().mode, Mode::Sandbox);
    }

    #[tokio::test]
    async fn test_one_time_payment_returns_approval_link() {
        let gateway = MockGateway::new();
        let mut req = PlanRequest::new(dec!(100), "usd", "https://shop.test/return");
        req.discount_type = DiscountType::Percentage;
        req.discount = dec!(10);

        let env = create_one_time_payment(req, &gateway).await;
        let created = env.response.expect("payment");
        assert_eq!(created.link.unwrap().rel, "approval_url");

        let calls = gateway.calls().await;
        assert_eq!(calls[0].body["transactions"][0]["amount"]["total"], "90.00");
    }

    #[tokio::test]
    async fn test_oversized_amount_returns_envelope() {
        let gateway = MockGateway::new();
        let mut req = PlanRequest::new(Decimal::MAX, "usd", "https://shop.test/return");
        req.tax = dec!(100);

        let env = create_one_time_payment(req, &gateway).await;
        assert!(env.error);
        assert!(env.response.is_none());
        assert_eq!(env.message, "amount must not exceed 9999999999.99");
        assert!(gateway.calls().await.is_empty());

        let env = refund_payment("SALE-1", Decimal::MAX, "usd", &gateway).await;
        assert!(env.error);
    }

    #[tokio::test]
    async fn test_recurring_runs_full_sequence() {
        let gateway = MockGateway::new();
        let mut req = subscription_request();
        req.trial_period_days = 7;

        let env = create_recurring_plan(req, &gateway).await;
        assert!(env.is_success(), "{}", env.message);
        assert!(env.response.unwrap().link.is_some());

        let calls = gateway.calls().await;
        let steps: Vec<_> = calls.iter().map(|c| c.step).collect();
        assert_eq!(
            steps,
            vec![
                GatewayStep::CreateBillingPlan,
                GatewayStep::UpdateBillingPlan,
                GatewayStep::CreateBillingAgreement,
            ]
        );
        assert_eq!(calls[0].body["payment_definitions"][0]["type"], "TRIAL");
        assert_eq!(calls[1].target.as_deref(), Some("P-MOCK-PLAN"));
        assert_eq!(calls[2].body["plan"]["id"], "P-MOCK-PLAN");
    }

    #[tokio::test]
    async fn test_plan_creation_failure_stops_sequence() {
        let gateway = MockGateway::new().failing_at(GatewayStep::CreateBillingPlan);

        let env = create_fixed_recurring_plan(subscription_request(), &gateway).await;
        assert!(env.error);
        assert!(env.response.is_none());
        assert_eq!(env.message, PAYMENT_FAILED);
        assert_eq!(gateway.steps().await, vec![GatewayStep::CreateBillingPlan]);
    }

    #[tokio::test]
    async fn test_agreement_failure_leaves_plan_without_cleanup() {
        let gateway = MockGateway::new()
            .failing_at(GatewayStep::CreateBillingAgreement)
            .with_failure_details("payer: Invalid payer");

        let env = create_recurring_plan(subscription_request(), &gateway).await;
        assert!(env.error);
        assert_eq!(env.message, "payer: Invalid payer");
        assert_eq!(
            gateway.steps().await,
            vec![
                GatewayStep::CreateBillingPlan,
                GatewayStep::UpdateBillingPlan,
                GatewayStep::CreateBillingAgreement,
            ]
        );
    }

    #[tokio::test]
    async fn test_activation_failure_skips_agreement() {
        let gateway = MockGateway::new().failing_at(GatewayStep::UpdateBillingPlan);

        let env = create_recurring_plan(subscription_request(), &gateway).await;
        assert_eq!(env.message, ACTIVATION_FAILED);
        assert!(!gateway.steps().await.contains(&GatewayStep::CreateBillingAgreement));
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_calls() {
        let gateway = MockGateway::new();
        let mut req = subscription_request();
        req.frequency = None;

        let env = create_recurring_plan(req, &gateway).await;
        assert!(env.error);
        assert_eq!(env.message, "frequency is required");
        assert!(gateway.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_installments_send_setup_fee_and_per_cycle_amount() {
        let gateway = MockGateway::new();
        let mut req = subscription_request();
        req.amount = dec!(120);
        req.initial_amount = Some(dec!(20));
        req.discount_type = DiscountType::Flat;
        req.discount = dec!(12);

        let env = create_installment_plan(req, &gateway).await;
        assert!(env.is_success(), "{}", env.message);

        let calls = gateway.calls().await;
        let plan = &calls[0].body;
        // 10% off: upfront 18.00, remainder 90 over 4 cycles
        assert_eq!(plan["merchant_preferences"]["setup_fee"]["value"], "18.00");
        assert_eq!(plan["payment_definitions"][0]["amount"]["value"], "22.50");
        assert_eq!(plan["payment_definitions"][0]["cycles"], "4");
    }

    #[tokio::test]
    async fn test_latest_sale_picks_most_recent_completed() {
        let tx = |id: &str, status: &str, ts: &str| AgreementTransaction {
            transaction_id: id.into(),
            status: Some(status.into()),
            transaction_type: Some("Recurring Payment".into()),
            time_stamp: Some(ts.into()),
        };
        let gateway = MockGateway::new().with_transactions(vec![
            tx("I-AGREEMENT", "Created", "2024-01-01T00:00:00Z"),
            tx("SALE-1", "Completed", "2024-02-01T00:00:00Z"),
            tx("SALE-3", "Refunded", "2024-04-01T00:00:00Z"),
            tx("SALE-2", "Completed", "2024-03-01T00:00:00Z"),
        ]);

        let env = get_latest_sale_id("I-AGREEMENT", &gateway).await;
        assert_eq!(env.response.as_deref(), Some("SALE-2"));

        let calls = gateway.calls().await;
        assert_eq!(calls[0].body["start_date"], "2015-01-01");
    }

    #[tokio::test]
    async fn test_latest_sale_without_sales_is_error() {
        let env = get_latest_sale_id("I-1", &MockGateway::new()).await;
        assert!(env.error);
        assert_eq!(env.message, "No completed sale found for subscription");
    }

    #[tokio::test]
    async fn test_refund_uppercases_currency() {
        let gateway = MockGateway::new();
        let env = refund_payment("SALE-1", dec!(12.5), "eur", &gateway).await;
        assert!(env.is_success());

        let calls = gateway.calls().await;
        assert_eq!(calls[0].target.as_deref(), Some("SALE-1"));
        assert_eq!(calls[0].body["amount"]["currency"], "EUR");
        assert_eq!(calls[0].body["amount"]["total"], "12.50");
    }

    #[tokio::test]
    async fn test_cancel_and_execute() {
        let gateway = MockGateway::new();

        let env = cancel_subscription("I-1", &gateway).await;
        assert_eq!(env.response.unwrap().state, "Cancelled");

        let env = execute_billing_agreement("EC-1", &gateway).await;
        assert_eq!(env.response.unwrap().id.as_deref(), Some("I-MOCK-AGREEMENT"));

        let env = execute_payment("PAY-1", "", &gateway).await;
        assert_eq!(env.message, "payer_id is required");
    }

    #[tokio::test]
    async fn test_works_through_trait_object() {
        let gateway: Box<dyn PaymentGateway> = Box::new(MockGateway::new());
        let env = cancel_subscription("I-1", gateway.as_ref()).await;
        assert!(env.is_success());
    }
}
