//! Gateway Wire Types
//!
//! Request bodies sent to the payment gateway and the records it returns.
//! Money is carried as two-decimal strings, as the gateway expects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PAYMENT_METHOD: &str = "paypal";
pub const APPROVAL_REL: &str = "approval_url";

/// HATEOAS link attached to gateway records
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub currency: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub payment_method: String,
}

impl Default for Payer {
    fn default() -> Self {
        Self { payment_method: PAYMENT_METHOD.into() }
    }
}

// ============================================================================
// One-time payment
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentRequest {
    pub intent: String,
    pub payer: Payer,
    pub redirect_urls: RedirectUrls,
    pub transactions: Vec<Transaction>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RedirectUrls {
    pub return_url: String,
    pub cancel_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Transaction {
    pub item_list: ItemList,
    pub amount: TransactionAmount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ItemList {
    pub items: Vec<Item>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Item {
    pub name: String,
    pub sku: String,
    pub price: String,
    pub currency: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionAmount {
    pub currency: String,
    pub total: String,
    pub details: AmountDetails,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AmountDetails {
    pub subtotal: String,
    pub tax: String,
    pub shipping: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExecutePaymentRequest<'a> {
    pub payer_id: &'a str,
}

// ============================================================================
// Billing plans & agreements
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BillingPlanRequest {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub plan_type: String,
    pub payment_definitions: Vec<PaymentDefinition>,
    pub merchant_preferences: MerchantPreferences,
}

/// A billing plan phase
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub phase_type: String,
    pub frequency: String,
    pub frequency_interval: String,
    pub cycles: String,
    pub amount: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MerchantPreferences {
    pub setup_fee: Money,
    pub cancel_url: String,
    pub return_url: String,
    pub max_fail_attempts: String,
    pub auto_bill_amount: String,
    pub initial_fail_amount_action: String,
}

/// JSON-patch operation used to change plan state
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BillingAgreementRequest {
    pub name: String,
    pub description: String,
    pub start_date: String,
    pub plan: PlanReference,
    pub payer: Payer,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanReference {
    pub id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CancelAgreementRequest<'a> {
    pub note: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RefundRequest {
    pub amount: RefundAmount,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RefundAmount {
    pub total: String,
    pub currency: String,
}

// ============================================================================
// Records returned by the gateway
// ============================================================================

/// Created or executed payment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    /// Remaining fields, passed through untouched
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BillingPlan {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Billing agreement. A freshly created agreement has no id yet, only the
/// approval token inside its links.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BillingAgreement {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgreementTransactions {
    #[serde(default)]
    pub agreement_transaction_list: Vec<AgreementTransaction>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgreementTransaction {
    pub transaction_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub transaction_type: Option<String>,
    /// RFC 3339 timestamp
    #[serde(default)]
    pub time_stamp: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Error body returned with non-2xx responses
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GatewayErrorBody {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Vec<GatewayErrorDetail>,
    /// OAuth endpoint errors use this instead of `message`
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GatewayErrorDetail {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub issue: Option<String>,
}

impl GatewayErrorBody {
    /// `field: issue` pairs joined with `; `, falling back to the top-level
    /// message
    pub fn describe(&self) -> Option<String> {
        let issues: Vec<String> = self
            .details
            .iter()
            .filter_map(|d| match (&d.field, &d.issue) {
                (Some(field), Some(issue)) => Some(format!("{field}: {issue}")),
                (None, Some(issue)) => Some(issue.clone()),
                _ => None,
            })
            .collect();

        if issues.is_empty() {
            self.message
                .clone()
                .or_else(|| self.error_description.clone())
                .or_else(|| self.name.clone())
        } else {
            Some(issues.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_prefers_details() {
        let body: GatewayErrorBody = serde_json::from_value(serde_json::json!({
            "name": "VALIDATION_ERROR",
            "message": "Invalid request",
            "details": [
                {"field": "transactions[0].amount.currency", "issue": "Currency is not supported"},
                {"issue": "Plan name too long"}
            ]
        }))
        .unwrap();
        assert_eq!(
            body.describe().as_deref(),
            Some("transactions[0].amount.currency: Currency is not supported; Plan name too long")
        );
    }

    #[test]
    fn test_error_body_falls_back_to_message() {
        let body: GatewayErrorBody =
            serde_json::from_value(serde_json::json!({"name": "INTERNAL", "message": "Boom"})).unwrap();
        assert_eq!(body.describe().as_deref(), Some("Boom"));
        assert_eq!(GatewayErrorBody::default().describe(), None);

        let oauth: GatewayErrorBody = serde_json::from_value(serde_json::json!({
            "error": "invalid_client",
            "error_description": "Client Authentication failed"
        }))
        .unwrap();
        assert_eq!(oauth.describe().as_deref(), Some("Client Authentication failed"));
    }

    #[test]
    fn test_payment_keeps_unknown_fields() {
        let payment: Payment = serde_json::from_value(serde_json::json!({
            "id": "PAY-1",
            "state": "created",
            "intent": "sale",
            "links": [{"href": "https://x/approve", "rel": "approval_url", "method": "REDIRECT"}]
        }))
        .unwrap();
        assert_eq!(payment.links.len(), 1);
        assert_eq!(payment.details.get("intent"), Some(&serde_json::json!("sale")));
    }
}
