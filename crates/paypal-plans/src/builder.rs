//! Plan Request Builder
//!
//! Maps a `PreparedPlan` onto gateway payloads. No I/O.
//!
//! | Plan kind       | Plan type  | Regular cycles | Setup fee        | Start        |
//! |-----------------|------------|----------------|------------------|--------------|
//! | one-time        | -          | -              | -                | -            |
//! | recurring       | `INFINITE` | `"0"`          | `0.00`           | now + 60s    |
//! | fixed recurring | `FIXED`    | `cycles`       | `0.00`           | now + 60s    |
//! | installments    | `FIXED`    | `cycles`       | `initial_amount` | now + 1 day  |

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde_json::json;

use crate::error::{PaymentError, Result};
use crate::model::{PlanKind, PreparedPlan};
use crate::normalize::to_money_string;
use crate::payload::{
    APPROVAL_REL, AmountDetails, BillingAgreementRequest, BillingPlanRequest, Item, ItemList,
    Link, MerchantPreferences, Money, Payer, PatchOperation, PaymentDefinition, PaymentRequest,
    PlanReference, RedirectUrls, Transaction, TransactionAmount,
};

const ZERO_MONEY: &str = "0.00";

/// One-time sale payload
pub fn payment_request(plan: &PreparedPlan) -> PaymentRequest {
    let total = to_money_string(plan.amounts.amount);

    PaymentRequest {
        intent: "sale".into(),
        payer: Payer::default(),
        redirect_urls: RedirectUrls {
            return_url: plan.return_url.clone(),
            cancel_url: plan.cancel_url.clone(),
        },
        transactions: vec![Transaction {
            item_list: ItemList {
                items: vec![Item {
                    name: "item".into(),
                    sku: "item".into(),
                    price: total.clone(),
                    currency: plan.currency.clone(),
                    quantity: 1,
                }],
            },
            amount: TransactionAmount {
                currency: plan.currency.clone(),
                total: total.clone(),
                details: AmountDetails {
                    subtotal: total,
                    tax: ZERO_MONEY.into(),
                    shipping: ZERO_MONEY.into(),
                },
            },
            description: plan.description.clone(),
        }],
    }
}

/// Billing plan payload for the subscription kinds.
///
/// Fails when the plan carries no billing frequency.
pub fn billing_plan_request(plan: &PreparedPlan) -> Result<BillingPlanRequest> {
    let installments = plan.kind == PlanKind::Installments;
    let has_trial = plan.trial_period_days > 0;
    let billing = plan
        .billing
        .clone()
        .ok_or_else(|| PaymentError::Validation("frequency is required".into()))?;

    let mut phases = Vec::with_capacity(2);
    if has_trial {
        let name = if installments {
            format!("{} Trial Period", plan.plan_name)
        } else {
            "Trial Period".to_string()
        };
        phases.push(trial_phase(name, plan.trial_period_days, &plan.currency));
    }

    let regular_name = match (installments, has_trial) {
        (true, true) => format!("{} Initial Charge", plan.plan_name),
        (true, false) => format!("{} Regular Payments", plan.plan_name),
        (false, _) => "Regular Payments".to_string(),
    };
    let regular_cycles = if plan.kind == PlanKind::Recurring { 0 } else { plan.cycles };
    phases.push(PaymentDefinition {
        name: regular_name,
        phase_type: "REGULAR".into(),
        frequency: billing.unit,
        frequency_interval: billing.interval.to_string(),
        cycles: regular_cycles.to_string(),
        amount: money(&plan.currency, plan.amounts.amount),
    });

    let setup_fee = if installments {
        plan.amounts.initial_amount.unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    Ok(BillingPlanRequest {
        name: plan.plan_name.clone(),
        description: plan
            .description
            .clone()
            .unwrap_or_else(|| default_plan_description(plan.kind, has_trial).to_string()),
        plan_type: if plan.kind == PlanKind::Recurring { "INFINITE" } else { "FIXED" }.into(),
        payment_definitions: phases,
        merchant_preferences: MerchantPreferences {
            setup_fee: money(&plan.currency, setup_fee),
            cancel_url: plan.cancel_url.clone(),
            return_url: plan.return_url.clone(),
            max_fail_attempts: "1".into(),
            auto_bill_amount: "YES".into(),
            initial_fail_amount_action: "CONTINUE".into(),
        },
    })
}

/// Free trial phase: daily cycles at zero charge
fn trial_phase(name: String, days: u32, currency: &str) -> PaymentDefinition {
    PaymentDefinition {
        name,
        phase_type: "TRIAL".into(),
        frequency: "DAY".into(),
        frequency_interval: "1".into(),
        cycles: days.to_string(),
        amount: Money {
            currency: currency.to_string(),
            value: ZERO_MONEY.into(),
        },
    }
}

fn default_plan_description(kind: PlanKind, has_trial: bool) -> &'static str {
    match (kind, has_trial) {
        (PlanKind::Installments, true) => "Subscription plan with trial, initial, and recurring payments",
        (PlanKind::Installments, false) => "Plan with initial payment and recurring payments",
        (PlanKind::FixedRecurring, _) => "Fixed recurring subscription plan",
        _ => "Recurring subscription plan",
    }
}

/// Patch that moves a created plan to `ACTIVE`
pub fn activation_patch() -> Vec<PatchOperation> {
    vec![PatchOperation {
        op: "replace".into(),
        path: "/".into(),
        value: json!({ "state": "ACTIVE" }),
    }]
}

/// Agreement payload against an activated plan
pub fn billing_agreement_request(
    plan: &PreparedPlan,
    plan_id: &str,
    now: DateTime<Utc>,
) -> BillingAgreementRequest {
    let has_trial = plan.trial_period_days > 0;
    let (name, description) = if plan.kind == PlanKind::Installments {
        (
            format!("{} Agreement", plan.plan_name),
            if has_trial {
                "Agreement for trial and recurring payments"
            } else {
                "Agreement with initial payment and recurring payments"
            },
        )
    } else {
        ("Recurring Agreement".to_string(), "Recurring agreement")
    };

    BillingAgreementRequest {
        name,
        description: description.into(),
        start_date: start_date(plan, now).to_rfc3339_opts(SecondsFormat::Millis, true),
        plan: PlanReference { id: plan_id.to_string() },
        payer: Payer::default(),
    }
}

/// Explicit start date, or a kind-specific offset from `now`
pub fn start_date(plan: &PreparedPlan, now: DateTime<Utc>) -> DateTime<Utc> {
    plan.start_date.unwrap_or_else(|| match plan.kind {
        PlanKind::Installments => now + Duration::days(1),
        _ => now + Duration::seconds(60),
    })
}

/// The link the payer must be redirected to. The last matching link wins.
pub fn approval_link(links: &[Link]) -> Option<Link> {
    links.iter().rev().find(|l| l.rel == APPROVAL_REL).cloned()
}

fn money(currency: &str, value: Decimal) -> Money {
    Money {
        currency: currency.to_string(),
        value: to_money_string(value),
    }
}
