//! Domain Models
//!
//! Caller-facing plan input and the prepared form handed to the builder.
//! Uses `rust_decimal` for all monetary values - never use f64 for money!

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::normalize::{self, NormalizedAmounts};
use crate::validation::{validate_currency_code, validate_non_negative};

/// Plan kinds supported by the gateway adapter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// Single transaction, no billing plan
    OneTime,
    /// Open-ended subscription
    Recurring,
    /// Subscription with a bounded number of cycles
    FixedRecurring,
    /// Upfront charge plus the remainder amortized over the cycles
    Installments,
}

impl PlanKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneTime => "one_time",
            Self::Recurring => "recurring",
            Self::FixedRecurring => "fixed_recurring",
            Self::Installments => "installments",
        }
    }

    /// Whether the regular amount is divided by the cycle count
    pub const fn amortizes(self) -> bool {
        matches!(self, Self::FixedRecurring | Self::Installments)
    }
}

/// How `discount` is interpreted
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    #[default]
    #[serde(other)]
    Flat,
}

/// Billing frequency as supplied by the caller
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Day,
    Week,
    Month,
    Year,
    /// Every `custom_days` days
    Custom,
}

/// Frequency resolved to the gateway's unit and interval
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BillingFrequency {
    /// Upper-cased unit: `DAY`, `WEEK`, `MONTH` or `YEAR`
    pub unit: String,
    pub interval: u32,
}

impl Frequency {
    /// `Custom` becomes the smallest unit (`DAY`) with `custom_days` as the
    /// interval; everything else keeps its unit with an interval of 1.
    pub fn resolve(self, custom_days: Option<u32>) -> BillingFrequency {
        let (unit, interval) = match self {
            Self::Custom => ("day", custom_days.unwrap_or(1)),
            Self::Day => ("day", 1),
            Self::Week => ("week", 1),
            Self::Month => ("month", 1),
            Self::Year => ("year", 1),
        };
        BillingFrequency {
            unit: unit.to_uppercase(),
            interval,
        }
    }
}

/// Raw caller input for any plan kind
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct PlanRequest {
    /// Total (installments) or per-cycle / one-off charge in major units
    #[validate(custom(function = "validate_non_negative"))]
    pub amount: Decimal,

    /// Upfront charge, installments only
    #[serde(default)]
    #[validate(custom(function = "validate_non_negative"))]
    pub initial_amount: Option<Decimal>,

    /// ISO 4217 code, any case
    #[validate(custom(function = "validate_currency_code"))]
    pub currency: String,

    #[serde(default)]
    pub discount_type: DiscountType,

    #[serde(default)]
    #[validate(custom(function = "validate_non_negative"))]
    pub discount: Decimal,

    /// Tax percentage
    #[serde(default)]
    #[validate(custom(function = "validate_non_negative"))]
    pub tax: Decimal,

    #[serde(default)]
    pub cycles: u32,

    #[serde(default)]
    pub frequency: Option<Frequency>,

    #[serde(default)]
    #[validate(range(min = 1))]
    pub custom_days: Option<u32>,

    #[serde(default)]
    pub trial_period_days: u32,

    #[serde(default)]
    #[validate(length(min = 1, max = 127))]
    pub plan_name: Option<String>,

    #[serde(default)]
    #[validate(length(max = 127))]
    pub description: Option<String>,

    #[validate(url)]
    pub return_url: String,

    /// Defaults to `return_url`
    #[serde(default)]
    #[validate(url)]
    pub cancel_url: Option<String>,

    /// Agreement start; defaults depend on the plan kind
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
}

impl PlanRequest {
    /// Minimal request; remaining fields take their serde defaults
    pub fn new(amount: Decimal, currency: impl Into<String>, return_url: impl Into<String>) -> Self {
        Self {
            amount,
            initial_amount: None,
            currency: currency.into(),
            discount_type: DiscountType::default(),
            discount: Decimal::ZERO,
            tax: Decimal::ZERO,
            cycles: 0,
            frequency: None,
            custom_days: None,
            trial_period_days: 0,
            plan_name: None,
            description: None,
            return_url: return_url.into(),
            cancel_url: None,
            start_date: None,
        }
    }

    /// Run the amount normalizer and resolve currency / frequency.
    ///
    /// Consumes the request: it lives for exactly one call.
    pub fn prepare(self, kind: PlanKind) -> PreparedPlan {
        let amounts = normalize::normalize(
            kind,
            self.amount,
            self.initial_amount,
            self.discount_type,
            self.discount,
            self.tax,
            self.cycles,
        );
        let billing = self.frequency.map(|f| f.resolve(self.custom_days));
        let cancel_url = self.cancel_url.unwrap_or_else(|| self.return_url.clone());

        PreparedPlan {
            kind,
            currency: self.currency.to_uppercase(),
            amounts,
            billing,
            cycles: self.cycles,
            trial_period_days: self.trial_period_days,
            plan_name: self.plan_name.unwrap_or_else(|| default_plan_name(kind).to_string()),
            description: self.description,
            return_url: self.return_url,
            cancel_url,
            start_date: self.start_date,
        }
    }
}

fn default_plan_name(kind: PlanKind) -> &'static str {
    match kind {
        PlanKind::OneTime => "One-Time Payment",
        PlanKind::Recurring => "Recurring Payment Plan",
        PlanKind::FixedRecurring => "Fixed Recurring Payment Plan",
        PlanKind::Installments => "Installments Payment Plan",
    }
}

/// Normalized plan, ready for the request builder
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedPlan {
    pub kind: PlanKind,
    /// Upper-cased ISO 4217 code
    pub currency: String,
    pub amounts: NormalizedAmounts,
    pub billing: Option<BillingFrequency>,
    pub cycles: u32,
    pub trial_period_days: u32,
    pub plan_name: String,
    pub description: Option<String>,
    pub return_url: String,
    pub cancel_url: String,
    pub start_date: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_custom_frequency_uses_days() {
        let freq = Frequency::Custom.resolve(Some(14));
        assert_eq!(freq.unit, "DAY");
        assert_eq!(freq.interval, 14);
    }

    #[test]
    fn test_named_frequency_interval_is_one() {
        let freq = Frequency::Month.resolve(Some(14));
        assert_eq!(freq.unit, "MONTH");
        assert_eq!(freq.interval, 1);
    }

    #[test]
    fn test_prepare_uppercases_currency() {
        let mut req = PlanRequest::new(dec!(10), "eUr", "https://shop.test/return");
        req.frequency = Some(Frequency::Week);
        let plan = req.prepare(PlanKind::Recurring);
        assert_eq!(plan.currency, "EUR");
        assert_eq!(plan.cancel_url, "https://shop.test/return");
        assert_eq!(plan.plan_name, "Recurring Payment Plan");
    }

    #[test]
    fn test_unknown_discount_type_is_flat() {
        let json = serde_json::json!({
            "amount": "50",
            "currency": "usd",
            "discount_type": "coupon",
            "discount": "5",
            "return_url": "https://shop.test/return"
        });
        let req: PlanRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.discount_type, DiscountType::Flat);
    }

    #[test]
    fn test_numeric_json_amounts_deserialize() {
        let json = serde_json::json!({
            "amount": 100,
            "currency": "usd",
            "discount_type": "percentage",
            "discount": 10,
            "return_url": "https://shop.test/return"
        });
        let req: PlanRequest = serde_json::from_value(json).unwrap();
        assert_eq!(req.amount, dec!(100));
        assert_eq!(req.discount, dec!(10));
    }
}
