//! Request Validation
//!
//! Field-level rules come from the `Validate` derive on `PlanRequest`;
//! the rules that depend on the plan kind live here.

use std::borrow::Cow;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{PaymentError, Result};
use crate::model::{DiscountType, Frequency, PlanKind, PlanRequest};

/// Largest amount the gateway accepts: 10 integer digits, 2 decimals
pub const MAX_AMOUNT: Decimal = dec!(9999999999.99);

/// Cap for percentage discounts and tax
pub const MAX_PERCENT: Decimal = dec!(100);

pub(crate) fn validate_non_negative(value: &Decimal) -> std::result::Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(invalid("non_negative", "must be greater than or equal to 0"));
    }
    Ok(())
}

pub(crate) fn validate_currency_code(code: &str) -> std::result::Result<(), ValidationError> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid("currency", "must be a 3-letter ISO 4217 code"));
    }
    Ok(())
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

/// Validate a plan request for the given kind.
///
/// Returns the first problem found, field rules before kind rules.
pub fn validate_plan(request: &PlanRequest, kind: PlanKind) -> Result<()> {
    request.validate().map_err(|e| PaymentError::Validation(describe(&e)))?;

    if request.amount.is_zero() {
        return Err(PaymentError::Validation("amount must be greater than 0".into()));
    }
    check_money_bound("amount", request.amount)?;
    if let Some(initial) = request.initial_amount {
        check_money_bound("initial_amount", initial)?;
    }
    match request.discount_type {
        DiscountType::Percentage => check_percent_bound("discount", request.discount)?,
        DiscountType::Flat => check_money_bound("discount", request.discount)?,
    }
    check_percent_bound("tax", request.tax)?;

    if kind == PlanKind::OneTime {
        return Ok(());
    }

    let frequency = request
        .frequency
        .ok_or_else(|| PaymentError::Validation("frequency is required".into()))?;

    if frequency == Frequency::Custom && request.custom_days.is_none() {
        return Err(PaymentError::Validation(
            "custom_days is required when frequency is custom".into(),
        ));
    }

    if kind.amortizes() && request.cycles == 0 {
        return Err(PaymentError::Validation("cycles must be at least 1".into()));
    }

    if kind == PlanKind::Installments {
        let initial = request.initial_amount.ok_or_else(|| {
            PaymentError::Validation("initial_amount is required for installments".into())
        })?;
        if initial > request.amount {
            return Err(PaymentError::Validation(
                "initial_amount must not exceed amount".into(),
            ));
        }
        if request.discount_type == DiscountType::Flat && request.discount > request.amount {
            return Err(PaymentError::Validation("discount must not exceed amount".into()));
        }
    }

    Ok(())
}

/// Reject values above the gateway's amount limit
pub fn check_money_bound(field: &str, value: Decimal) -> Result<()> {
    if value > MAX_AMOUNT {
        return Err(PaymentError::Validation(format!(
            "{field} must not exceed {MAX_AMOUNT}"
        )));
    }
    Ok(())
}

fn check_percent_bound(field: &str, value: Decimal) -> Result<()> {
    if value > MAX_PERCENT {
        return Err(PaymentError::Validation(format!(
            "{field} must not exceed {MAX_PERCENT} percent"
        )));
    }
    Ok(())
}

/// Require a non-blank identifier argument
pub fn require_id(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PaymentError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// Flatten validator output to `field: message`, fields in name order
fn describe(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .filter_map(|(field, errs)| {
            errs.first().map(|e| match &e.message {
                Some(msg) => format!("{field}: {msg}"),
                None => format!("{field}: invalid ({})", e.code),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}
