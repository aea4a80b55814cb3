//! Amount Normalizer
//!
//! Discount, tax and cycle arithmetic applied before a plan is sent to the
//! gateway. There are two discount formulas:
//!
//! - **Subtractive** (one-time, recurring, fixed): the discount is taken off
//!   each amount, rounded to one decimal place, and floored at zero.
//! - **Installment** (upfront + remainder): the discount is turned into a
//!   percentage of the total and applied multiplicatively to the upfront
//!   charge and to the remainder. There is no floor on this path.
//!
//! ```text
//! amount ──▶ discount ──▶ tax (+x%, 2dp) ──▶ ÷ cycles (fixed / installments)
//! ```

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::model::{DiscountType, PlanKind};

/// Final monetary fields of a plan
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAmounts {
    /// Per-cycle charge (amortizing kinds) or the full charge
    pub amount: Decimal,

    /// Upfront charge; never divided by cycles
    pub initial_amount: Option<Decimal>,
}

/// Normalize a plan's amounts for its kind
pub fn normalize(
    kind: PlanKind,
    amount: Decimal,
    initial_amount: Option<Decimal>,
    discount_type: DiscountType,
    discount: Decimal,
    tax: Decimal,
    cycles: u32,
) -> NormalizedAmounts {
    let discounted = match (kind, initial_amount) {
        (PlanKind::Installments, Some(initial)) => {
            apply_installment_discount(amount, initial, discount_type, discount)
        }
        _ => apply_discount(amount, initial_amount, discount_type, discount),
    };

    let taxed = apply_tax(discounted, tax);

    if kind.amortizes() {
        amortize(taxed, cycles)
    } else {
        taxed
    }
}

/// Subtractive discount with a hard floor at zero.
///
/// A flat discount is taken in full from both amounts, it is not pro-rated.
pub fn apply_discount(
    amount: Decimal,
    initial_amount: Option<Decimal>,
    discount_type: DiscountType,
    discount: Decimal,
) -> NormalizedAmounts {
    if discount <= Decimal::ZERO {
        return NormalizedAmounts { amount, initial_amount };
    }

    let reduce = |value: Decimal| -> Decimal {
        let cut = match discount_type {
            DiscountType::Percentage => value * (discount / dec!(100)),
            DiscountType::Flat => discount,
        };
        floor_at_zero(round_dp(value - cut, 1))
    };

    NormalizedAmounts {
        amount: reduce(amount),
        initial_amount: initial_amount.map(reduce),
    }
}

/// Installment discount: `total` is the full price, `initial` the upfront
/// part. The returned `amount` is the discounted remainder before
/// amortization.
pub fn apply_installment_discount(
    total: Decimal,
    initial: Decimal,
    discount_type: DiscountType,
    discount: Decimal,
) -> NormalizedAmounts {
    let remainder = total - initial;

    if discount <= Decimal::ZERO {
        return NormalizedAmounts {
            amount: remainder,
            initial_amount: Some(initial),
        };
    }

    let percent = effective_discount_percent(total, discount_type, discount);
    let factor = Decimal::ONE - percent / dec!(100);

    NormalizedAmounts {
        amount: remainder * factor,
        initial_amount: Some(round_dp(initial * factor, 2)),
    }
}

/// A flat discount expressed as a percentage of `total`
pub fn effective_discount_percent(
    total: Decimal,
    discount_type: DiscountType,
    discount: Decimal,
) -> Decimal {
    match discount_type {
        DiscountType::Percentage => discount,
        DiscountType::Flat if total.is_zero() => Decimal::ZERO,
        DiscountType::Flat => discount / total * dec!(100),
    }
}

/// Additive tax, applied once to each amount and rounded to cents
pub fn apply_tax(amounts: NormalizedAmounts, tax: Decimal) -> NormalizedAmounts {
    if tax <= Decimal::ZERO {
        return amounts;
    }

    let add = |value: Decimal| round_dp(value + value * (tax / dec!(100)), 2);

    NormalizedAmounts {
        amount: add(amounts.amount),
        initial_amount: amounts.initial_amount.map(add),
    }
}

/// Per-cycle charge. The upfront charge is left as is.
pub fn amortize(amounts: NormalizedAmounts, cycles: u32) -> NormalizedAmounts {
    if cycles == 0 {
        return amounts;
    }

    NormalizedAmounts {
        amount: amounts.amount / Decimal::from(cycles),
        ..amounts
    }
}

/// Render a money value the way the gateway expects: two decimals
pub fn to_money_string(value: Decimal) -> String {
    let mut rounded = round_dp(value, 2);
    rounded.rescale(2);
    rounded.to_string()
}

fn round_dp(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

fn floor_at_zero(value: Decimal) -> Decimal {
    if value > Decimal::ZERO { value } else { Decimal::ZERO }
}
