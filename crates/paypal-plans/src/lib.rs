//! # paypal-plans
//!
//! One-time payments, subscriptions and installment plans on top of the
//! PayPal REST API, with discount and tax arithmetic done in `Decimal`.
//!
//! ## Flow
//!
//! Every subscription kind runs the same three gateway calls in order. The
//! first failure stops the sequence; earlier steps are not undone.
//!
//! ```text
//! ┌─────────────┐   ┌────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ PlanRequest │──▶│ normalize  │──▶│   builder   │──▶│ create plan  │
//! │  (caller)   │   │ discount / │   │  payloads   │   └──────┬───────┘
//! └─────────────┘   │ tax/cycles │   └─────────────┘          ▼
//!                   └────────────┘                     ┌──────────────┐
//!                                                      │   activate   │
//!                                                      └──────┬───────┘
//!                                                             ▼
//!                   ┌────────────────────────┐         ┌──────────────┐
//!                   │ Envelope<AgreementLink>│◀────────│  agreement   │
//!                   └────────────────────────┘         └──────────────┘
//! ```
//!
//! ## Amount rules
//!
//! | Kind            | Discount                | Tax       | Per cycle              |
//! |-----------------|-------------------------|-----------|------------------------|
//! | one-time        | subtract, 1 dp, floor 0 | add, 2 dp | -                      |
//! | recurring       | subtract, 1 dp, floor 0 | add, 2 dp | -                      |
//! | fixed recurring | subtract, 1 dp, floor 0 | add, 2 dp | `amount / cycles`      |
//! | installments    | proportional            | add, 2 dp | `remainder / cycles`   |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use paypal_plans::{configure, create_recurring_plan, Frequency, PlanRequest};
//! use rust_decimal_macros::dec;
//!
//! let client = configure("sandbox", "client-id", "client-secret")
//!     .into_response()
//!     .expect("valid credentials");
//!
//! let mut plan = PlanRequest::new(dec!(29.99), "usd", "https://shop.example/return");
//! plan.frequency = Some(Frequency::Month);
//!
//! let envelope = create_recurring_plan(plan, &client).await;
//! // Redirect the payer to: envelope.response.unwrap().link
//! ```

pub mod builder;
mod config;
mod envelope;
mod error;
pub mod gateway;
mod model;
pub mod normalize;
mod operations;
pub mod payload;
mod validation;

pub use config::{GatewayConfig, Mode};
pub use envelope::Envelope;
pub use error::{PaymentError, Result};
pub use gateway::{GatewayStep, MockGateway, PayPalClient, PaymentGateway, RecordedCall};
pub use model::{
    BillingFrequency, DiscountType, Frequency, PlanKind, PlanRequest, PreparedPlan,
};
pub use normalize::NormalizedAmounts;
pub use operations::{
    AgreementLink, CancellationConfirmation, PaymentLink, cancel_subscription, configure,
    create_fixed_recurring_plan, create_installment_plan, create_one_time_payment,
    create_recurring_plan, execute_billing_agreement, execute_payment, get_latest_sale_id,
    refund_payment,
};
pub use validation::{require_id, validate_plan};
