//! Billing domain module.
//!
//! Premium subscriptions paid through Mercado Pago, and the rules that
//! reconcile them with the provider's view of each payment.
//!
//! # Module Structure
//!
//! - `plan` - Plan catalogue (price, period length)
//! - `status` - Subscription and provider payment statuses
//! - `subscription` - Subscription aggregate
//! - `payment` - Fetched payment details and history entries
//! - `notification` - Inbound notification decoding
//! - `webhook_event` - Audit-log entry
//! - `policy` - State-transition policy
//! - `errors` - Billing error types

mod errors;
mod notification;
pub(crate) mod payment;
mod plan;
mod policy;
mod status;
mod subscription;
mod webhook_event;

pub use errors::{PaymentFetchError, PreferenceError, ReconciliationError};
pub use notification::{MalformedNotification, Notification, PAYMENT_TOPIC};
pub use payment::{amount_to_cents, PaymentDetails, PaymentRecord};
pub use plan::Plan;
pub use policy::{decide, Transition};
pub use status::{ProviderPaymentStatus, SubscriptionStatus};
pub use subscription::Subscription;
pub use webhook_event::WebhookEvent;
