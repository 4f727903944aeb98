//! Foundation module - Shared domain primitives.
//!
//! Contains the identifiers, timestamps and error types that the
//! billing domain is built on.

mod errors;
mod ids;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{PaymentRecordId, SubscriptionId, UserId, WebhookEventId};
pub use timestamp::Timestamp;
