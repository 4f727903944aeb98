//! Billing handlers.
//!
//! ## Commands
//! - Reconciling an inbound payment notification
//! - Starting a checkout (pending subscription + provider preference)

mod create_preference;
mod reconcile_notification;

pub use create_preference::{
    CreatePreferenceCommand, CreatePreferenceHandler, CreatePreferenceResult,
};
pub use reconcile_notification::{
    ReconcileNotificationCommand, ReconcileNotificationHandler, ReconcileOutcome,
    ReconcileSettings,
};
