//! Application handlers.
//!
//! Command handlers that orchestrate domain operations.

pub mod billing;

pub use billing::{
    CreatePreferenceCommand, CreatePreferenceHandler, CreatePreferenceResult,
    ReconcileNotificationCommand, ReconcileNotificationHandler, ReconcileOutcome,
    ReconcileSettings,
};
