//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `billing` - Subscriptions, payments, notifications and the transition policy

pub mod billing;
pub mod foundation;
