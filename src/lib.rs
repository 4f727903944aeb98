//! Subscription Reconciler - Mercado Pago payment reconciliation
//!
//! This crate keeps premium subscriptions in step with the payment
//! provider: inbound notifications are audit-logged, the referenced payment
//! is fetched from the provider, and the subscription ledger and user
//! profile are updated idempotently.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
