//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Provider Ports
//!
//! - `PaymentStatusFetcher` - Authoritative payment state
//! - `PreferenceGateway` - Checkout preference creation
//!
//! ## Persistence Ports
//!
//! - `WebhookEventStore` - Audit log of inbound notifications
//! - `SubscriptionRepository` - Subscription ledger with conditional update
//! - `PaymentRecordRepository` - Payment history
//! - `ProfileWriter` - Premium flag on user profiles

mod payment_record_repository;
mod payment_status_fetcher;
mod preference_gateway;
mod profile_writer;
mod subscription_repository;
mod webhook_event_store;

pub use payment_record_repository::PaymentRecordRepository;
pub use payment_status_fetcher::PaymentStatusFetcher;
pub use preference_gateway::{Payer, Preference, PreferenceGateway, PreferenceRequest};
pub use profile_writer::ProfileWriter;
pub use subscription_repository::SubscriptionRepository;
pub use webhook_event_store::WebhookEventStore;
