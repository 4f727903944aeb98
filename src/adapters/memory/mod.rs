//! In-memory adapters.
//!
//! Used by tests and by local runs without a database
//! (`RECONCILER__DATABASE__URL` unset).

mod payment_record_repository;
mod profile_writer;
mod subscription_repository;
mod webhook_event_store;

pub use payment_record_repository::InMemoryPaymentRecordRepository;
pub use profile_writer::{InMemoryProfileWriter, ProfileState};
pub use subscription_repository::InMemorySubscriptionRepository;
pub use webhook_event_store::InMemoryWebhookEventStore;
