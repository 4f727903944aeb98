//! PostgreSQL adapters.
//!
//! Schema lives in `migrations/` and is applied with `sqlx::migrate!`.

mod payment_record_repository;
mod profile_writer;
mod subscription_repository;
mod webhook_event_store;

pub use payment_record_repository::PostgresPaymentRecordRepository;
pub use profile_writer::PostgresProfileWriter;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use webhook_event_store::PostgresWebhookEventStore;

/// Embedded migrations from `migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
