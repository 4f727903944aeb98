//! WebhookEventStore port - Append-only audit log of inbound notifications.
//!
//! Every notification gets exactly one row, written before any side effect
//! and later flagged processed or annotated with an error. Rows are never
//! deleted.

use async_trait::async_trait;

use crate::domain::billing::WebhookEvent;
use crate::domain::foundation::{DomainError, Timestamp, WebhookEventId};

#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    /// Appends an audit entry and returns its id.
    async fn append(&self, event: &WebhookEvent) -> Result<WebhookEventId, DomainError>;

    /// Sets the processed flag and timestamp.
    async fn mark_processed(&self, id: &WebhookEventId, at: Timestamp) -> Result<(), DomainError>;

    /// Records an error detail. Does not touch the processed flag.
    async fn mark_errored(&self, id: &WebhookEventId, detail: &str) -> Result<(), DomainError>;

    async fn find(&self, id: &WebhookEventId) -> Result<Option<WebhookEvent>, DomainError>;

    /// Most recent entries first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<WebhookEvent>, DomainError>;
}
