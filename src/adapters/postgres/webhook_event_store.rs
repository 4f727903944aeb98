//! PostgreSQL implementation of WebhookEventStore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::WebhookEvent;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, WebhookEventId};
use crate::ports::WebhookEventStore;

pub struct PostgresWebhookEventStore {
    pool: PgPool,
}

impl PostgresWebhookEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn not_found(id: &WebhookEventId) -> DomainError {
        DomainError::new(
            ErrorCode::WebhookEventNotFound,
            format!("Webhook event not found: {}", id),
        )
    }
}

#[derive(Debug, sqlx::FromRow)]
struct WebhookEventRow {
    id: Uuid,
    kind: Option<String>,
    action: Option<String>,
    payment_id: Option<String>,
    raw_payload: Json<serde_json::Value>,
    processed: bool,
    processed_at: Option<DateTime<Utc>>,
    error: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<WebhookEventRow> for WebhookEvent {
    fn from(row: WebhookEventRow) -> Self {
        WebhookEvent {
            id: WebhookEventId::from_uuid(row.id),
            kind: row.kind,
            action: row.action,
            payment_id: row.payment_id,
            raw_payload: row.raw_payload.0,
            processed: row.processed,
            processed_at: row.processed_at.map(Timestamp::from_datetime),
            error: row.error,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

const SELECT_COLUMNS: &str =
    "id, kind, action, payment_id, raw_payload, processed, processed_at, error, created_at";

#[async_trait]
impl WebhookEventStore for PostgresWebhookEventStore {
    async fn append(&self, event: &WebhookEvent) -> Result<WebhookEventId, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO webhook_events (
                id, kind, action, payment_id, raw_payload, processed, processed_at, error, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(&event.kind)
        .bind(&event.action)
        .bind(&event.payment_id)
        .bind(Json(&event.raw_payload))
        .bind(event.processed)
        .bind(event.processed_at.map(|t| *t.as_datetime()))
        .bind(&event.error)
        .bind(event.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to append webhook event: {}", e)))?;

        Ok(event.id)
    }

    async fn mark_processed(&self, id: &WebhookEventId, at: Timestamp) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE webhook_events SET processed = TRUE, processed_at = $2 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to mark webhook processed: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn mark_errored(&self, id: &WebhookEventId, detail: &str) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE webhook_events SET error = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(detail)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DomainError::database(format!("Failed to mark webhook errored: {}", e))
            })?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn find(&self, id: &WebhookEventId) -> Result<Option<WebhookEvent>, DomainError> {
        let row: Option<WebhookEventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM webhook_events WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch webhook event: {}", e)))?;

        Ok(row.map(WebhookEvent::from))
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<WebhookEvent>, DomainError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<WebhookEventRow> = sqlx::query_as(&format!(
            "SELECT {} FROM webhook_events ORDER BY created_at DESC LIMIT $1",
            SELECT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list webhook events: {}", e)))?;

        Ok(rows.into_iter().map(WebhookEvent::from).collect())
    }
}
