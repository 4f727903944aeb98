//! PostgreSQL implementation of PaymentRecordRepository.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::domain::billing::PaymentRecord;
use crate::domain::foundation::DomainError;
use crate::ports::PaymentRecordRepository;

pub struct PostgresPaymentRecordRepository {
    pool: PgPool,
}

impl PostgresPaymentRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRecordRepository for PostgresPaymentRecordRepository {
    async fn append(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, subscription_reference, payment_id, status, status_detail, amount_cents,
                payment_method_id, payment_type_id, installments, payer_email, payer_name,
                payer_identification, approved_at, raw_payload, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.subscription_reference)
        .bind(&record.payment_id)
        .bind(record.status.as_str())
        .bind(&record.status_detail)
        .bind(record.amount_cents)
        .bind(&record.payment_method_id)
        .bind(&record.payment_type_id)
        .bind(record.installments)
        .bind(&record.payer_email)
        .bind(&record.payer_name)
        .bind(&record.payer_identification)
        .bind(record.approved_at.map(|t| *t.as_datetime()))
        .bind(Json(&record.raw_payload))
        .bind(record.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to append payment record: {}", e)))?;

        Ok(())
    }
}
