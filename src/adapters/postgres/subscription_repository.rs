//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::billing::{Plan, Subscription, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::ports::SubscriptionRepository;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: Uuid,
    plan: String,
    status: String,
    price_cents: i64,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    next_billing_at: Option<DateTime<Utc>>,
    provider_preference_id: Option<String>,
    provider_payment_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let plan: Plan = row.plan.parse().map_err(|_| {
            DomainError::database(format!("Invalid plan value: {}", row.plan))
        })?;
        let status: SubscriptionStatus = row.status.parse().map_err(|_| {
            DomainError::database(format!("Invalid status value: {}", row.status))
        })?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id.to_string())?,
            plan,
            status,
            price_cents: row.price_cents,
            starts_at: row.starts_at.map(Timestamp::from_datetime),
            ends_at: row.ends_at.map(Timestamp::from_datetime),
            next_billing_at: row.next_billing_at.map(Timestamp::from_datetime),
            provider_preference_id: row.provider_preference_id,
            provider_payment_id: row.provider_payment_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

pub(super) fn parse_user_id_as_uuid(user_id: &UserId) -> Result<Uuid, DomainError> {
    Uuid::parse_str(user_id.as_str()).map_err(|e| {
        DomainError::validation("user_id", format!("User ID must be a valid UUID: {}", e))
    })
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn insert(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let user_uuid = parse_user_id_as_uuid(&subscription.user_id)?;

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, plan, status, price_cents, starts_at, ends_at, next_billing_at,
                provider_preference_id, provider_payment_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(user_uuid)
        .bind(subscription.plan.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.price_cents)
        .bind(subscription.starts_at.map(|t| *t.as_datetime()))
        .bind(subscription.ends_at.map(|t| *t.as_datetime()))
        .bind(subscription.next_billing_at.map(|t| *t.as_datetime()))
        .bind(&subscription.provider_preference_id)
        .bind(&subscription.provider_payment_id)
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert subscription: {}", e)))?;

        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, plan, status, price_cents, starts_at, ends_at, next_billing_at,
                   provider_preference_id, provider_payment_id, created_at, updated_at
            FROM subscriptions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch subscription: {}", e)))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn update_if_status(
        &self,
        subscription: &Subscription,
        expected: SubscriptionStatus,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = $3,
                starts_at = $4,
                ends_at = $5,
                next_billing_at = $6,
                provider_payment_id = $7,
                updated_at = $8
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(expected.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.starts_at.map(|t| *t.as_datetime()))
        .bind(subscription.ends_at.map(|t| *t.as_datetime()))
        .bind(subscription.next_billing_at.map(|t| *t.as_datetime()))
        .bind(&subscription.provider_payment_id)
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update subscription: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }

    async fn set_preference_id(
        &self,
        id: &SubscriptionId,
        preference_id: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET provider_preference_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(preference_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to store preference id: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                format!("Subscription not found: {}", id),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(plan: &str, status: &str) -> SubscriptionRow {
        let now = Utc::now();
        SubscriptionRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            plan: plan.to_string(),
            status: status.to_string(),
            price_cents: 2990,
            starts_at: Some(now),
            ends_at: None,
            next_billing_at: None,
            provider_preference_id: Some("pref-1".to_string()),
            provider_payment_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_to_subscription() {
        let row = row("monthly", "active");
        let id = row.id;
        let sub = Subscription::try_from(row).unwrap();

        assert_eq!(sub.id, SubscriptionId::from_uuid(id));
        assert_eq!(sub.plan, Plan::Monthly);
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.starts_at.is_some());
        assert_eq!(sub.provider_preference_id.as_deref(), Some("pref-1"));
    }

    #[test]
    fn row_with_unknown_status_is_rejected() {
        let err = Subscription::try_from(row("monthly", "past_due")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn row_with_unknown_plan_is_rejected() {
        assert!(Subscription::try_from(row("weekly", "pending")).is_err());
    }

    #[test]
    fn user_id_must_be_uuid() {
        assert!(parse_user_id_as_uuid(&UserId::new("not-a-uuid").unwrap()).is_err());
        let uuid = Uuid::new_v4();
        assert_eq!(
            parse_user_id_as_uuid(&UserId::new(uuid.to_string()).unwrap()).unwrap(),
            uuid
        );
    }
}
