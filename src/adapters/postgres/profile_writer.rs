//! PostgreSQL implementation of ProfileWriter.
//!
//! The `profiles` table belongs to the user-management system; only the
//! entitlement columns are written here.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::ProfileWriter;

use super::subscription_repository::parse_user_id_as_uuid;

pub struct PostgresProfileWriter {
    pool: PgPool,
}

impl PostgresProfileWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileWriter for PostgresProfileWriter {
    async fn grant_premium(&self, user_id: &UserId, plan: Plan) -> Result<(), DomainError> {
        let user_uuid = parse_user_id_as_uuid(user_id)?;

        let result = sqlx::query(
            r#"
            UPDATE profiles SET plan = $2, premium = TRUE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_uuid)
        .bind(plan.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update profile: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::ProfileNotFound,
                format!("Profile not found: {}", user_id),
            ));
        }
        Ok(())
    }
}
