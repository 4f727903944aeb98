//! In-memory user profiles.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::ProfileWriter;

/// Entitlement fields of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileState {
    pub plan: Option<Plan>,
    pub premium: bool,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileWriter {
    profiles: Arc<RwLock<HashMap<UserId, ProfileState>>>,
    grants: Arc<RwLock<Vec<(UserId, Plan)>>>,
}

impl InMemoryProfileWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a non-premium profile.
    pub async fn add_profile(&self, user_id: UserId) {
        self.profiles.write().await.insert(
            user_id,
            ProfileState {
                plan: None,
                premium: false,
                updated_at: Timestamp::now(),
            },
        );
    }

    pub async fn get(&self, user_id: &UserId) -> Option<ProfileState> {
        self.profiles.read().await.get(user_id).cloned()
    }

    /// Every successful grant, in call order.
    pub async fn grants(&self) -> Vec<(UserId, Plan)> {
        self.grants.read().await.clone()
    }
}

#[async_trait]
impl ProfileWriter for InMemoryProfileWriter {
    async fn grant_premium(&self, user_id: &UserId, plan: Plan) -> Result<(), DomainError> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles.get_mut(user_id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::ProfileNotFound,
                format!("Profile not found: {}", user_id),
            )
        })?;
        profile.plan = Some(plan);
        profile.premium = true;
        profile.updated_at = Timestamp::now();
        self.grants.write().await.push((user_id.clone(), plan));
        Ok(())
    }
}
