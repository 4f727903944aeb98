//! ProfileWriter port - Mirrors entitlement onto the externally owned profile.

use async_trait::async_trait;

use crate::domain::billing::Plan;
use crate::domain::foundation::{DomainError, UserId};

#[async_trait]
pub trait ProfileWriter: Send + Sync {
    /// Flags the profile premium and records its plan.
    ///
    /// # Errors
    ///
    /// Returns `ProfileNotFound` if the user has no profile.
    async fn grant_premium(&self, user_id: &UserId, plan: Plan) -> Result<(), DomainError>;
}
