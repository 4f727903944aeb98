//! PaymentStatusFetcher port - Authoritative payment state from the provider.

use async_trait::async_trait;

use crate::domain::billing::{PaymentDetails, PaymentFetchError};

/// Fetches the current state of a provider payment.
///
/// Implementations must bound the call in time and report expiry as
/// `PaymentFetchError::Transient`.
#[async_trait]
pub trait PaymentStatusFetcher: Send + Sync {
    async fn fetch(&self, payment_id: &str) -> Result<PaymentDetails, PaymentFetchError>;
}
