//! PaymentRecordRepository port - Append-only payment history.

use async_trait::async_trait;

use crate::domain::billing::PaymentRecord;
use crate::domain::foundation::DomainError;

#[async_trait]
pub trait PaymentRecordRepository: Send + Sync {
    /// Records one observed payment state. Never updates earlier entries.
    async fn append(&self, record: &PaymentRecord) -> Result<(), DomainError>;
}
