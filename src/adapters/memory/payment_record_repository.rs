//! In-memory payment history.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::billing::PaymentRecord;
use crate::domain::foundation::DomainError;
use crate::ports::PaymentRecordRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentRecordRepository {
    records: Arc<RwLock<Vec<PaymentRecord>>>,
}

impl InMemoryPaymentRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records in insertion order.
    pub async fn all(&self) -> Vec<PaymentRecord> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl PaymentRecordRepository for InMemoryPaymentRecordRepository {
    async fn append(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }
}
