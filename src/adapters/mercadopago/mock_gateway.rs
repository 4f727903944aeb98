//! Mock Mercado Pago for testing.
//!
//! Implements both provider ports with:
//! - Pre-configured payments
//! - Error injection per payment id
//! - Artificial latency
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::billing::{PaymentDetails, PaymentFetchError};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{PaymentStatusFetcher, Preference, PreferenceGateway, PreferenceRequest};

/// Mock provider. Unknown payment ids are reported as not found.
///
/// # Example
///
/// ```ignore
/// let mock = MockMercadoPago::new();
/// mock.set_payment(details);
/// mock.set_fetch_error("P3", PaymentFetchError::Transient("timed out".into()));
/// mock.set_latency(Duration::from_secs(10));
/// ```
#[derive(Default, Clone)]
pub struct MockMercadoPago {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    payments: HashMap<String, PaymentDetails>,
    fetch_errors: HashMap<String, PaymentFetchError>,
    latency: Option<Duration>,
    fetched: Vec<String>,
    preference_error: Option<DomainError>,
    preference_requests: Vec<PreferenceRequest>,
}

impl MockMercadoPago {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the provider's current view of a payment.
    pub fn set_payment(&self, details: PaymentDetails) {
        if let Ok(mut state) = self.inner.lock() {
            state.payments.insert(details.payment_id.clone(), details);
        }
    }

    /// Makes fetches of `payment_id` fail with `error`.
    pub fn set_fetch_error(&self, payment_id: impl Into<String>, error: PaymentFetchError) {
        if let Ok(mut state) = self.inner.lock() {
            state.fetch_errors.insert(payment_id.into(), error);
        }
    }

    /// Delays every fetch by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        if let Ok(mut state) = self.inner.lock() {
            state.latency = Some(latency);
        }
    }

    /// Makes preference creation fail.
    pub fn fail_preferences(&self, error: DomainError) {
        if let Ok(mut state) = self.inner.lock() {
            state.preference_error = Some(error);
        }
    }

    /// Payment ids fetched so far, in call order.
    pub fn fetched(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|s| s.fetched.clone())
            .unwrap_or_default()
    }

    /// Preference requests received so far.
    pub fn preference_requests(&self) -> Vec<PreferenceRequest> {
        self.inner
            .lock()
            .map(|s| s.preference_requests.clone())
            .unwrap_or_default()
    }

    fn poisoned() -> DomainError {
        DomainError::new(ErrorCode::InternalError, "mock state poisoned")
    }
}

#[async_trait]
impl PaymentStatusFetcher for MockMercadoPago {
    async fn fetch(&self, payment_id: &str) -> Result<PaymentDetails, PaymentFetchError> {
        let latency = {
            let mut state = self
                .inner
                .lock()
                .map_err(|_| PaymentFetchError::Transient("mock state poisoned".into()))?;
            state.fetched.push(payment_id.to_string());
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let state = self
            .inner
            .lock()
            .map_err(|_| PaymentFetchError::Transient("mock state poisoned".into()))?;
        if let Some(error) = state.fetch_errors.get(payment_id) {
            return Err(error.clone());
        }
        state
            .payments
            .get(payment_id)
            .cloned()
            .ok_or_else(|| PaymentFetchError::NotFound(payment_id.to_string()))
    }
}

#[async_trait]
impl PreferenceGateway for MockMercadoPago {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<Preference, DomainError> {
        let mut state = self.inner.lock().map_err(|_| Self::poisoned())?;
        state.preference_requests.push(request.clone());
        if let Some(error) = &state.preference_error {
            return Err(error.clone());
        }
        let id = format!("pref-{}", request.subscription_id);
        Ok(Preference {
            init_point: format!(
                "https://www.mercadopago.com.br/checkout/v1/redirect?pref_id={}",
                id
            ),
            sandbox_init_point: Some(format!(
                "https://sandbox.mercadopago.com.br/checkout/v1/redirect?pref_id={}",
                id
            )),
            id,
        })
    }
}
