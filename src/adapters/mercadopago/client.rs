//! Mercado Pago REST client.
//!
//! Implements `PaymentStatusFetcher` (payment lookups during reconciliation)
//! and `PreferenceGateway` (checkout preference creation).
//!
//! # Error mapping
//!
//! | Response | Fetch result |
//! |----------|--------------|
//! | 404 | `NotFound` |
//! | 429, 5xx, timeout, connect failure | `Transient` |
//! | other 4xx | `Rejected` |
//! | undecodable 2xx body | `InvalidResponse` |

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::config::PaymentConfig;
use crate::domain::billing::{PaymentDetails, PaymentFetchError};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{PaymentStatusFetcher, Preference, PreferenceGateway, PreferenceRequest};

use super::wire_types::{
    MpBackUrls, MpErrorBody, MpItem, MpPayment, MpPaymentMethods, MpPreferenceBody,
    MpPreferenceIdentification, MpPreferencePayer, MpPreferenceResponse,
};

/// Mercado Pago client configuration.
#[derive(Debug, Clone)]
pub struct MercadoPagoConfig {
    access_token: SecretString,
    api_base_url: String,
    timeout: Duration,
    success_url: String,
    failure_url: String,
    pending_url: String,
    notification_url: String,
    statement_descriptor: String,
    preference_expiration_minutes: i64,
    max_installments: u32,
}

impl MercadoPagoConfig {
    /// Creates a configuration with production defaults.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self::from_payment_config(&PaymentConfig {
            access_token: SecretString::new(access_token.into()),
            ..Default::default()
        })
    }

    pub fn from_payment_config(config: &PaymentConfig) -> Self {
        Self {
            access_token: config.access_token.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout(),
            success_url: config.success_url.clone(),
            failure_url: config.failure_url.clone(),
            pending_url: config.pending_url.clone(),
            notification_url: config.notification_url.clone(),
            statement_descriptor: config.statement_descriptor.clone(),
            preference_expiration_minutes: config.preference_expiration_minutes,
            max_installments: config.max_installments,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Mercado Pago adapter.
pub struct MercadoPagoClient {
    config: MercadoPagoConfig,
    http_client: reqwest::Client,
}

impl MercadoPagoClient {
    /// Builds the client with the configured request timeout.
    pub fn new(config: MercadoPagoConfig) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn transport_error(&self, e: reqwest::Error) -> PaymentFetchError {
        if e.is_timeout() {
            PaymentFetchError::Transient(format!(
                "timed out after {}ms",
                self.config.timeout.as_millis()
            ))
        } else if e.is_connect() {
            PaymentFetchError::Transient(format!("connection failed: {}", e))
        } else {
            PaymentFetchError::Transient(e.to_string())
        }
    }

    fn build_preference(&self, request: &PreferenceRequest, now: Timestamp) -> MpPreferenceBody {
        let subscription_id = request.subscription_id.to_string();
        let back_url = |base: &str| format!("{}?assinatura_id={}", base, subscription_id);

        MpPreferenceBody {
            items: vec![MpItem {
                id: subscription_id.clone(),
                title: request.plan.title().to_string(),
                description: request.plan.description().to_string(),
                quantity: 1,
                unit_price: request.plan.price_cents() as f64 / 100.0,
                currency_id: "BRL",
            }],
            payer: MpPreferencePayer {
                name: request.payer.name.clone(),
                email: request.payer.email.clone(),
                identification: MpPreferenceIdentification {
                    kind: "CPF",
                    number: request.payer.cpf.clone(),
                },
            },
            payment_methods: MpPaymentMethods {
                excluded_payment_types: Vec::new(),
                excluded_payment_methods: Vec::new(),
                installments: self.config.max_installments,
                default_installments: 1,
            },
            back_urls: MpBackUrls {
                success: back_url(&self.config.success_url),
                failure: back_url(&self.config.failure_url),
                pending: back_url(&self.config.pending_url),
            },
            notification_url: self.config.notification_url.clone(),
            auto_return: "approved",
            external_reference: subscription_id,
            statement_descriptor: self.config.statement_descriptor.clone(),
            expires: true,
            expiration_date_from: now.to_rfc3339(),
            expiration_date_to: now
                .add_minutes(self.config.preference_expiration_minutes)
                .to_rfc3339(),
        }
    }
}

/// Provider ids are numeric; anything else never reaches the URL.
fn is_valid_payment_id(payment_id: &str) -> bool {
    !payment_id.is_empty()
        && payment_id.len() <= 64
        && payment_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl PaymentStatusFetcher for MercadoPagoClient {
    async fn fetch(&self, payment_id: &str) -> Result<PaymentDetails, PaymentFetchError> {
        if !is_valid_payment_id(payment_id) {
            return Err(PaymentFetchError::Rejected {
                status: 400,
                message: format!("invalid payment id {:?}", payment_id),
            });
        }

        let url = format!("{}/v1/payments/{}", self.config.api_base_url, payment_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(PaymentFetchError::NotFound(payment_id.to_string()));
        }
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(PaymentFetchError::Transient(format!(
                "provider returned {}",
                status
            )));
        }
        if !status.is_success() {
            let body: MpErrorBody = response.json().await.unwrap_or_default();
            tracing::warn!(
                payment_id = %payment_id,
                status = status.as_u16(),
                "Mercado Pago rejected payment lookup"
            );
            return Err(PaymentFetchError::Rejected {
                status: status.as_u16(),
                message: body.describe(status.as_str()),
            });
        }

        let raw: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                PaymentFetchError::InvalidResponse(e.to_string())
            }
        })?;
        let payment: MpPayment = serde_json::from_value(raw.clone())
            .map_err(|e| PaymentFetchError::InvalidResponse(e.to_string()))?;

        Ok(payment.into_details(payment_id, raw))
    }
}

#[async_trait]
impl PreferenceGateway for MercadoPagoClient {
    async fn create_preference(
        &self,
        request: &PreferenceRequest,
    ) -> Result<Preference, DomainError> {
        let url = format!("{}/checkout/preferences", self.config.api_base_url);
        let body = self.build_preference(request, Timestamp::now());

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.access_token.expose_secret())
            .header("X-Idempotency-Key", request.subscription_id.to_string())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                DomainError::new(
                    ErrorCode::ExternalServiceError,
                    format!("Mercado Pago request failed: {}", e),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let error: MpErrorBody = response.json().await.unwrap_or_default();
            return Err(DomainError::new(
                ErrorCode::ExternalServiceError,
                format!(
                    "Mercado Pago API error ({}): {}",
                    status.as_u16(),
                    error.describe(status.as_str())
                ),
            ));
        }

        let created: MpPreferenceResponse = response.json().await.map_err(|e| {
            DomainError::new(
                ErrorCode::ExternalServiceError,
                format!("Failed to parse Mercado Pago response: {}", e),
            )
        })?;

        match (created.id, created.init_point) {
            (Some(id), Some(init_point)) => Ok(Preference {
                id,
                init_point,
                sandbox_init_point: created.sandbox_init_point,
            }),
            _ => Err(DomainError::new(
                ErrorCode::ExternalServiceError,
                "Mercado Pago response missing preference id or init_point",
            )),
        }
    }
}
