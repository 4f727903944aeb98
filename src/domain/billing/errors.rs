//! Billing error types.
//!
//! | Error | Audit row |
//! |-------|-----------|
//! | NotFoundAtProvider | processed |
//! | TransientProvider | errored |
//! | Provider | errored |
//! | OrphanPayment | errored |
//! | Persistence | errored when writable |
//! | ConcurrentModification | errored |

use thiserror::Error;

use crate::domain::foundation::{DomainError, SubscriptionId};

/// Why fetching a payment from the provider failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentFetchError {
    /// Provider has no such payment.
    #[error("payment {0} not found at provider")]
    NotFound(String),

    /// Network failure, timeout, rate limit or provider 5xx.
    #[error("provider temporarily unavailable: {0}")]
    Transient(String),

    /// Provider refused the request (bad credentials, malformed id).
    #[error("provider rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Provider answered with a body we could not decode.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl PaymentFetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, PaymentFetchError::Transient(_))
    }
}

/// Outcome-level failure of reconciling one notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    #[error("payment {payment_id} not found at provider")]
    NotFoundAtProvider { payment_id: String },

    #[error("transient provider error: {0}")]
    TransientProvider(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("orphan payment {payment_id}: external reference {reference:?} matches no subscription")]
    OrphanPayment {
        payment_id: String,
        reference: Option<String>,
    },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("concurrent modification of subscription {0}")]
    ConcurrentModification(SubscriptionId),
}

impl ReconciliationError {
    /// Benign failures still count as processed.
    pub fn is_benign(&self) -> bool {
        matches!(self, ReconciliationError::NotFoundAtProvider { .. })
    }

    /// The provider is expected to re-deliver these.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReconciliationError::TransientProvider(_)
                | ReconciliationError::Persistence(_)
                | ReconciliationError::ConcurrentModification(_)
        )
    }
}

impl From<PaymentFetchError> for ReconciliationError {
    fn from(err: PaymentFetchError) -> Self {
        match err {
            PaymentFetchError::NotFound(payment_id) => {
                ReconciliationError::NotFoundAtProvider { payment_id }
            }
            PaymentFetchError::Transient(msg) => ReconciliationError::TransientProvider(msg),
            other => ReconciliationError::Provider(other.to_string()),
        }
    }
}

impl From<DomainError> for ReconciliationError {
    fn from(err: DomainError) -> Self {
        ReconciliationError::Persistence(err.to_string())
    }
}

/// Failure of the checkout-preference flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreferenceError {
    #[error("Campos obrigatórios: plano, usuario_id, nome, email, cpf")]
    MissingFields,

    #[error("Plano inválido. Use \"monthly\" ou \"yearly\"")]
    InvalidPlan(String),

    #[error("Erro ao criar assinatura no banco de dados")]
    Persistence(String),

    #[error("Erro ao criar preferência no Mercado Pago")]
    Provider(String),
}

impl PreferenceError {
    /// Internal detail, kept out of the public message.
    pub fn detail(&self) -> Option<&str> {
        match self {
            PreferenceError::Persistence(d) | PreferenceError::Provider(d) => Some(d),
            PreferenceError::InvalidPlan(plan) => Some(plan),
            PreferenceError::MissingFields => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PreferenceError::MissingFields | PreferenceError::InvalidPlan(_)
        )
    }
}
