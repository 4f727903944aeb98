//! Payment provider configuration (Mercado Pago)

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Mercado Pago configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Mercado Pago access token (APP_USR-... or TEST-...)
    pub access_token: SecretString,

    /// API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Provider request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Checkout return URL after an approved payment
    #[serde(default = "default_success_url")]
    pub success_url: String,

    /// Checkout return URL after a failed payment
    #[serde(default = "default_failure_url")]
    pub failure_url: String,

    /// Checkout return URL while payment is pending
    #[serde(default = "default_pending_url")]
    pub pending_url: String,

    /// Where Mercado Pago sends notifications
    #[serde(default = "default_notification_url")]
    pub notification_url: String,

    /// Text on the buyer's card statement
    #[serde(default = "default_statement_descriptor")]
    pub statement_descriptor: String,

    /// How long a checkout preference stays payable
    #[serde(default = "default_preference_expiration_minutes")]
    pub preference_expiration_minutes: i64,

    /// Maximum card installments offered
    #[serde(default = "default_max_installments")]
    pub max_installments: u32,
}

impl PaymentConfig {
    /// Provider request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Check if using a Mercado Pago test credential
    pub fn is_test_mode(&self) -> bool {
        self.access_token.expose_secret().starts_with("TEST-")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.access_token.expose_secret().trim().is_empty() {
            return Err(ValidationError::MissingRequired("PAYMENT__ACCESS_TOKEN"));
        }
        if self.request_timeout_ms == 0 || self.request_timeout_ms > 60_000 {
            return Err(ValidationError::InvalidTimeout);
        }
        for (name, url) in [
            ("api_base_url", &self.api_base_url),
            ("success_url", &self.success_url),
            ("failure_url", &self.failure_url),
            ("pending_url", &self.pending_url),
            ("notification_url", &self.notification_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ValidationError::InvalidUrl(name));
            }
        }
        if self.statement_descriptor.is_empty() || self.statement_descriptor.len() > 22 {
            return Err(ValidationError::InvalidStatementDescriptor);
        }
        if self.max_installments == 0 || self.max_installments > 24 {
            return Err(ValidationError::InvalidInstallments);
        }
        if self.preference_expiration_minutes <= 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            access_token: SecretString::new(String::new()),
            api_base_url: default_api_base_url(),
            request_timeout_ms: default_request_timeout_ms(),
            success_url: default_success_url(),
            failure_url: default_failure_url(),
            pending_url: default_pending_url(),
            notification_url: default_notification_url(),
            statement_descriptor: default_statement_descriptor(),
            preference_expiration_minutes: default_preference_expiration_minutes(),
            max_installments: default_max_installments(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.mercadopago.com".to_string()
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_success_url() -> String {
    "https://seuapp.com/pagamento/sucesso".to_string()
}

fn default_failure_url() -> String {
    "https://seuapp.com/pagamento/erro".to_string()
}

fn default_pending_url() -> String {
    "https://seuapp.com/pagamento/pendente".to_string()
}

fn default_notification_url() -> String {
    "https://seuapp.com/api/mercadopago/webhook".to_string()
}

fn default_statement_descriptor() -> String {
    "MONJAPRO".to_string()
}

fn default_preference_expiration_minutes() -> i64 {
    30
}

fn default_max_installments() -> u32 {
    12
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_token(token: &str) -> PaymentConfig {
        PaymentConfig {
            access_token: SecretString::new(token.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = PaymentConfig::default();
        assert_eq!(config.api_base_url, "https://api.mercadopago.com");
        assert_eq!(config.request_timeout(), Duration::from_millis(5000));
        assert_eq!(config.statement_descriptor, "MONJAPRO");
        assert_eq!(config.preference_expiration_minutes, 30);
        assert_eq!(config.max_installments, 12);
    }

    #[test]
    fn test_is_test_mode() {
        assert!(with_token("TEST-123").is_test_mode());
        assert!(!with_token("APP_USR-123").is_test_mode());
    }

    #[test]
    fn test_validation_missing_token() {
        assert!(PaymentConfig::default().validate().is_err());
    }

    #[test]
    fn test_validation_invalid_timeout() {
        let config = PaymentConfig {
            request_timeout_ms: 0,
            ..with_token("TEST-123")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_invalid_callback_url() {
        let config = PaymentConfig {
            notification_url: "seuapp.com/webhook".to_string(),
            ..with_token("TEST-123")
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidUrl("notification_url"))
        ));
    }

    #[test]
    fn test_validation_long_statement_descriptor() {
        let config = PaymentConfig {
            statement_descriptor: "MONJAPRO PREMIUM SUBSCRIPTION".to_string(),
            ..with_token("TEST-123")
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(with_token("APP_USR-abc").validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", with_token("APP_USR-secret"));
        assert!(!debug.contains("APP_USR-secret"));
    }
}
