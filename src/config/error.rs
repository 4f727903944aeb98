//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool size must be between 1 and 100")]
    InvalidPoolSize,

    #[error("Invalid URL for {0}")]
    InvalidUrl(&'static str),

    #[error("Statement descriptor must be 1-22 characters")]
    InvalidStatementDescriptor,

    #[error("Installments must be between 1 and 24")]
    InvalidInstallments,

    #[error("Ack timeout must be between 1 and 60 seconds")]
    InvalidAckTimeout,

    #[error("Update attempts must be between 1 and 10")]
    InvalidUpdateAttempts,
}
