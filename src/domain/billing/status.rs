//! Subscription lifecycle status and the provider's payment status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Lifecycle status of a subscription.
///
/// Only ever derived from a payment status fetched from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Created by the checkout flow, or payment still being processed.
    Pending,

    /// Paid; grants premium access until the period end.
    Active,

    /// Payment was rejected or cancelled.
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true if this status grants premium access.
    pub fn has_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" => Ok(SubscriptionStatus::Active),
            "cancelled" => Ok(SubscriptionStatus::Cancelled),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown subscription status '{}'", other),
            )),
        }
    }
}

/// Payment status as reported by Mercado Pago.
///
/// Statuses this service has no rule for are kept verbatim in
/// `Unrecognized` instead of failing the decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderPaymentStatus {
    Approved,
    Rejected,
    Cancelled,
    InProcess,
    Pending,
    Unrecognized(String),
}

impl ProviderPaymentStatus {
    /// Parses the provider's status string. Never fails.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "approved" => Self::Approved,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            "in_process" => Self::InProcess,
            "pending" => Self::Pending,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
            Self::InProcess => "in_process",
            Self::Pending => "pending",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// Subscription status this payment status maps to, if any.
    pub fn target_status(&self) -> Option<SubscriptionStatus> {
        match self {
            Self::Approved => Some(SubscriptionStatus::Active),
            Self::Rejected | Self::Cancelled => Some(SubscriptionStatus::Cancelled),
            Self::InProcess | Self::Pending => Some(SubscriptionStatus::Pending),
            Self::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for ProviderPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProviderPaymentStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderPaymentStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
