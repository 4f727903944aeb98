//! Subscription plans and their catalogue entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, ValidationError};

/// Billing plan of a premium subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Monthly,
    Yearly,
}

impl Plan {
    /// Price in cents (BRL).
    pub fn price_cents(&self) -> i64 {
        match self {
            Plan::Monthly => 2990,
            Plan::Yearly => 23900,
        }
    }

    /// Checkout item title.
    pub fn title(&self) -> &'static str {
        match self {
            Plan::Monthly => "MonjaPro - Plano Mensal",
            Plan::Yearly => "MonjaPro - Plano Anual",
        }
    }

    /// Checkout item description.
    pub fn description(&self) -> &'static str {
        match self {
            Plan::Monthly => "Acesso premium por 1 mês com renovação automática",
            Plan::Yearly => "Acesso premium por 12 meses com renovação automática",
        }
    }

    /// End of a billing period that starts at `start`.
    pub fn period_end(&self, start: Timestamp) -> Timestamp {
        match self {
            Plan::Monthly => start.add_months(1),
            Plan::Yearly => start.add_years(1),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Monthly => "monthly",
            Plan::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Plan::Monthly),
            "yearly" => Ok(Plan::Yearly),
            other => Err(ValidationError::invalid_format(
                "plano",
                format!("unknown plan '{}', expected monthly or yearly", other),
            )),
        }
    }
}
