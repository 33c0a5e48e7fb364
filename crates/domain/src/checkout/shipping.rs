//! Flat shipping fee table.

use common::Money;
use serde::{Deserialize, Serialize};

/// Delivery option chosen at checkout.
///
/// Fees are flat amounts keyed by option, not distance or weight based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryOption {
    Express,
    Normal,
}

impl DeliveryOption {
    /// Maps a client-supplied tag to an option; anything that is not
    /// `express` ships at the normal rate.
    pub fn from_tag(tag: &str) -> Self {
        if tag == "express" {
            DeliveryOption::Express
        } else {
            DeliveryOption::Normal
        }
    }

    /// Returns the option name as stored on orders.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryOption::Express => "express",
            DeliveryOption::Normal => "normal",
        }
    }

    /// Returns the flat shipping fee for this option.
    pub fn shipping_fee(&self) -> Money {
        match self {
            DeliveryOption::Express => Money::from_major(180),
            DeliveryOption::Normal => Money::from_major(120),
        }
    }
}

impl std::fmt::Display for DeliveryOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
