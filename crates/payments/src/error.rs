//! Payment error types.

use domain::CommerceError;
use thiserror::Error;

/// Errors that can occur while coordinating with the payment collaborator.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The gateway rejected or failed the request.
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    /// The order cannot start a payment in its current state.
    #[error("Order not payable: {0}")]
    NotPayable(String),

    /// Domain error.
    #[error("Commerce error: {0}")]
    Commerce(#[from] CommerceError),
}

/// Convenience type alias for payment results.
pub type Result<T> = std::result::Result<T, PaymentError>;
