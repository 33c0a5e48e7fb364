//! Domain error taxonomy.

use common::ProductId;
use store::{OrderStatus, StoreError};
use thiserror::Error;

/// Errors that can occur during commerce operations.
///
/// Business-rule failures are deterministic; [`CommerceError::Store`] is
/// the retryable class (transaction aborts, timeouts).
#[derive(Debug, Error)]
pub enum CommerceError {
    /// A referenced product, address, order or cart line does not exist
    /// (or is not visible to the caller).
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness or allocation conflict.
    #[error("{0}")]
    Conflict(String),

    /// The operation is illegal for the order's current status.
    #[error("Invalid state transition: cannot {action} from {current} state")]
    InvalidState {
        current: OrderStatus,
        action: &'static str,
    },

    /// The requested or merged quantity exceeds live stock.
    #[error("Only {available} unit(s) of {product_name} are available")]
    InsufficientStock {
        product_id: ProductId,
        product_name: String,
        available: i64,
    },

    /// A requested quantity below 1.
    #[error("Invalid quantity: {quantity} (must be at least 1)")]
    InvalidQuantity { quantity: u32 },

    /// Order placement attempted against a cart with zero lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Neither a user id nor a guest token identifies the shopper.
    #[error("A cart identity requires a user id or a guest token")]
    InvalidIdentity,

    /// A storage failure; safe to retry.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for commerce operations.
pub type Result<T> = std::result::Result<T, CommerceError>;

impl CommerceError {
    /// Builds the stock error for a product, naming it for the shopper.
    pub(crate) fn insufficient_stock(
        product_id: ProductId,
        product_name: impl Into<String>,
        available: i64,
    ) -> Self {
        CommerceError::InsufficientStock {
            product_id,
            product_name: product_name.into(),
            available,
        }
    }
}
