use thiserror::Error;

/// Errors that can occur when interacting with the commerce store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A generated order number collided with an existing one.
    /// Callers retry with a fresh number.
    #[error("Order number already exists: {order_number}")]
    DuplicateOrderNumber { order_number: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored column held a value the record types cannot represent.
    #[error("Invalid {column} value: {value}")]
    InvalidColumn {
        column: &'static str,
        value: String,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
