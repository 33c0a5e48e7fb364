//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::CommerceError;
use payments::PaymentError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Missing or malformed caller identity.
    Unauthorized(String),
    /// Commerce logic error.
    Commerce(CommerceError),
    /// Payment coordination error.
    Payment(PaymentError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Commerce(err) => commerce_error_to_response(err),
            ApiError::Payment(err) => payment_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn commerce_error_to_response(err: CommerceError) -> (StatusCode, String) {
    match &err {
        CommerceError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        CommerceError::Conflict(_)
        | CommerceError::InvalidState { .. }
        | CommerceError::InsufficientStock { .. } => (StatusCode::CONFLICT, err.to_string()),
        CommerceError::InvalidQuantity { .. }
        | CommerceError::EmptyCart
        | CommerceError::InvalidIdentity => (StatusCode::BAD_REQUEST, err.to_string()),
        CommerceError::Store(store_err) => {
            // The retryable class: surfaced distinctly from deterministic
            // business-rule failures.
            tracing::error!(error = %store_err, "storage failure");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Temporary storage failure, please try again".to_string(),
            )
        }
    }
}

fn payment_error_to_response(err: PaymentError) -> (StatusCode, String) {
    match err {
        PaymentError::Gateway(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        PaymentError::NotPayable(_) => (StatusCode::CONFLICT, err.to_string()),
        PaymentError::Commerce(inner) => commerce_error_to_response(inner),
    }
}

impl From<CommerceError> for ApiError {
    fn from(err: CommerceError) -> Self {
        ApiError::Commerce(err)
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        ApiError::Payment(err)
    }
}
