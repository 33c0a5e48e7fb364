//! HTTP route handlers.

pub mod cart;
pub mod checkout;
pub mod health;
pub mod metrics;
pub mod orders;
pub mod webhooks;

use axum::http::HeaderMap;
use common::{GuestToken, UserId};
use domain::ShopperIdentity;

use crate::error::ApiError;

/// Header carrying the authenticated user id, set by the upstream auth
/// collaborator.
pub const USER_HEADER: &str = "x-user-id";

/// Header carrying the client-minted guest cart token.
pub const GUEST_HEADER: &str = "x-guest-token";

/// Reads the authenticated user id, if the request carries one.
pub(crate) fn optional_user(headers: &HeaderMap) -> Result<Option<UserId>, ApiError> {
    let Some(value) = headers.get(USER_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {USER_HEADER} header")))?;
    let uuid = uuid::Uuid::parse_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {USER_HEADER} header: {e}")))?;
    Ok(Some(UserId::from_uuid(uuid)))
}

/// Reads the guest token, if the request carries one.
pub(crate) fn optional_guest(headers: &HeaderMap) -> Option<GuestToken> {
    headers
        .get(GUEST_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(GuestToken::new)
}

/// Resolves the shopper identity for cart operations.
pub(crate) fn shopper_identity(headers: &HeaderMap) -> Result<ShopperIdentity, ApiError> {
    let user_id = optional_user(headers)?;
    let guest = optional_guest(headers);
    ShopperIdentity::resolve(user_id, guest).map_err(ApiError::from)
}

/// Requires an authenticated user for operations guests cannot perform.
pub(crate) fn require_user(headers: &HeaderMap) -> Result<UserId, ApiError> {
    optional_user(headers)?
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))
}
