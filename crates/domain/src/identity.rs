//! Shopper identity resolution.

use common::{GuestToken, UserId};

use crate::error::{CommerceError, Result};

/// The identity a cart operation acts on behalf of.
///
/// Exactly one cart resolves per identity; the cart is created lazily on
/// first access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShopperIdentity {
    /// An authenticated user.
    User(UserId),
    /// An anonymous shopper holding a client-minted guest token.
    Guest(GuestToken),
}

impl ShopperIdentity {
    /// Resolves the identity from the optional credentials on a request.
    ///
    /// When both are present the authenticated identity wins; the guest
    /// token is only honored by the explicit cart-merge operation.
    pub fn resolve(user_id: Option<UserId>, guest_token: Option<GuestToken>) -> Result<Self> {
        match (user_id, guest_token) {
            (Some(user_id), _) => Ok(ShopperIdentity::User(user_id)),
            (None, Some(token)) => Ok(ShopperIdentity::Guest(token)),
            (None, None) => Err(CommerceError::InvalidIdentity),
        }
    }
}
