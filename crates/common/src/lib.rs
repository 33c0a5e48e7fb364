//! Shared identifier and money types for the commerce workspace.

mod ids;
mod money;

pub use ids::{AddressId, CartId, GuestToken, OrderId, ProductId, UserId};
pub use money::Money;
