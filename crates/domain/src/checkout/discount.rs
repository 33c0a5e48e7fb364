//! Pluggable coupon discount resolution.

use async_trait::async_trait;
use common::Money;

use crate::error::Result;

/// Resolves a coupon code into a discount amount for a cart subtotal.
///
/// The checkout engine treats the resolver as an opaque collaborator; a
/// real coupon subsystem replaces [`NoDiscount`] at the composition root.
#[async_trait]
pub trait DiscountResolver: Send + Sync {
    /// Returns the discount amount to subtract from the order total.
    async fn resolve(&self, code: &str, subtotal: Money) -> Result<Money>;
}

/// Default resolver: accepts any code and applies no discount.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiscount;

#[async_trait]
impl DiscountResolver for NoDiscount {
    async fn resolve(&self, _code: &str, _subtotal: Money) -> Result<Money> {
        Ok(Money::zero())
    }
}
