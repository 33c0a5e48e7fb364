//! Cart views with computed pricing summaries.

use common::{CartId, Money, ProductId};
use serde::Serialize;
use store::{CartLineRecord, ProductRecord};

/// One cart line joined with its live product pricing.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// The price per unit the shopper would pay now.
    pub unit_price: Money,
    /// `unit_price × quantity`, rounded to two decimals.
    pub line_subtotal: Money,
    /// `(price − discount_price) × quantity` when discounted, else zero;
    /// rounded to two decimals.
    pub line_savings: Money,
}

/// A resolved cart with its computed summary.
///
/// Totals are sums of the already-rounded line values; line-level rounding
/// precedes aggregation, so the subtotal may differ by a cent from a
/// recomputation over aggregate quantities. That is the pricing policy,
/// not an error.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub cart_id: CartId,
    pub lines: Vec<CartLineView>,
    pub subtotal: Money,
    pub savings: Money,
}

impl CartView {
    /// Builds the view from cart lines joined with their product rows.
    pub fn build(cart_id: CartId, entries: Vec<(CartLineRecord, ProductRecord)>) -> Self {
        let lines: Vec<CartLineView> = entries
            .into_iter()
            .map(|(line, product)| {
                let unit_price = product.unit_price();
                let line_subtotal = unit_price.times(line.quantity).round_2();
                let line_savings = if product.discount_price.is_some() {
                    product.unit_discount().times(line.quantity).round_2()
                } else {
                    Money::zero()
                };
                CartLineView {
                    product_id: line.product_id,
                    product_name: product.name,
                    quantity: line.quantity,
                    unit_price,
                    line_subtotal,
                    line_savings,
                }
            })
            .collect();

        let subtotal = lines
            .iter()
            .fold(Money::zero(), |acc, l| acc + l.line_subtotal)
            .round_2();
        let savings = lines
            .iter()
            .fold(Money::zero(), |acc, l| acc + l.line_savings)
            .round_2();

        Self {
            cart_id,
            lines,
            subtotal,
            savings,
        }
    }

    /// Returns true if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}
