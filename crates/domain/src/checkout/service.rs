//! The order placement engine.
//!
//! Converts a resolved user cart into an immutable order snapshot,
//! decrementing stock and clearing the cart in one atomic transaction.
//! This is the authoritative consistency boundary: every advisory stock
//! check made at cart time is repeated here under row locks.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use common::{Money, OrderId};
use store::{
    CommerceStore, NewOrder, OrderLineRecord, OrderRecord, OrderStatus, PaymentStatus, StoreError,
    StoreTx,
};

use crate::checkout::{DiscountResolver, PlaceOrder, order_number};
use crate::error::{CommerceError, Result};
use crate::order::OrderDetails;

/// How many fresh order numbers to try before giving up on placement.
const MAX_ORDER_NUMBER_ATTEMPTS: u32 = 5;

/// Service converting carts into orders.
pub struct CheckoutService<S: CommerceStore> {
    store: S,
    discounts: Arc<dyn DiscountResolver>,
}

impl<S: CommerceStore> CheckoutService<S> {
    /// Creates a new checkout service with the given discount resolver.
    pub fn new(store: S, discounts: Arc<dyn DiscountResolver>) -> Self {
        Self { store, discounts }
    }

    /// Places an order from the user's cart.
    ///
    /// Atomic over: stock re-validation, order + line snapshot creation,
    /// stock decrement, cart clearing. On any failure nothing is applied.
    /// An order-number collision restarts the whole transaction with a
    /// fresh number, a bounded number of times.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(&self, cmd: PlaceOrder) -> Result<OrderDetails> {
        let start = Instant::now();

        for _ in 0..MAX_ORDER_NUMBER_ATTEMPTS {
            match self.try_place(&cmd).await {
                Err(CommerceError::Store(StoreError::DuplicateOrderNumber { order_number })) => {
                    tracing::warn!(%order_number, "order number collision, retrying");
                    continue;
                }
                Ok(details) => {
                    metrics::counter!("orders_placed_total").increment(1);
                    metrics::histogram!("checkout_duration_seconds")
                        .record(start.elapsed().as_secs_f64());
                    return Ok(details);
                }
                Err(e) => return Err(e),
            }
        }

        Err(CommerceError::Conflict(
            "Could not allocate a unique order number".to_string(),
        ))
    }

    async fn try_place(&self, cmd: &PlaceOrder) -> Result<OrderDetails> {
        let mut tx = self.store.begin().await?;

        // A user without a cart row has, by definition, an empty cart.
        let cart = tx
            .cart_by_user(cmd.user_id)
            .await?
            .ok_or(CommerceError::EmptyCart)?;
        let lines = tx.cart_lines(cart.id).await?;
        if lines.is_empty() {
            return Err(CommerceError::EmptyCart);
        }

        let order_id = OrderId::new();
        let mut subtotal = Money::zero();
        let mut order_lines = Vec::with_capacity(lines.len());

        for line in &lines {
            let product = tx
                .product_for_update(&line.product_id)
                .await?
                .ok_or_else(|| CommerceError::NotFound(format!("Product {}", line.product_id)))?;

            if product.stock < i64::from(line.quantity) {
                return Err(CommerceError::insufficient_stock(
                    product.id,
                    product.name,
                    product.stock,
                ));
            }

            let unit_price = product.unit_price();
            subtotal += unit_price.times(line.quantity).round_2();

            // Frozen at placement time; never recomputed from live data.
            order_lines.push(OrderLineRecord {
                order_id,
                product_id: line.product_id.clone(),
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price,
                unit_discount: product.unit_discount(),
            });
        }
        let subtotal = subtotal.round_2();

        let shipping_fee = cmd.delivery_option.shipping_fee();
        let discount = match &cmd.coupon_code {
            Some(code) => self.discounts.resolve(code, subtotal).await?,
            None => Money::zero(),
        };
        let grand_total = subtotal + shipping_fee - discount;

        let address = tx
            .address(cmd.address_id, cmd.user_id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("Address {}", cmd.address_id)))?;
        let address_snapshot = address.snapshot();

        let order = OrderRecord {
            id: order_id,
            order_number: order_number::generate(Utc::now()),
            user_id: cmd.user_id,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_method: cmd.payment_method.clone(),
            delivery_option: cmd.delivery_option.as_str().to_string(),
            subtotal,
            shipping_fee,
            discount,
            grand_total,
            shipping_address: address_snapshot.clone(),
            billing_address: address_snapshot,
            created_at: Utc::now(),
        };

        tx.insert_order(&NewOrder {
            order: order.clone(),
            lines: order_lines.clone(),
        })
        .await?;

        // Every line passed the check above, so the decrement set applies
        // all-or-nothing; a zero-row update means a concurrent writer won
        // despite the row lock, and the transaction fails closed.
        for line in &order_lines {
            if !tx.decrement_stock(&line.product_id, line.quantity).await? {
                let available = tx
                    .product(&line.product_id)
                    .await?
                    .map(|p| p.stock)
                    .unwrap_or(0);
                return Err(CommerceError::insufficient_stock(
                    line.product_id.clone(),
                    line.product_name.clone(),
                    available,
                ));
            }
        }

        tx.clear_cart_lines(cart.id).await?;
        tx.commit().await?;

        Ok(OrderDetails {
            order,
            lines: order_lines,
        })
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
