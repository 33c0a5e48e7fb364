//! Order lifecycle service.
//!
//! Orders are immutable after placement except for `status` and
//! `payment_status`. Cancellation is the only transition with a stock side
//! effect: it restores exactly what placement decremented, in one
//! transaction.

use common::{OrderId, UserId};
use store::{CommerceStore, OrderRecord, OrderStatus, PaymentStatus, StoreTx};

use crate::error::{CommerceError, Result};
use crate::order::OrderDetails;

/// Service for querying and progressing orders after placement.
pub struct OrderService<S: CommerceStore> {
    store: S,
}

impl<S: CommerceStore> OrderService<S> {
    /// Creates a new order service backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn owned_order(
        tx: &mut S::Tx,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderRecord> {
        tx.order(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or_else(|| CommerceError::NotFound(format!("Order {order_id}")))
    }

    /// Loads an order with its line snapshots, scoped to its owner.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderDetails> {
        let mut tx = self.store.begin().await?;
        let order = Self::owned_order(&mut tx, user_id, order_id).await?;
        let lines = tx.order_lines(order_id).await?;
        tx.commit().await?;
        Ok(OrderDetails { order, lines })
    }

    /// Lists a user's orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<OrderRecord>> {
        let mut tx = self.store.begin().await?;
        let orders = tx.orders_for_user(user_id).await?;
        tx.commit().await?;
        Ok(orders)
    }

    /// Cancels a pending order, restoring each line's stock.
    ///
    /// The restock is the exact inverse of placement's decrement and is
    /// applied fully or not at all.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<OrderDetails> {
        let mut tx = self.store.begin().await?;
        let mut order = Self::owned_order(&mut tx, user_id, order_id).await?;

        if !order.status.can_cancel() {
            return Err(CommerceError::InvalidState {
                current: order.status,
                action: "cancel",
            });
        }

        let lines = tx.order_lines(order_id).await?;
        for line in &lines {
            tx.increment_stock(&line.product_id, line.quantity).await?;
        }
        tx.set_order_status(order_id, OrderStatus::Cancelled).await?;
        tx.commit().await?;

        metrics::counter!("orders_cancelled_total").increment(1);

        order.status = OrderStatus::Cancelled;
        Ok(OrderDetails { order, lines })
    }

    /// Moves an order forward along the fulfilment track
    /// (confirmed/processing/shipped/delivered). Admin-driven; stock was
    /// already committed at placement, so there are no side effects.
    #[tracing::instrument(skip(self))]
    pub async fn advance_status(&self, order_id: OrderId, to: OrderStatus) -> Result<OrderRecord> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .order(order_id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("Order {order_id}")))?;

        if !order.status.can_advance_to(to) {
            return Err(CommerceError::InvalidState {
                current: order.status,
                action: "advance",
            });
        }

        tx.set_order_status(order_id, to).await?;
        tx.commit().await?;

        order.status = to;
        Ok(order)
    }

    /// Records a verified payment success, confirming a pending order.
    /// Repeated notifications are idempotent.
    #[tracing::instrument(skip(self))]
    pub async fn mark_paid(&self, order_id: OrderId) -> Result<OrderRecord> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .order(order_id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("Order {order_id}")))?;

        if order.payment_status == PaymentStatus::Paid {
            return Ok(order);
        }

        tx.set_payment_status(order_id, PaymentStatus::Paid).await?;
        if order.status == OrderStatus::Pending {
            tx.set_order_status(order_id, OrderStatus::Confirmed).await?;
            order.status = OrderStatus::Confirmed;
        }
        tx.commit().await?;

        order.payment_status = PaymentStatus::Paid;
        Ok(order)
    }

    /// Records a verified payment failure.
    #[tracing::instrument(skip(self))]
    pub async fn mark_payment_failed(&self, order_id: OrderId) -> Result<OrderRecord> {
        let mut tx = self.store.begin().await?;
        let mut order = tx
            .order(order_id)
            .await?
            .ok_or_else(|| CommerceError::NotFound(format!("Order {order_id}")))?;

        if order.payment_status == PaymentStatus::Paid {
            return Err(CommerceError::Conflict(format!(
                "Order {order_id} is already paid"
            )));
        }

        tx.set_payment_status(order_id, PaymentStatus::Failed).await?;
        tx.commit().await?;

        order.payment_status = PaymentStatus::Failed;
        Ok(order)
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use common::{AddressId, Money, ProductId};
    use store::{AddressRecord, InMemoryStore, ProductRecord, ProductStatus};

    use super::*;
    use crate::cart::CartService;
    use crate::checkout::{CheckoutService, DeliveryOption, NoDiscount, PlaceOrder};
    use crate::identity::ShopperIdentity;

    struct Fixture {
        store: InMemoryStore,
        orders: OrderService<InMemoryStore>,
        user_id: UserId,
    }

    async fn placed_order(line_quantities: &[(&str, i64, u32)]) -> (Fixture, OrderDetails) {
        let store = InMemoryStore::new();
        let user_id = UserId::new();

        for (sku, stock, _) in line_quantities {
            store
                .seed_product(ProductRecord {
                    id: ProductId::new(*sku),
                    name: format!("Product {sku}"),
                    price: Money::from_major(50),
                    discount_price: None,
                    stock: *stock,
                    status: ProductStatus::Active,
                })
                .await;
        }

        let address = AddressRecord {
            id: AddressId::new(),
            user_id,
            recipient: "Jordan Doe".to_string(),
            phone: "555-0100".to_string(),
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
        };
        let address_id = address.id;
        store.seed_address(address).await;

        let carts = CartService::new(store.clone());
        let identity = ShopperIdentity::User(user_id);
        for (sku, _, quantity) in line_quantities {
            carts
                .add_line(&identity, &ProductId::new(*sku), *quantity)
                .await
                .unwrap();
        }

        let checkout = CheckoutService::new(store.clone(), Arc::new(NoDiscount));
        let details = checkout
            .place_order(PlaceOrder::new(
                user_id,
                address_id,
                "card",
                DeliveryOption::Normal,
            ))
            .await
            .unwrap();

        (
            Fixture {
                orders: OrderService::new(store.clone()),
                store,
                user_id,
            },
            details,
        )
    }

    #[tokio::test]
    async fn get_order_scopes_to_owner() {
        let (f, details) = placed_order(&[("SKU-A", 10, 2)]).await;

        let fetched = f
            .orders
            .get_order(f.user_id, details.order.id)
            .await
            .unwrap();
        assert_eq!(fetched.order.order_number, details.order.order_number);
        assert_eq!(fetched.lines.len(), 1);

        let result = f.orders.get_order(UserId::new(), details.order.id).await;
        assert!(matches!(result, Err(CommerceError::NotFound(_))));
    }

    #[tokio::test]
    async fn cancel_restores_stock_for_every_line() {
        let (f, details) = placed_order(&[("SKU-A", 10, 2), ("SKU-B", 5, 1)]).await;
        assert_eq!(f.store.product_stock(&ProductId::new("SKU-A")).await, Some(8));
        assert_eq!(f.store.product_stock(&ProductId::new("SKU-B")).await, Some(4));

        let cancelled = f
            .orders
            .cancel_order(f.user_id, details.order.id)
            .await
            .unwrap();

        assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
        assert_eq!(f.store.product_stock(&ProductId::new("SKU-A")).await, Some(10));
        assert_eq!(f.store.product_stock(&ProductId::new("SKU-B")).await, Some(5));
    }

    #[tokio::test]
    async fn cancel_twice_fails_with_invalid_state() {
        let (f, details) = placed_order(&[("SKU-A", 10, 2)]).await;

        f.orders
            .cancel_order(f.user_id, details.order.id)
            .await
            .unwrap();

        let result = f.orders.cancel_order(f.user_id, details.order.id).await;
        assert!(matches!(
            result,
            Err(CommerceError::InvalidState {
                current: OrderStatus::Cancelled,
                ..
            })
        ));

        // The restock is not applied twice.
        assert_eq!(f.store.product_stock(&ProductId::new("SKU-A")).await, Some(10));
    }

    #[tokio::test]
    async fn cancel_non_pending_order_fails() {
        let (f, details) = placed_order(&[("SKU-A", 10, 2)]).await;

        f.orders
            .advance_status(details.order.id, OrderStatus::Confirmed)
            .await
            .unwrap();

        let result = f.orders.cancel_order(f.user_id, details.order.id).await;
        assert!(matches!(
            result,
            Err(CommerceError::InvalidState {
                current: OrderStatus::Confirmed,
                ..
            })
        ));
        assert_eq!(f.store.product_stock(&ProductId::new("SKU-A")).await, Some(8));
    }

    #[tokio::test]
    async fn advance_walks_the_fulfilment_track() {
        let (f, details) = placed_order(&[("SKU-A", 10, 2)]).await;
        let id = details.order.id;

        for status in [
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            let order = f.orders.advance_status(id, status).await.unwrap();
            assert_eq!(order.status, status);
        }

        // No stock side effects along the way.
        assert_eq!(f.store.product_stock(&ProductId::new("SKU-A")).await, Some(8));
    }

    #[tokio::test]
    async fn advance_rejects_backward_transitions() {
        let (f, details) = placed_order(&[("SKU-A", 10, 2)]).await;
        let id = details.order.id;

        f.orders
            .advance_status(id, OrderStatus::Shipped)
            .await
            .unwrap();

        let result = f.orders.advance_status(id, OrderStatus::Confirmed).await;
        assert!(matches!(result, Err(CommerceError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn mark_paid_confirms_pending_order_idempotently() {
        let (f, details) = placed_order(&[("SKU-A", 10, 2)]).await;
        let id = details.order.id;

        let order = f.orders.mark_paid(id).await.unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.status, OrderStatus::Confirmed);

        // A duplicate webhook delivery changes nothing.
        let order = f.orders.mark_paid(id).await.unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn mark_payment_failed_rejects_paid_orders() {
        let (f, details) = placed_order(&[("SKU-A", 10, 2)]).await;
        let id = details.order.id;

        f.orders.mark_paid(id).await.unwrap();
        let result = f.orders.mark_payment_failed(id).await;
        assert!(matches!(result, Err(CommerceError::Conflict(_))));
    }

    #[tokio::test]
    async fn list_orders_is_scoped_and_newest_first() {
        let (f, first) = placed_order(&[("SKU-A", 10, 2)]).await;

        // Place a second order for the same user through a fresh cart.
        let carts = CartService::new(f.store.clone());
        let checkout = CheckoutService::new(f.store.clone(), Arc::new(NoDiscount));
        let identity = ShopperIdentity::User(f.user_id);
        carts
            .add_line(&identity, &ProductId::new("SKU-A"), 1)
            .await
            .unwrap();
        let address = AddressRecord {
            id: AddressId::new(),
            user_id: f.user_id,
            recipient: "Jordan Doe".to_string(),
            phone: "555-0100".to_string(),
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
        };
        f.store.seed_address(address.clone()).await;
        let second = checkout
            .place_order(PlaceOrder::new(
                f.user_id,
                address.id,
                "card",
                DeliveryOption::Normal,
            ))
            .await
            .unwrap();

        let orders = f.orders.list_orders(f.user_id).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, second.order.id);
        assert_eq!(orders[1].id, first.order.id);

        assert!(f.orders.list_orders(UserId::new()).await.unwrap().is_empty());
    }
}
