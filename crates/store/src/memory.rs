use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::{AddressId, CartId, GuestToken, OrderId, ProductId, UserId};
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use crate::{
    AddressRecord, CartLineRecord, CartOwner, CartRecord, NewOrder, OrderLineRecord, OrderRecord,
    OrderStatus, PaymentStatus, ProductRecord, Result, StoreError,
    store::{CommerceStore, StoreTx},
};

/// In-memory commerce store for testing and development.
///
/// Provides the same interface as the PostgreSQL implementation. A
/// transaction holds the store's write lock for its whole lifetime, so
/// concurrent transactions serialize; commit swaps in the working copy,
/// dropping without commit discards it.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    products: HashMap<ProductId, ProductRecord>,
    carts: Vec<CartRecord>,
    cart_lines: Vec<CartLineRecord>,
    addresses: HashMap<AddressId, AddressRecord>,
    orders: Vec<OrderRecord>,
    order_lines: Vec<OrderLineRecord>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a product row outside any transaction.
    pub async fn seed_product(&self, product: ProductRecord) {
        self.state
            .write()
            .await
            .products
            .insert(product.id.clone(), product);
    }

    /// Seeds an address row outside any transaction.
    pub async fn seed_address(&self, address: AddressRecord) {
        self.state.write().await.addresses.insert(address.id, address);
    }

    /// Returns a product's current stock, if the product exists.
    pub async fn product_stock(&self, id: &ProductId) -> Option<i64> {
        self.state.read().await.products.get(id).map(|p| p.stock)
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the total number of cart rows stored.
    pub async fn cart_count(&self) -> usize {
        self.state.read().await.carts.len()
    }
}

/// An in-memory transaction: an exclusive working copy of the store state.
pub struct InMemoryTx {
    guard: OwnedRwLockWriteGuard<StoreState>,
    working: StoreState,
}

#[async_trait]
impl CommerceStore for InMemoryStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<InMemoryTx> {
        let guard = self.state.clone().write_owned().await;
        let working = guard.clone();
        Ok(InMemoryTx { guard, working })
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn product(&mut self, id: &ProductId) -> Result<Option<ProductRecord>> {
        Ok(self.working.products.get(id).cloned())
    }

    async fn product_for_update(&mut self, id: &ProductId) -> Result<Option<ProductRecord>> {
        // The transaction already holds the store exclusively.
        Ok(self.working.products.get(id).cloned())
    }

    async fn upsert_product(&mut self, product: &ProductRecord) -> Result<()> {
        self.working
            .products
            .insert(product.id.clone(), product.clone());
        Ok(())
    }

    async fn decrement_stock(&mut self, id: &ProductId, quantity: u32) -> Result<bool> {
        match self.working.products.get_mut(id) {
            Some(product) if product.stock >= i64::from(quantity) => {
                product.stock -= i64::from(quantity);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_stock(&mut self, id: &ProductId, quantity: u32) -> Result<()> {
        if let Some(product) = self.working.products.get_mut(id) {
            product.stock += i64::from(quantity);
        }
        Ok(())
    }

    async fn cart_by_user(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        Ok(self
            .working
            .carts
            .iter()
            .find(|c| c.owner == CartOwner::User(user_id))
            .cloned())
    }

    async fn cart_by_guest(&mut self, token: &GuestToken) -> Result<Option<CartRecord>> {
        Ok(self
            .working
            .carts
            .iter()
            .find(|c| matches!(&c.owner, CartOwner::Guest(t) if t == token))
            .cloned())
    }

    async fn create_cart(&mut self, owner: CartOwner) -> Result<CartRecord> {
        let cart = CartRecord {
            id: CartId::new(),
            owner,
        };
        self.working.carts.push(cart.clone());
        Ok(cart)
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLineRecord>> {
        Ok(self
            .working
            .cart_lines
            .iter()
            .filter(|l| l.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn cart_line(
        &mut self,
        cart_id: CartId,
        product_id: &ProductId,
    ) -> Result<Option<CartLineRecord>> {
        Ok(self
            .working
            .cart_lines
            .iter()
            .find(|l| l.cart_id == cart_id && &l.product_id == product_id)
            .cloned())
    }

    async fn put_cart_line(
        &mut self,
        cart_id: CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<()> {
        if let Some(line) = self
            .working
            .cart_lines
            .iter_mut()
            .find(|l| l.cart_id == cart_id && &l.product_id == product_id)
        {
            line.quantity = quantity;
        } else {
            self.working.cart_lines.push(CartLineRecord {
                cart_id,
                product_id: product_id.clone(),
                quantity,
            });
        }
        Ok(())
    }

    async fn delete_cart_line(&mut self, cart_id: CartId, product_id: &ProductId) -> Result<bool> {
        let before = self.working.cart_lines.len();
        self.working
            .cart_lines
            .retain(|l| !(l.cart_id == cart_id && &l.product_id == product_id));
        Ok(self.working.cart_lines.len() < before)
    }

    async fn clear_cart_lines(&mut self, cart_id: CartId) -> Result<()> {
        self.working.cart_lines.retain(|l| l.cart_id != cart_id);
        Ok(())
    }

    async fn delete_cart(&mut self, cart_id: CartId) -> Result<()> {
        self.working.cart_lines.retain(|l| l.cart_id != cart_id);
        self.working.carts.retain(|c| c.id != cart_id);
        Ok(())
    }

    async fn address(&mut self, id: AddressId, user_id: UserId) -> Result<Option<AddressRecord>> {
        Ok(self
            .working
            .addresses
            .get(&id)
            .filter(|a| a.user_id == user_id)
            .cloned())
    }

    async fn upsert_address(&mut self, address: &AddressRecord) -> Result<()> {
        self.working.addresses.insert(address.id, address.clone());
        Ok(())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<()> {
        if self
            .working
            .orders
            .iter()
            .any(|o| o.order_number == order.order.order_number)
        {
            return Err(StoreError::DuplicateOrderNumber {
                order_number: order.order.order_number.clone(),
            });
        }
        self.working.orders.push(order.order.clone());
        self.working.order_lines.extend(order.lines.iter().cloned());
        Ok(())
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        Ok(self.working.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLineRecord>> {
        Ok(self
            .working
            .order_lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<OrderRecord>> {
        Ok(self
            .working
            .orders
            .iter()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<()> {
        if let Some(order) = self.working.orders.iter_mut().find(|o| o.id == id) {
            order.status = status;
        }
        Ok(())
    }

    async fn set_payment_status(&mut self, id: OrderId, status: PaymentStatus) -> Result<()> {
        if let Some(order) = self.working.orders.iter_mut().find(|o| o.id == id) {
            order.payment_status = status;
        }
        Ok(())
    }

    async fn commit(mut self) -> Result<()> {
        *self.guard = self.working;
        Ok(())
    }
}
