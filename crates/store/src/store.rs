//! Storage traits: a unit-of-work over the commerce tables.
//!
//! Every core operation (cart mutation, merge, placement, cancellation)
//! runs against a single [`StoreTx`] so the final commit is atomic.
//! Dropping a transaction without calling [`StoreTx::commit`] rolls it
//! back.

use async_trait::async_trait;
use common::{AddressId, CartId, GuestToken, OrderId, ProductId, UserId};

use crate::error::Result;
use crate::records::{
    AddressRecord, CartLineRecord, CartOwner, CartRecord, NewOrder, OrderLineRecord, OrderRecord,
    OrderStatus, PaymentStatus, ProductRecord,
};

/// A transactional commerce store.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    /// The transaction type produced by this store.
    type Tx: StoreTx;

    /// Begins a new transaction.
    async fn begin(&self) -> Result<Self::Tx>;
}

/// One transaction against the commerce tables.
#[async_trait]
pub trait StoreTx: Send + Sized {
    // -- Catalog --

    /// Reads a product row.
    async fn product(&mut self, id: &ProductId) -> Result<Option<ProductRecord>>;

    /// Reads a product row, locking it against concurrent writers until
    /// this transaction ends.
    async fn product_for_update(&mut self, id: &ProductId) -> Result<Option<ProductRecord>>;

    /// Inserts or replaces a product row (catalog glue and test seeding).
    async fn upsert_product(&mut self, product: &ProductRecord) -> Result<()>;

    /// Atomically decrements stock if at least `quantity` units remain.
    ///
    /// Returns false when the product is missing or the decrement would
    /// cross zero; in that case no row is changed.
    async fn decrement_stock(&mut self, id: &ProductId, quantity: u32) -> Result<bool>;

    /// Increments stock; the compensating inverse of [`Self::decrement_stock`].
    async fn increment_stock(&mut self, id: &ProductId, quantity: u32) -> Result<()>;

    // -- Carts --

    /// Finds the cart owned by a user.
    async fn cart_by_user(&mut self, user_id: UserId) -> Result<Option<CartRecord>>;

    /// Finds the cart identified by a guest token.
    async fn cart_by_guest(&mut self, token: &GuestToken) -> Result<Option<CartRecord>>;

    /// Creates an empty cart for the given owner.
    async fn create_cart(&mut self, owner: CartOwner) -> Result<CartRecord>;

    /// Lists a cart's lines in insertion order.
    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLineRecord>>;

    /// Reads a single cart line.
    async fn cart_line(
        &mut self,
        cart_id: CartId,
        product_id: &ProductId,
    ) -> Result<Option<CartLineRecord>>;

    /// Sets a cart line to an exact quantity, inserting it if absent.
    async fn put_cart_line(
        &mut self,
        cart_id: CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<()>;

    /// Deletes a cart line; returns false if no such line existed.
    async fn delete_cart_line(&mut self, cart_id: CartId, product_id: &ProductId) -> Result<bool>;

    /// Deletes all lines of a cart; the cart row persists.
    async fn clear_cart_lines(&mut self, cart_id: CartId) -> Result<()>;

    /// Deletes a cart row together with its lines (guest retirement).
    async fn delete_cart(&mut self, cart_id: CartId) -> Result<()>;

    // -- Addresses --

    /// Reads an address owned by the given user.
    async fn address(&mut self, id: AddressId, user_id: UserId) -> Result<Option<AddressRecord>>;

    /// Inserts or replaces an address row (address-book glue and test
    /// seeding).
    async fn upsert_address(&mut self, address: &AddressRecord) -> Result<()>;

    // -- Orders --

    /// Inserts an order together with its line snapshots.
    ///
    /// Fails with [`StoreError::DuplicateOrderNumber`] when the order
    /// number is already taken.
    ///
    /// [`StoreError::DuplicateOrderNumber`]: crate::StoreError::DuplicateOrderNumber
    async fn insert_order(&mut self, order: &NewOrder) -> Result<()>;

    /// Reads an order row.
    async fn order(&mut self, id: OrderId) -> Result<Option<OrderRecord>>;

    /// Lists an order's line snapshots.
    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLineRecord>>;

    /// Lists a user's orders, newest first.
    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<OrderRecord>>;

    /// Updates an order's fulfilment status.
    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<()>;

    /// Updates an order's payment status.
    async fn set_payment_status(&mut self, id: OrderId, status: PaymentStatus) -> Result<()>;

    /// Commits the transaction, making all changes visible atomically.
    async fn commit(self) -> Result<()>;
}
