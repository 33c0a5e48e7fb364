//! Cart resolution and line operations.
//!
//! Stock checks here are advisory: they improve the shopper experience but
//! the authoritative gate is order placement, which re-validates every
//! line under its own transaction.

use common::ProductId;
use store::{CartOwner, CartRecord, CommerceStore, StoreTx};

use crate::cart::view::CartView;
use crate::error::{CommerceError, Result};
use crate::identity::ShopperIdentity;

/// Service owning cart resolution and mutation.
pub struct CartService<S: CommerceStore> {
    store: S,
}

impl<S: CommerceStore> CartService<S> {
    /// Creates a new cart service backed by the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Finds the cart for an identity, creating it on first access.
    pub(crate) async fn resolve_cart_tx(
        tx: &mut S::Tx,
        identity: &ShopperIdentity,
    ) -> Result<CartRecord> {
        let existing = match identity {
            ShopperIdentity::User(user_id) => tx.cart_by_user(*user_id).await?,
            ShopperIdentity::Guest(token) => tx.cart_by_guest(token).await?,
        };

        match existing {
            Some(cart) => Ok(cart),
            None => {
                let owner = match identity {
                    ShopperIdentity::User(user_id) => CartOwner::User(*user_id),
                    ShopperIdentity::Guest(token) => CartOwner::Guest(token.clone()),
                };
                Ok(tx.create_cart(owner).await?)
            }
        }
    }

    /// Joins a cart's lines with their product rows and computes the
    /// summary. Lines whose product row has vanished are omitted.
    pub(crate) async fn load_view(tx: &mut S::Tx, cart: &CartRecord) -> Result<CartView> {
        let lines = tx.cart_lines(cart.id).await?;
        let mut entries = Vec::with_capacity(lines.len());
        for line in lines {
            if let Some(product) = tx.product(&line.product_id).await? {
                entries.push((line, product));
            }
        }
        Ok(CartView::build(cart.id, entries))
    }

    /// Returns the resolved cart with its computed summary.
    #[tracing::instrument(skip(self))]
    pub async fn view(&self, identity: &ShopperIdentity) -> Result<CartView> {
        let mut tx = self.store.begin().await?;
        let cart = Self::resolve_cart_tx(&mut tx, identity).await?;
        let view = Self::load_view(&mut tx, &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Adds a product to the cart, incrementing the quantity if a line for
    /// it already exists. No stock is reserved.
    #[tracing::instrument(skip(self))]
    pub async fn add_line(
        &self,
        identity: &ShopperIdentity,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartView> {
        if quantity < 1 {
            return Err(CommerceError::InvalidQuantity { quantity });
        }

        let mut tx = self.store.begin().await?;
        let cart = Self::resolve_cart_tx(&mut tx, identity).await?;

        let product = tx
            .product(product_id)
            .await?
            .filter(|p| p.is_active())
            .ok_or_else(|| CommerceError::NotFound(format!("Product {product_id}")))?;

        if product.stock < 1 {
            return Err(CommerceError::insufficient_stock(
                product.id.clone(),
                &product.name,
                product.stock,
            ));
        }

        let new_quantity = match tx.cart_line(cart.id, product_id).await? {
            Some(existing) => existing.quantity + quantity,
            None => quantity,
        };

        // No partial apply: an existing line stays untouched on failure.
        if i64::from(new_quantity) > product.stock {
            return Err(CommerceError::insufficient_stock(
                product.id.clone(),
                &product.name,
                product.stock,
            ));
        }

        tx.put_cart_line(cart.id, product_id, new_quantity).await?;
        let view = Self::load_view(&mut tx, &cart).await?;
        tx.commit().await?;

        metrics::counter!("cart_lines_added_total").increment(1);
        Ok(view)
    }

    /// Sets a line to an exact quantity; zero removes the line.
    ///
    /// Stock is re-checked live, not against what was available when the
    /// line was first added.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        identity: &ShopperIdentity,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartView> {
        let mut tx = self.store.begin().await?;
        let cart = Self::resolve_cart_tx(&mut tx, identity).await?;

        if tx.cart_line(cart.id, product_id).await?.is_none() {
            return Err(CommerceError::NotFound(format!("Cart line for {product_id}")));
        }

        if quantity == 0 {
            tx.delete_cart_line(cart.id, product_id).await?;
        } else {
            let product = tx
                .product(product_id)
                .await?
                .ok_or_else(|| CommerceError::NotFound(format!("Product {product_id}")))?;

            if i64::from(quantity) > product.stock {
                return Err(CommerceError::insufficient_stock(
                    product.id.clone(),
                    &product.name,
                    product.stock,
                ));
            }

            tx.put_cart_line(cart.id, product_id, quantity).await?;
        }

        let view = Self::load_view(&mut tx, &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Removes a line from the cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_line(
        &self,
        identity: &ShopperIdentity,
        product_id: &ProductId,
    ) -> Result<CartView> {
        let mut tx = self.store.begin().await?;
        let cart = Self::resolve_cart_tx(&mut tx, identity).await?;

        if !tx.delete_cart_line(cart.id, product_id).await? {
            return Err(CommerceError::NotFound(format!("Cart line for {product_id}")));
        }

        let view = Self::load_view(&mut tx, &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Removes all lines; the cart row itself persists.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, identity: &ShopperIdentity) -> Result<CartView> {
        let mut tx = self.store.begin().await?;
        let cart = Self::resolve_cart_tx(&mut tx, identity).await?;
        tx.clear_cart_lines(cart.id).await?;
        let view = Self::load_view(&mut tx, &cart).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }
}
