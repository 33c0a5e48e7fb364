//! Guest-cart reconciliation at login.
//!
//! Triggered once, with the guest token supplied explicitly by the client
//! after it authenticates; the server performs no implicit discovery.

use common::{GuestToken, UserId};
use store::{CommerceStore, StoreTx};

use crate::cart::service::CartService;
use crate::cart::view::CartView;
use crate::error::Result;
use crate::identity::ShopperIdentity;

impl<S: CommerceStore> CartService<S> {
    /// Folds the guest cart identified by `token` into the user's cart and
    /// retires the guest cart permanently, all in one transaction.
    ///
    /// Conflicting lines keep the larger of the two pre-merge quantities,
    /// clamped to current stock; lines for withdrawn products and lines
    /// that would clamp to zero are skipped. An absent or empty guest cart
    /// makes the merge a no-op returning the user's cart unchanged.
    #[tracing::instrument(skip(self))]
    pub async fn merge_guest_cart(
        &self,
        user_id: UserId,
        token: &GuestToken,
    ) -> Result<CartView> {
        let identity = ShopperIdentity::User(user_id);
        let mut tx = self.store().begin().await?;

        let guest_lines = match tx.cart_by_guest(token).await? {
            Some(guest_cart) => {
                let lines = tx.cart_lines(guest_cart.id).await?;
                if lines.is_empty() {
                    None
                } else {
                    Some((guest_cart, lines))
                }
            }
            None => None,
        };

        let user_cart = Self::resolve_cart_tx(&mut tx, &identity).await?;

        let Some((guest_cart, lines)) = guest_lines else {
            let view = Self::load_view(&mut tx, &user_cart).await?;
            tx.commit().await?;
            return Ok(view);
        };

        for guest_line in &lines {
            // Stale guest carts may reference withdrawn products.
            let Some(product) = tx.product(&guest_line.product_id).await? else {
                continue;
            };
            if !product.is_active() {
                continue;
            }

            let stock_cap = u32::try_from(product.stock.max(0)).unwrap_or(u32::MAX);
            let capped = guest_line.quantity.min(stock_cap);
            if capped < 1 {
                continue;
            }

            let merged = match tx.cart_line(user_cart.id, &guest_line.product_id).await? {
                // Keep the bigger intent, clamped to stock; never summed.
                Some(existing) => existing.quantity.max(guest_line.quantity).min(stock_cap),
                None => capped,
            };

            tx.put_cart_line(user_cart.id, &guest_line.product_id, merged)
                .await?;
        }

        // The guest identity is retired permanently; a new guest session
        // must mint a new token.
        tx.delete_cart(guest_cart.id).await?;

        let view = Self::load_view(&mut tx, &user_cart).await?;
        tx.commit().await?;

        metrics::counter!("cart_merges_total").increment(1);
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use common::{Money, ProductId};
    use store::{InMemoryStore, ProductRecord, ProductStatus};

    use super::*;

    fn product(id: &str, stock: i64, status: ProductStatus) -> ProductRecord {
        ProductRecord {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Money::from_major(50),
            discount_price: None,
            stock,
            status,
        }
    }

    async fn service_with(products: Vec<ProductRecord>) -> CartService<InMemoryStore> {
        let store = InMemoryStore::new();
        for p in products {
            store.seed_product(p).await;
        }
        CartService::new(store)
    }

    #[tokio::test]
    async fn merge_moves_guest_lines_into_user_cart() {
        let service =
            service_with(vec![product("SKU-001", 10, ProductStatus::Active)]).await;
        let user_id = UserId::new();
        let token = GuestToken::new("guest-1");
        let guest = ShopperIdentity::Guest(token.clone());

        service
            .add_line(&guest, &ProductId::new("SKU-001"), 1)
            .await
            .unwrap();

        let view = service.merge_guest_cart(user_id, &token).await.unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].quantity, 1);

        // The guest cart is no longer resolvable.
        let guest_view = service.view(&guest).await.unwrap();
        assert!(guest_view.is_empty());
        assert_ne!(guest_view.cart_id, view.cart_id);
    }

    #[tokio::test]
    async fn merge_conflict_keeps_larger_quantity_clamped_to_stock() {
        let service =
            service_with(vec![product("SKU-001", 10, ProductStatus::Active)]).await;
        let user_id = UserId::new();
        let user = ShopperIdentity::User(user_id);
        let token = GuestToken::new("guest-1");
        let guest = ShopperIdentity::Guest(token.clone());
        let sku = ProductId::new("SKU-001");

        service.add_line(&user, &sku, 2).await.unwrap();
        service.add_line(&guest, &sku, 5).await.unwrap();

        let view = service.merge_guest_cart(user_id, &token).await.unwrap();
        assert_eq!(view.lines[0].quantity, 5);
    }

    #[tokio::test]
    async fn merge_conflict_clamps_to_low_stock() {
        let service =
            service_with(vec![product("SKU-001", 5, ProductStatus::Active)]).await;
        let user_id = UserId::new();
        let user = ShopperIdentity::User(user_id);
        let token = GuestToken::new("guest-1");
        let guest = ShopperIdentity::Guest(token.clone());
        let sku = ProductId::new("SKU-001");

        service.add_line(&user, &sku, 2).await.unwrap();
        service.add_line(&guest, &sku, 5).await.unwrap();

        // Stock drops between add-to-cart and merge.
        service.store().seed_product(product("SKU-001", 3, ProductStatus::Active)).await;

        let view = service.merge_guest_cart(user_id, &token).await.unwrap();
        assert_eq!(view.lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn merge_skips_withdrawn_products() {
        let service = service_with(vec![
            product("SKU-001", 10, ProductStatus::Active),
            product("SKU-002", 10, ProductStatus::Active),
        ])
        .await;
        let user_id = UserId::new();
        let token = GuestToken::new("guest-1");
        let guest = ShopperIdentity::Guest(token.clone());

        service
            .add_line(&guest, &ProductId::new("SKU-001"), 1)
            .await
            .unwrap();
        service
            .add_line(&guest, &ProductId::new("SKU-002"), 2)
            .await
            .unwrap();

        // SKU-002 is withdrawn before the merge.
        service
            .store()
            .seed_product(product("SKU-002", 10, ProductStatus::Inactive))
            .await;

        let view = service.merge_guest_cart(user_id, &token).await.unwrap();
        let skus: Vec<_> = view.lines.iter().map(|l| l.product_id.as_str()).collect();
        assert_eq!(skus, ["SKU-001"]);
    }

    #[tokio::test]
    async fn merge_skips_lines_clamped_to_zero() {
        let service =
            service_with(vec![product("SKU-001", 5, ProductStatus::Active)]).await;
        let user_id = UserId::new();
        let user = ShopperIdentity::User(user_id);
        let token = GuestToken::new("guest-1");
        let guest = ShopperIdentity::Guest(token.clone());
        let sku = ProductId::new("SKU-001");

        service.add_line(&user, &sku, 2).await.unwrap();
        service.add_line(&guest, &sku, 5).await.unwrap();

        // Sold out entirely: the guest line is skipped, the user line is
        // left at its pre-merge quantity.
        service
            .store()
            .seed_product(product("SKU-001", 0, ProductStatus::Active))
            .await;

        let view = service.merge_guest_cart(user_id, &token).await.unwrap();
        assert_eq!(view.lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn merge_with_absent_guest_cart_is_noop() {
        let service =
            service_with(vec![product("SKU-001", 10, ProductStatus::Active)]).await;
        let user_id = UserId::new();
        let user = ShopperIdentity::User(user_id);

        service
            .add_line(&user, &ProductId::new("SKU-001"), 2)
            .await
            .unwrap();

        let view = service
            .merge_guest_cart(user_id, &GuestToken::new("never-seen"))
            .await
            .unwrap();
        assert_eq!(view.lines[0].quantity, 2);
    }

    #[tokio::test]
    async fn merge_with_empty_guest_cart_is_noop() {
        let service =
            service_with(vec![product("SKU-001", 10, ProductStatus::Active)]).await;
        let user_id = UserId::new();
        let token = GuestToken::new("guest-1");
        let guest = ShopperIdentity::Guest(token.clone());

        // Touch the guest cart so the row exists, then empty it.
        service
            .add_line(&guest, &ProductId::new("SKU-001"), 1)
            .await
            .unwrap();
        service.clear(&guest).await.unwrap();

        let view = service.merge_guest_cart(user_id, &token).await.unwrap();
        assert!(view.is_empty());
    }

    #[tokio::test]
    async fn merge_handles_mixed_conflict_and_fresh_lines() {
        let service = service_with(vec![
            product("SKU-001", 10, ProductStatus::Active),
            product("SKU-002", 10, ProductStatus::Active),
        ])
        .await;
        let user_id = UserId::new();
        let user = ShopperIdentity::User(user_id);
        let token = GuestToken::new("guest-1");
        let guest = ShopperIdentity::Guest(token.clone());

        service
            .add_line(&user, &ProductId::new("SKU-001"), 4)
            .await
            .unwrap();
        service
            .add_line(&guest, &ProductId::new("SKU-001"), 2)
            .await
            .unwrap();
        service
            .add_line(&guest, &ProductId::new("SKU-002"), 3)
            .await
            .unwrap();

        let view = service.merge_guest_cart(user_id, &token).await.unwrap();
        assert_eq!(view.lines.len(), 2);

        let quantity_of = |sku: &str| {
            view.lines
                .iter()
                .find(|l| l.product_id.as_str() == sku)
                .unwrap()
                .quantity
        };
        // Larger pre-merge intent wins for the conflict.
        assert_eq!(quantity_of("SKU-001"), 4);
        assert_eq!(quantity_of("SKU-002"), 3);
    }
}
