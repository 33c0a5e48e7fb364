use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AddressId, CartId, GuestToken, Money, OrderId, ProductId, UserId};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AddressRecord, CartLineRecord, CartOwner, CartRecord, NewOrder, OrderLineRecord, OrderRecord,
    OrderStatus, PaymentStatus, ProductRecord, ProductStatus, Result, StoreError,
    store::{CommerceStore, StoreTx},
};

/// PostgreSQL-backed commerce store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL commerce store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        tracing::info!("running database migrations");
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

/// One PostgreSQL transaction over the commerce tables.
pub struct PostgresTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl CommerceStore for PostgresStore {
    type Tx = PostgresTx;

    async fn begin(&self) -> Result<PostgresTx> {
        let tx = self.pool.begin().await?;
        Ok(PostgresTx { tx })
    }
}

fn row_to_product(row: &PgRow) -> Result<ProductRecord> {
    let status_raw: String = row.try_get("status")?;
    let status =
        ProductStatus::parse(&status_raw).ok_or_else(|| StoreError::InvalidColumn {
            column: "status",
            value: status_raw,
        })?;

    Ok(ProductRecord {
        id: ProductId::new(row.try_get::<String, _>("id")?),
        name: row.try_get("name")?,
        price: Money::new(row.try_get::<Decimal, _>("price")?),
        discount_price: row
            .try_get::<Option<Decimal>, _>("discount_price")?
            .map(Money::new),
        stock: row.try_get("stock")?,
        status,
    })
}

fn row_to_cart(row: &PgRow) -> Result<CartRecord> {
    let user_id: Option<Uuid> = row.try_get("user_id")?;
    let guest_token: Option<String> = row.try_get("guest_token")?;

    let owner = match (user_id, guest_token) {
        (Some(user_id), None) => CartOwner::User(UserId::from_uuid(user_id)),
        (None, Some(token)) => CartOwner::Guest(GuestToken::new(token)),
        (user_id, _) => {
            // The CHECK constraint makes this unreachable for committed rows.
            return Err(StoreError::InvalidColumn {
                column: "user_id/guest_token",
                value: format!("{user_id:?}"),
            });
        }
    };

    Ok(CartRecord {
        id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
        owner,
    })
}

fn row_to_cart_line(row: &PgRow) -> Result<CartLineRecord> {
    Ok(CartLineRecord {
        cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
        product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
        quantity: row.try_get::<i64, _>("quantity")? as u32,
    })
}

fn row_to_address(row: &PgRow) -> Result<AddressRecord> {
    Ok(AddressRecord {
        id: AddressId::from_uuid(row.try_get::<Uuid, _>("id")?),
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        recipient: row.try_get("recipient")?,
        phone: row.try_get("phone")?,
        line1: row.try_get("line1")?,
        line2: row.try_get("line2")?,
        city: row.try_get("city")?,
        postal_code: row.try_get("postal_code")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<OrderRecord> {
    let status_raw: String = row.try_get("status")?;
    let status = OrderStatus::parse(&status_raw).ok_or_else(|| StoreError::InvalidColumn {
        column: "status",
        value: status_raw,
    })?;

    let payment_raw: String = row.try_get("payment_status")?;
    let payment_status =
        PaymentStatus::parse(&payment_raw).ok_or_else(|| StoreError::InvalidColumn {
            column: "payment_status",
            value: payment_raw,
        })?;

    Ok(OrderRecord {
        id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
        order_number: row.try_get("order_number")?,
        user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
        status,
        payment_status,
        payment_method: row.try_get("payment_method")?,
        delivery_option: row.try_get("delivery_option")?,
        subtotal: Money::new(row.try_get::<Decimal, _>("subtotal")?),
        shipping_fee: Money::new(row.try_get::<Decimal, _>("shipping_fee")?),
        discount: Money::new(row.try_get::<Decimal, _>("discount")?),
        grand_total: Money::new(row.try_get::<Decimal, _>("grand_total")?),
        shipping_address: serde_json::from_value(row.try_get("shipping_address")?)?,
        billing_address: serde_json::from_value(row.try_get("billing_address")?)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn row_to_order_line(row: &PgRow) -> Result<OrderLineRecord> {
    Ok(OrderLineRecord {
        order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
        product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
        product_name: row.try_get("product_name")?,
        quantity: row.try_get::<i64, _>("quantity")? as u32,
        unit_price: Money::new(row.try_get::<Decimal, _>("unit_price")?),
        unit_discount: Money::new(row.try_get::<Decimal, _>("unit_discount")?),
    })
}

#[async_trait]
impl StoreTx for PostgresTx {
    async fn product(&mut self, id: &ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query(
            "SELECT id, name, price, discount_price, stock, status FROM products WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn product_for_update(&mut self, id: &ProductId) -> Result<Option<ProductRecord>> {
        let row = sqlx::query(
            "SELECT id, name, price, discount_price, stock, status FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn upsert_product(&mut self, product: &ProductRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, discount_price, stock, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                discount_price = EXCLUDED.discount_price,
                stock = EXCLUDED.stock,
                status = EXCLUDED.status
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(product.price.amount())
        .bind(product.discount_price.map(|m| m.amount()))
        .bind(product.stock)
        .bind(product.status.as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn decrement_stock(&mut self, id: &ProductId, quantity: u32) -> Result<bool> {
        let result =
            sqlx::query("UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2")
                .bind(id.as_str())
                .bind(i64::from(quantity))
                .execute(&mut *self.tx)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn increment_stock(&mut self, id: &ProductId, quantity: u32) -> Result<()> {
        sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(i64::from(quantity))
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn cart_by_user(&mut self, user_id: UserId) -> Result<Option<CartRecord>> {
        let row = sqlx::query("SELECT id, user_id, guest_token FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_cart).transpose()
    }

    async fn cart_by_guest(&mut self, token: &GuestToken) -> Result<Option<CartRecord>> {
        let row = sqlx::query("SELECT id, user_id, guest_token FROM carts WHERE guest_token = $1")
            .bind(token.as_str())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(row_to_cart).transpose()
    }

    async fn create_cart(&mut self, owner: CartOwner) -> Result<CartRecord> {
        let id = CartId::new();
        let (user_id, guest_token) = match &owner {
            CartOwner::User(user_id) => (Some(user_id.as_uuid()), None),
            CartOwner::Guest(token) => (None, Some(token.as_str().to_string())),
        };

        sqlx::query("INSERT INTO carts (id, user_id, guest_token) VALUES ($1, $2, $3)")
            .bind(id.as_uuid())
            .bind(user_id)
            .bind(guest_token)
            .execute(&mut *self.tx)
            .await?;

        Ok(CartRecord { id, owner })
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLineRecord>> {
        let rows = sqlx::query(
            "SELECT cart_id, product_id, quantity FROM cart_lines WHERE cart_id = $1 ORDER BY id ASC",
        )
        .bind(cart_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_cart_line).collect()
    }

    async fn cart_line(
        &mut self,
        cart_id: CartId,
        product_id: &ProductId,
    ) -> Result<Option<CartLineRecord>> {
        let row = sqlx::query(
            "SELECT cart_id, product_id, quantity FROM cart_lines WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id.as_uuid())
        .bind(product_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_cart_line).transpose()
    }

    async fn put_cart_line(
        &mut self,
        cart_id: CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cart_lines (cart_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (cart_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
            "#,
        )
        .bind(cart_id.as_uuid())
        .bind(product_id.as_str())
        .bind(i64::from(quantity))
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_cart_line(&mut self, cart_id: CartId, product_id: &ProductId) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1 AND product_id = $2")
                .bind(cart_id.as_uuid())
                .bind(product_id.as_str())
                .execute(&mut *self.tx)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart_lines(&mut self, cart_id: CartId) -> Result<()> {
        sqlx::query("DELETE FROM cart_lines WHERE cart_id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn delete_cart(&mut self, cart_id: CartId) -> Result<()> {
        // cart_lines cascade on delete
        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn address(&mut self, id: AddressId, user_id: UserId) -> Result<Option<AddressRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, recipient, phone, line1, line2, city, postal_code
            FROM addresses
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_address).transpose()
    }

    async fn upsert_address(&mut self, address: &AddressRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO addresses (id, user_id, recipient, phone, line1, line2, city, postal_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                recipient = EXCLUDED.recipient,
                phone = EXCLUDED.phone,
                line1 = EXCLUDED.line1,
                line2 = EXCLUDED.line2,
                city = EXCLUDED.city,
                postal_code = EXCLUDED.postal_code
            "#,
        )
        .bind(address.id.as_uuid())
        .bind(address.user_id.as_uuid())
        .bind(&address.recipient)
        .bind(&address.phone)
        .bind(&address.line1)
        .bind(&address.line2)
        .bind(&address.city)
        .bind(&address.postal_code)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<()> {
        let record = &order.order;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, order_number, user_id, status, payment_status, payment_method,
                delivery_option, subtotal, shipping_fee, discount, grand_total,
                shipping_address, billing_address, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.order_number)
        .bind(record.user_id.as_uuid())
        .bind(record.status.as_str())
        .bind(record.payment_status.as_str())
        .bind(&record.payment_method)
        .bind(&record.delivery_option)
        .bind(record.subtotal.amount())
        .bind(record.shipping_fee.amount())
        .bind(record.discount.amount())
        .bind(record.grand_total.amount())
        .bind(serde_json::to_value(&record.shipping_address)?)
        .bind(serde_json::to_value(&record.billing_address)?)
        .bind(record.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_order_number_key")
            {
                return StoreError::DuplicateOrderNumber {
                    order_number: record.order_number.clone(),
                };
            }
            StoreError::Database(e)
        })?;

        for line in &order.lines {
            sqlx::query(
                r#"
                INSERT INTO order_lines (order_id, product_id, product_name, quantity, unit_price, unit_discount)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(line.order_id.as_uuid())
            .bind(line.product_id.as_str())
            .bind(&line.product_name)
            .bind(i64::from(line.quantity))
            .bind(line.unit_price.amount())
            .bind(line.unit_discount.amount())
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(())
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<OrderRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, order_number, user_id, status, payment_status, payment_method,
                   delivery_option, subtotal, shipping_fee, discount, grand_total,
                   shipping_address, billing_address, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(row_to_order).transpose()
    }

    async fn order_lines(&mut self, order_id: OrderId) -> Result<Vec<OrderLineRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_id, product_name, quantity, unit_price, unit_discount
            FROM order_lines
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_order_line).collect()
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<OrderRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, user_id, status, payment_status, payment_method,
                   delivery_option, subtotal, shipping_fee, discount, grand_total,
                   shipping_address, billing_address, created_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(row_to_order).collect()
    }

    async fn set_order_status(&mut self, id: OrderId, status: OrderStatus) -> Result<()> {
        sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn set_payment_status(&mut self, id: OrderId, status: PaymentStatus) -> Result<()> {
        sqlx::query("UPDATE orders SET payment_status = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(status.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
