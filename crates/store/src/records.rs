//! Typed records for the persisted commerce state.

use chrono::{DateTime, Utc};
use common::{AddressId, CartId, GuestToken, Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

/// Publication state of a catalog product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Visible and purchasable.
    Active,
    /// Not yet published.
    Draft,
    /// Withdrawn from sale.
    Inactive,
}

impl ProductStatus {
    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Draft => "draft",
            ProductStatus::Inactive => "inactive",
        }
    }

    /// Parses a stored status name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(ProductStatus::Active),
            "draft" => Some(ProductStatus::Draft),
            "inactive" => Some(ProductStatus::Inactive),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A catalog product row.
///
/// `stock` is mutated only by order placement (decrement) and order
/// cancellation (increment); it never goes negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    /// Promotional price; must be below `price` when present.
    pub discount_price: Option<Money>,
    pub stock: i64,
    pub status: ProductStatus,
}

impl ProductRecord {
    /// The price a shopper actually pays per unit.
    pub fn unit_price(&self) -> Money {
        self.discount_price.unwrap_or(self.price)
    }

    /// The per-unit reduction granted by the discount price, or zero.
    pub fn unit_discount(&self) -> Money {
        match self.discount_price {
            Some(discounted) => self.price - discounted,
            None => Money::zero(),
        }
    }

    /// Returns true if the product can be added to a cart.
    pub fn is_active(&self) -> bool {
        self.status == ProductStatus::Active
    }
}

/// The identity a cart belongs to: exactly one of a registered user or an
/// anonymous guest token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CartOwner {
    User(UserId),
    Guest(GuestToken),
}

/// A cart row. Lines live in [`CartLineRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartRecord {
    pub id: CartId,
    pub owner: CartOwner,
}

/// One (product, quantity) entry of a cart; unique per product within a
/// cart, quantity always at least 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineRecord {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// An address-book row owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub id: AddressId,
    pub user_id: UserId,
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
}

impl AddressRecord {
    /// Copies the address by value for embedding into an order.
    pub fn snapshot(&self) -> AddressSnapshot {
        AddressSnapshot {
            recipient: self.recipient.clone(),
            phone: self.phone.clone(),
            line1: self.line1.clone(),
            line2: self.line2.clone(),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
        }
    }
}

/// Address data frozen into an order at placement time; later edits to the
/// address book never affect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressSnapshot {
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
}

/// Fulfilment state of an order.
///
/// Transitions:
/// ```text
/// Pending ──► Confirmed ──► Processing ──► Shipped ──► Delivered
///    │
///    └──► Cancelled
/// ```
/// `Returned` and `Refunded` are terminal states driven by the external
/// return/payment collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Returned,
    Refunded,
}

impl OrderStatus {
    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Parses a stored status name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "confirmed" => Some(OrderStatus::Confirmed),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "returned" => Some(OrderStatus::Returned),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }

    /// Position on the fulfilment track; `None` for states off the track.
    pub fn rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Confirmed => Some(1),
            OrderStatus::Processing => Some(2),
            OrderStatus::Shipped => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Cancelled | OrderStatus::Returned | OrderStatus::Refunded => None,
        }
    }

    /// Returns true if the order can still be cancelled by the shopper.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered
                | OrderStatus::Cancelled
                | OrderStatus::Returned
                | OrderStatus::Refunded
        )
    }

    /// Returns true if an admin may move an order from `self` to `to`:
    /// strictly forward along the fulfilment track.
    pub fn can_advance_to(&self, to: OrderStatus) -> bool {
        match (self.rank(), to.rank()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment state of an order, driven by the payment collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Returns the status name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// Parses a stored status name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An order row: a point-in-time snapshot of cart, prices and address.
///
/// Immutable after creation except for `status` and `payment_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    /// Globally unique, human-readable order number.
    pub order_number: String,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub delivery_option: String,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub discount: Money,
    pub grand_total: Money,
    pub shipping_address: AddressSnapshot,
    pub billing_address: AddressSnapshot,
    pub created_at: DateTime<Utc>,
}

/// A line snapshot owned by an order; price data is frozen at placement
/// time and never recomputed from the live catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineRecord {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub unit_discount: Money,
}

/// Insertion payload for a new order and its line snapshots.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order: OrderRecord,
    pub lines: Vec<OrderLineRecord>,
}
