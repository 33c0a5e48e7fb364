//! Checkout command.

use common::{AddressId, UserId};

use super::DeliveryOption;

/// Command to convert a user's cart into an order.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    /// The user placing the order.
    pub user_id: UserId,

    /// The address-book entry to snapshot into the order.
    pub address_id: AddressId,

    /// Payment method tag, recorded on the order as-is.
    pub payment_method: String,

    /// The delivery option determining the shipping fee.
    pub delivery_option: DeliveryOption,

    /// Optional coupon code, handed to the discount resolver.
    pub coupon_code: Option<String>,
}

impl PlaceOrder {
    /// Creates a new PlaceOrder command without a coupon.
    pub fn new(
        user_id: UserId,
        address_id: AddressId,
        payment_method: impl Into<String>,
        delivery_option: DeliveryOption,
    ) -> Self {
        Self {
            user_id,
            address_id,
            payment_method: payment_method.into(),
            delivery_option,
            coupon_code: None,
        }
    }

    /// Attaches a coupon code to the command.
    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_code = Some(code.into());
        self
    }
}
