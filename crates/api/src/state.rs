//! Shared application state accessible from all handlers.

use domain::{CartService, CheckoutService, OrderService};
use payments::PaymentProcessor;
use store::CommerceStore;

/// Services wired at the composition root and shared across handlers.
pub struct AppState<S: CommerceStore> {
    pub carts: CartService<S>,
    pub checkout: CheckoutService<S>,
    pub orders: OrderService<S>,
    pub payments: PaymentProcessor<S>,
}
