//! Payment coordination: session creation and webhook handling.

use std::sync::Arc;

use common::{OrderId, UserId};
use domain::OrderService;
use serde::Deserialize;
use store::{CommerceStore, OrderRecord, PaymentStatus};

use crate::error::{PaymentError, Result};
use crate::gateway::{CheckoutSession, PaymentGateway};

/// Outcome reported by the gateway for a checkout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Paid,
    Failed,
}

/// A webhook payload whose signature has already been verified upstream.
///
/// Verification itself is outside this crate; the processor trusts only
/// pre-verified notifications.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentNotification {
    pub order_id: OrderId,
    pub outcome: PaymentOutcome,
    /// Gateway-side reference for the charge.
    pub reference: String,
}

/// Coordinates payment sessions and webhook-reported outcomes.
pub struct PaymentProcessor<S: CommerceStore> {
    orders: OrderService<S>,
    gateway: Arc<dyn PaymentGateway>,
}

impl<S: CommerceStore> PaymentProcessor<S> {
    /// Creates a new payment processor.
    pub fn new(store: S, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            orders: OrderService::new(store),
            gateway,
        }
    }

    /// Starts payment collection for a pending, unpaid order.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self, user_id: UserId, order_id: OrderId) -> Result<CheckoutSession> {
        let details = self.orders.get_order(user_id, order_id).await?;

        if details.order.payment_status != PaymentStatus::Pending {
            return Err(PaymentError::NotPayable(format!(
                "Order {order_id} has payment status {}",
                details.order.payment_status
            )));
        }

        let session = self
            .gateway
            .create_session(order_id, details.order.grand_total)
            .await?;

        metrics::counter!("payment_sessions_created_total").increment(1);
        Ok(session)
    }

    /// Applies a verified gateway notification to the order.
    #[tracing::instrument(skip(self))]
    pub async fn handle_notification(
        &self,
        notification: &PaymentNotification,
    ) -> Result<OrderRecord> {
        let order = match notification.outcome {
            PaymentOutcome::Paid => self.orders.mark_paid(notification.order_id).await?,
            PaymentOutcome::Failed => {
                self.orders
                    .mark_payment_failed(notification.order_id)
                    .await?
            }
        };

        tracing::info!(
            order_id = %notification.order_id,
            reference = %notification.reference,
            outcome = ?notification.outcome,
            "payment notification applied"
        );

        Ok(order)
    }
}
