//! Payment gateway trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, OrderId};

use crate::error::{PaymentError, Result};

/// A checkout session handle minted by the gateway.
///
/// The shopper is redirected to `redirect_url`; the gateway later reports
/// the outcome asynchronously through a signed webhook.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// The session ID assigned by the gateway.
    pub session_id: String,
    /// Where to send the shopper to complete payment.
    pub redirect_url: String,
}

/// Trait for payment gateway operations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a checkout session for an order amount.
    async fn create_session(&self, order_id: OrderId, amount: Money) -> Result<CheckoutSession>;

    /// Cancels a previously created session.
    async fn cancel_session(&self, session_id: &str) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    sessions: HashMap<String, (OrderId, Money)>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory payment gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory payment gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail on the next create call.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns the number of active sessions.
    pub fn session_count(&self) -> usize {
        self.state.read().unwrap().sessions.len()
    }

    /// Returns true if a session exists with the given ID.
    pub fn has_session(&self, session_id: &str) -> bool {
        self.state.read().unwrap().sessions.contains_key(session_id)
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn create_session(&self, order_id: OrderId, amount: Money) -> Result<CheckoutSession> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(PaymentError::Gateway("Gateway unavailable".to_string()));
        }

        state.next_id += 1;
        let session_id = format!("PAY-SESS-{:04}", state.next_id);
        state.sessions.insert(session_id.clone(), (order_id, amount));

        Ok(CheckoutSession {
            redirect_url: format!("https://pay.example.test/session/{session_id}"),
            session_id,
        })
    }

    async fn cancel_session(&self, session_id: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();
        state.sessions.remove(session_id);
        Ok(())
    }
}
