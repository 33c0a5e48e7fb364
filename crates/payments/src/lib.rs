//! Payment collaborator boundary.
//!
//! The core never talks to a payment provider directly; it consumes the
//! [`PaymentGateway`] trait for session creation and applies verified
//! webhook notifications through [`PaymentProcessor`].

mod error;
mod gateway;
mod processor;

pub use error::{PaymentError, Result};
pub use gateway::{CheckoutSession, InMemoryPaymentGateway, PaymentGateway};
pub use processor::{PaymentNotification, PaymentOutcome, PaymentProcessor};
