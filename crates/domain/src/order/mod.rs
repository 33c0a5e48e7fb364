//! Order lifecycle: queries, cancellation, fulfilment progression.

mod service;

pub use service::OrderService;

use serde::Serialize;
use store::{OrderLineRecord, OrderRecord};

/// An order together with its line snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetails {
    pub order: OrderRecord,
    pub lines: Vec<OrderLineRecord>,
}
