//! Cart resolution, mutation, summary and the merge protocol.

mod merge;
mod service;
mod view;

pub use service::CartService;
pub use view::{CartLineView, CartView};
