//! Persistence layer for the commerce workspace.
//!
//! Exposes typed records for the persisted state, a transactional
//! [`CommerceStore`]/[`StoreTx`] unit-of-work, and two implementations:
//! [`InMemoryStore`] for tests and development, [`PostgresStore`] for
//! production.

mod error;
mod memory;
mod postgres;
mod records;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTx};
pub use postgres::{PostgresStore, PostgresTx};
pub use records::{
    AddressRecord, AddressSnapshot, CartLineRecord, CartOwner, CartRecord, NewOrder,
    OrderLineRecord, OrderRecord, OrderStatus, PaymentStatus, ProductRecord, ProductStatus,
};
pub use store::{CommerceStore, StoreTx};
