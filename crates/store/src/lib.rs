//! Persistence for the checkout system.
//!
//! Two stores of truth live here:
//! - the Cart Store, holding mutable pre-order state
//! - the Order Ledger, holding immutable order records and their status history
//!
//! Both come in an in-memory flavour for tests and a PostgreSQL flavour.

pub mod cart;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;

pub use cart::{CartStore, CartStoreExt};
pub use error::{Result, StoreError};
pub use ledger::{LedgerInsert, OrderLedger, OrderLedgerExt};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

/// A backend that serves as both Cart Store and Order Ledger.
pub trait Store: CartStore + OrderLedger + Clone + 'static {}

impl<T: CartStore + OrderLedger + Clone + 'static> Store for T {}
