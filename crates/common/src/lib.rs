//! Shared types for the checkout system.

mod types;

pub use types::{CartId, CustomerId, OrderId, VendorId};
