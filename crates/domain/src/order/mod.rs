//! Order records and their settlement status.

mod number;
mod record;
mod status;

pub use number::OrderNumber;
pub use record::{InvoiceId, Order, StatusChange};
pub use status::{InvoiceStatus, OrderStatus};

use thiserror::Error;

use crate::cart::CartError;

/// Errors that can occur while creating or transitioning an order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    /// The cart is not ready to become an order.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// The requested status change is not a valid transition.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
