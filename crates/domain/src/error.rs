//! Domain error types.

use thiserror::Error;

use crate::cart::CartError;
use crate::order::OrderError;
use crate::value_objects::ParseEnumError;

/// Errors that can occur during domain operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// An error occurred in a cart operation.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// An error occurred in an order operation.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// A stored or submitted enum value was not recognised.
    #[error(transparent)]
    Parse(#[from] ParseEnumError),
}
