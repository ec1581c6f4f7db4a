use common::{CartId, CustomerId, OrderId, VendorId};
use domain::{OrderStatus, ParseEnumError};
use thiserror::Error;

/// Errors that can occur when interacting with the cart store or order ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The cart was modified since it was read.
    #[error("Concurrency conflict for cart {cart_id}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        cart_id: CartId,
        expected: i64,
        actual: i64,
    },

    /// The order status changed since it was read.
    #[error("Status conflict for order {order_id}: expected {expected}, found {actual}")]
    StatusConflict {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// The cart was not found.
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    /// The order was not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The customer already has a cart with this vendor.
    #[error("Customer {customer_id} already has a cart with vendor {vendor_id}")]
    DuplicateCart {
        customer_id: CustomerId,
        vendor_id: VendorId,
    },

    /// The backend cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be mapped back to the domain.
    #[error("Invalid stored data: {0}")]
    InvalidData(#[from] ParseEnumError),
}

impl StoreError {
    /// Returns true for failures of the backend itself, as opposed to
    /// conflicts or missing rows.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Database(_))
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
