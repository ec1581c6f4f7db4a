//! Checkout error types.

use common::{CartId, OrderId, VendorId};
use domain::{CartError, DomainError, OrderError, ProductId, ProductType, Sku};
use payment::{GatewayBusinessError, GatewayError};
use store::StoreError;
use thiserror::Error;

use crate::services::ServiceError;

/// Precondition violations. Raised before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Cart not found: {0}")]
    CartNotFound(CartId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Vendor not found: {0}")]
    VendorNotFound(VendorId),

    /// The cart is not ready for the requested operation.
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("Payment session is required for online payment")]
    PaymentSessionRequired,

    #[error("Customer name and email are required for online payment")]
    CustomerInfoRequired,

    #[error("Order {0} has no invoice")]
    InvoiceMissing(OrderId),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Product {0} is not available")]
    ProductUnavailable(ProductId),

    #[error("Product {product_id} is not sold by vendor {vendor_id}")]
    ProductVendorMismatch {
        product_id: ProductId,
        vendor_id: VendorId,
    },

    #[error("Product {product_id} has no variant {sku}")]
    UnknownSku { product_id: ProductId, sku: Sku },

    #[error("Only {available} of product {product_id} available, requested {requested}")]
    InsufficientAvailability {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    #[error("Item attributes do not match product type {0}")]
    AttributesMismatch(ProductType),

    /// A cart kept for a payment retry can be checked out again or
    /// abandoned, not edited.
    #[error("Cart {cart_id} already has order {order_id}")]
    CartAlreadyOrdered { cart_id: CartId, order_id: OrderId },

    /// The cart no longer matches the order created from it.
    #[error("Cart {cart_id} has changed since order {order_id} was created")]
    CartChangedSinceOrder { cart_id: CartId, order_id: OrderId },
}

impl ValidationError {
    /// Returns true if the error names a missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ValidationError::CartNotFound(_)
                | ValidationError::OrderNotFound(_)
                | ValidationError::VendorNotFound(_)
                | ValidationError::ProductNotFound(_)
                | ValidationError::Cart(CartError::ItemNotFound { .. })
        )
    }

    /// Returns true if the request clashes with an existing order.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ValidationError::CartAlreadyOrdered { .. }
                | ValidationError::CartChangedSinceOrder { .. }
        )
    }
}

/// Errors that can occur during checkout and settlement.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A concurrent writer got there first; the request may be retried.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The cart store or order ledger failed or timed out.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The payment gateway could not be reached.
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The payment gateway refused a request outside checkout.
    #[error("Payment gateway rejected request: {0}")]
    GatewayRejected(GatewayBusinessError),

    /// A catalog or vendor lookup failed.
    #[error("Collaborator error: {0}")]
    Service(#[from] ServiceError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for CheckoutError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CartNotFound(id) => ValidationError::CartNotFound(id).into(),
            StoreError::OrderNotFound(id) => ValidationError::OrderNotFound(id).into(),
            StoreError::ConcurrencyConflict { .. }
            | StoreError::StatusConflict { .. }
            | StoreError::DuplicateCart { .. } => CheckoutError::Conflict(err.to_string()),
            other => CheckoutError::Persistence(other.to_string()),
        }
    }
}

impl From<GatewayError> for CheckoutError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Rejected(business) => CheckoutError::GatewayRejected(business),
            other => CheckoutError::GatewayUnavailable(other.to_string()),
        }
    }
}

impl From<CartError> for CheckoutError {
    fn from(err: CartError) -> Self {
        CheckoutError::Validation(err.into())
    }
}

impl From<OrderError> for CheckoutError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Cart(cart) => cart.into(),
            other => CheckoutError::Conflict(other.to_string()),
        }
    }
}

impl From<DomainError> for CheckoutError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Cart(cart) => cart.into(),
            DomainError::Order(order) => order.into(),
            other => CheckoutError::Internal(other.to_string()),
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;
    use domain::OrderStatus;

    #[test]
    fn test_store_errors_are_classified() {
        let missing: CheckoutError = StoreError::CartNotFound(CartId::new()).into();
        assert!(matches!(
            missing,
            CheckoutError::Validation(ValidationError::CartNotFound(_))
        ));

        let conflict: CheckoutError = StoreError::StatusConflict {
            order_id: OrderId::new(),
            expected: OrderStatus::Created,
            actual: OrderStatus::Pending,
        }
        .into();
        assert!(matches!(conflict, CheckoutError::Conflict(_)));

        let down: CheckoutError = StoreError::Unavailable("db down".into()).into();
        assert!(matches!(down, CheckoutError::Persistence(_)));
    }

    #[test]
    fn test_gateway_errors_are_classified() {
        let rejected: CheckoutError =
            GatewayError::Rejected(GatewayBusinessError::new("bad")).into();
        assert!(matches!(rejected, CheckoutError::GatewayRejected(_)));

        let unreachable: CheckoutError = GatewayError::Transport("reset".into()).into();
        assert!(matches!(unreachable, CheckoutError::GatewayUnavailable(_)));
    }

    #[test]
    fn test_not_found_classification() {
        assert!(ValidationError::CartNotFound(CartId::new()).is_not_found());
        assert!(
            ValidationError::Cart(CartError::ItemNotFound {
                product_id: "p".into(),
                sku: "s".into(),
            })
            .is_not_found()
        );
        assert!(!ValidationError::PaymentSessionRequired.is_not_found());

        let ordered = ValidationError::CartAlreadyOrdered {
            cart_id: CartId::new(),
            order_id: OrderId::new(),
        };
        assert!(ordered.is_conflict());
        assert!(!ordered.is_not_found());
        assert!(!ValidationError::PaymentSessionRequired.is_conflict());
    }
}
