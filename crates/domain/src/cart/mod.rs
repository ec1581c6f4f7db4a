//! Shopping cart and its line items.

mod aggregate;
mod item;
mod update;

pub use aggregate::Cart;
pub use item::{CartItem, CartItemPatch, ItemAttributes, ProductType};
pub use update::CartUpdate;

use thiserror::Error;

use crate::value_objects::{ProductId, Sku};

/// Errors that can occur during cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// Quantity must be at least one.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Unit price must not be negative.
    #[error("Invalid price: {price} (must not be negative)")]
    InvalidPrice { price: i64 },

    /// Merging two quantities for the same line overflows.
    #[error("Quantity too large for item {product_id} / {sku}")]
    QuantityOverflow { product_id: ProductId, sku: Sku },

    /// A line total or the cart total does not fit in a money amount.
    #[error("Cart total is too large")]
    AmountOverflow,

    /// No line item matches the (product, sku) key.
    #[error("Item not found: {product_id} / {sku}")]
    ItemNotFound { product_id: ProductId, sku: Sku },

    /// The cart has no items to check out.
    #[error("Cart has no items")]
    Empty,

    /// Checkout requires a delivery method.
    #[error("Delivery method is required")]
    DeliveryMethodRequired,

    /// Checkout requires a payment method.
    #[error("Payment method is required")]
    PaymentMethodRequired,

    /// The chosen delivery method needs a consignee address.
    #[error("Consignee address is required for {0} delivery")]
    ConsigneeAddressRequired(crate::value_objects::DeliveryMethod),
}
