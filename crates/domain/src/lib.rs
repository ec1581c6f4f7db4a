//! Domain layer for the checkout system.
//!
//! This crate provides the pure domain model, free of I/O:
//! - Cart with line items whose totals always equal the price fold
//! - Order snapshot taken from a checkout-ready cart
//! - Order status state machine and its mapping from gateway invoice statuses

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod value_objects;

pub use cart::{Cart, CartError, CartItem, CartItemPatch, CartUpdate, ItemAttributes, ProductType};
pub use error::DomainError;
pub use money::Money;
pub use order::{
    InvoiceId, InvoiceStatus, Order, OrderError, OrderNumber, OrderStatus, StatusChange,
};
pub use value_objects::{
    Address, AppliedCoupon, CustomerInfo, DeliveryMethod, ParseEnumError, PaymentMethod,
    ProductId, Sku,
};
