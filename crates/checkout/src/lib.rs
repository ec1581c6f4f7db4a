//! Checkout orchestration for the shop.
//!
//! This crate ties the cart store, order ledger and payment gateway into one
//! saga:
//! - [`CartService`] mutates carts through the catalog
//! - [`CheckoutCoordinator`] turns a cart into an order and executes payment
//! - [`SettlementService`] polls invoice status and issues refunds
//!
//! All mutations on one cart are serialized through a shared [`CartLocks`].

pub mod cart_service;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod locks;
pub mod outcome;
pub mod services;
pub mod settlement;

pub use cart_service::{CartService, NewCartItem};
pub use config::CheckoutConfig;
pub use coordinator::CheckoutCoordinator;
pub use error::{CheckoutError, Result, ValidationError};
pub use locks::{CartLockGuard, CartLocks};
pub use outcome::{CheckoutOutcome, PaymentAttempt, PaymentOutcome, RefundOutcome, SettlementReport};
pub use services::{
    CatalogService, InMemoryCatalogService, InMemoryNotificationService, InMemoryVendorService,
    NotificationKind, NotificationService, Product, ProductVariant, SentNotification,
    ServiceError, TracingNotificationService, Vendor, VendorService,
};
pub use settlement::SettlementService;
