//! Payment gateway client.
//!
//! Wraps the external provider's session, execute, status and refund
//! operations behind [`PaymentGateway`], separating business rejections
//! from failures that leave the outcome unknown.

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod memory;
pub mod wire;

pub use config::GatewayConfig;
pub use error::{GatewayBusinessError, GatewayError, GatewayValidationError, Result};
pub use gateway::{
    Invoice, InvoiceReport, PaymentGateway, PaymentSession, RefundReceipt, SessionId,
};
pub use http::HttpPaymentGateway;
pub use memory::InMemoryPaymentGateway;
