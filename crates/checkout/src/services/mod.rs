//! Collaborators the checkout services consume.

pub mod catalog;
pub mod notification;
pub mod vendor;

use thiserror::Error;

pub use catalog::{CatalogService, InMemoryCatalogService, Product, ProductVariant};
pub use notification::{
    InMemoryNotificationService, NotificationKind, NotificationService, SentNotification,
    TracingNotificationService,
};
pub use vendor::{InMemoryVendorService, Vendor, VendorService};

/// A collaborator call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{service} service error: {reason}")]
pub struct ServiceError {
    pub service: &'static str,
    pub reason: String,
}

impl ServiceError {
    pub fn new(service: &'static str, reason: impl Into<String>) -> Self {
        Self {
            service,
            reason: reason.into(),
        }
    }
}
