//! Vendor service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::VendorId;
use serde::{Deserialize, Serialize};

use super::ServiceError;

/// Vendor metadata needed at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    /// Public-facing slug used in payment redirect URLs.
    pub slug: String,
    /// Prefix of the vendor's order numbers.
    pub order_prefix: String,
    #[serde(default)]
    pub contact_email: Option<String>,
}

/// Read access to vendor metadata.
#[async_trait]
pub trait VendorService: Send + Sync {
    async fn get_order_prefix(&self, vendor_id: VendorId) -> Result<Option<String>, ServiceError>;

    async fn get_vendor(&self, vendor_id: VendorId) -> Result<Option<Vendor>, ServiceError>;
}

/// In-memory vendor directory for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVendorService {
    vendors: Arc<RwLock<HashMap<VendorId, Vendor>>>,
}

impl InMemoryVendorService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a vendor.
    pub fn insert_vendor(&self, vendor: Vendor) {
        self.vendors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(vendor.id, vendor);
    }

    fn lookup(&self, vendor_id: VendorId) -> Option<Vendor> {
        self.vendors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&vendor_id)
            .cloned()
    }
}

#[async_trait]
impl VendorService for InMemoryVendorService {
    async fn get_order_prefix(&self, vendor_id: VendorId) -> Result<Option<String>, ServiceError> {
        Ok(self.lookup(vendor_id).map(|v| v.order_prefix))
    }

    async fn get_vendor(&self, vendor_id: VendorId) -> Result<Option<Vendor>, ServiceError> {
        Ok(self.lookup(vendor_id))
    }
}
