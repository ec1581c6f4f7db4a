//! Startup data for the in-memory catalog and vendor directory.

use std::path::{Path, PathBuf};

use checkout::{InMemoryCatalogService, InMemoryVendorService, Product, Vendor};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid seed file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Vendors and products served by the in-memory collaborators.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub vendors: Vec<Vendor>,
    #[serde(default)]
    pub products: Vec<Product>,
}

impl CatalogSeed {
    /// Reads a JSON seed file.
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Builds the catalog and vendor directory from the seed.
    pub fn into_services(self) -> (InMemoryCatalogService, InMemoryVendorService) {
        let catalog = InMemoryCatalogService::new();
        let vendors = InMemoryVendorService::new();
        for product in self.products {
            catalog.insert_product(product);
        }
        for vendor in self.vendors {
            vendors.insert_vendor(vendor);
        }
        (catalog, vendors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout::{CatalogService, VendorService};
    use common::VendorId;

    #[tokio::test]
    async fn test_seed_populates_services() {
        let vendor_id = VendorId::new();
        let seed: CatalogSeed = serde_json::from_value(serde_json::json!({
            "vendors": [{
                "id": vendor_id,
                "slug": "acme",
                "order_prefix": "ACME",
                "contact_email": "owner@acme.test"
            }],
            "products": [{
                "id": "tee",
                "vendor_id": vendor_id,
                "product_type": "PRODUCT",
                "price": 1000,
                "variants": [{ "sku": "M" }, { "sku": "XL", "price": 1200 }]
            }]
        }))
        .unwrap();

        let (catalog, vendors) = seed.into_services();
        let product = catalog.get_product(&"tee".into()).await.unwrap().unwrap();
        assert_eq!(product.variants.len(), 2);
        assert_eq!(
            vendors.get_order_prefix(vendor_id).await.unwrap().as_deref(),
            Some("ACME")
        );
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = CatalogSeed::load(Path::new("/nonexistent/seed.json")).unwrap_err();
        assert!(matches!(err, SeedError::Read { .. }));
    }
}
