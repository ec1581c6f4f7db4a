//! Catalog service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use common::VendorId;
use domain::{Money, ProductId, ProductType, Sku};
use serde::{Deserialize, Serialize};

use super::ServiceError;

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub sku: Sku,
    /// Overrides the product price when set.
    #[serde(default)]
    pub price: Option<Money>,
    /// Units in stock, if tracked.
    #[serde(default)]
    pub stock: Option<u32>,
}

/// Catalog entry as seen by the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub product_type: ProductType,
    pub price: Money,
    #[serde(default = "active_by_default")]
    pub active: bool,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
    /// Units in stock when the product has no variants, if tracked.
    #[serde(default)]
    pub stock: Option<u32>,
    /// Remaining seats for workshops.
    #[serde(default)]
    pub seats_remaining: Option<u32>,
}

impl Product {
    pub fn new(
        id: impl Into<ProductId>,
        vendor_id: VendorId,
        product_type: ProductType,
        price: Money,
    ) -> Self {
        Self {
            id: id.into(),
            vendor_id,
            product_type,
            price,
            active: true,
            variants: Vec::new(),
            stock: None,
            seats_remaining: None,
        }
    }

    pub fn with_variant(mut self, sku: impl Into<Sku>, price: Option<Money>) -> Self {
        self.variants.push(ProductVariant {
            sku: sku.into(),
            price,
            stock: None,
        });
        self
    }

    pub fn with_stock(mut self, stock: u32) -> Self {
        self.stock = Some(stock);
        self
    }

    pub fn with_seats(mut self, seats: u32) -> Self {
        self.seats_remaining = Some(seats);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn variant(&self, sku: &Sku) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.sku == sku)
    }

    /// Unit price for a SKU. `None` if the product lists variants and the
    /// SKU is not one of them.
    pub fn unit_price(&self, sku: &Sku) -> Option<Money> {
        if self.variants.is_empty() {
            return Some(self.price);
        }
        self.variant(sku).map(|v| v.price.unwrap_or(self.price))
    }

    /// Quantity that can still be sold for a SKU, if limited.
    pub fn available(&self, sku: &Sku) -> Option<u32> {
        match self.product_type {
            ProductType::Workshop => self.seats_remaining,
            _ => self.variant(sku).and_then(|v| v.stock).or(self.stock),
        }
    }
}

fn active_by_default() -> bool {
    true
}

/// Read access to the product catalog.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>, ServiceError>;
}

/// In-memory catalog for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogService {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
}

impl InMemoryCatalogService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a product.
    pub fn insert_product(&self, product: Product) {
        self.products
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product.id.clone(), product);
    }
}

#[async_trait]
impl CatalogService for InMemoryCatalogService {
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>, ServiceError> {
        Ok(self
            .products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(product_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_price_falls_back_to_product_price() {
        let product = Product::new("p1", VendorId::new(), ProductType::Product, Money::from_cents(900))
            .with_variant("RED", Some(Money::from_cents(1100)))
            .with_variant("BLUE", None);

        assert_eq!(product.unit_price(&"RED".into()), Some(Money::from_cents(1100)));
        assert_eq!(product.unit_price(&"BLUE".into()), Some(Money::from_cents(900)));
        assert_eq!(product.unit_price(&"GREEN".into()), None);
    }

    #[test]
    fn test_any_sku_without_variants() {
        let product = Product::new("p1", VendorId::new(), ProductType::Service, Money::from_cents(5000));
        assert_eq!(product.unit_price(&"anything".into()), Some(Money::from_cents(5000)));
        assert_eq!(product.available(&"anything".into()), None);
    }

    #[test]
    fn test_availability() {
        let workshop =
            Product::new("w1", VendorId::new(), ProductType::Workshop, Money::from_cents(100))
                .with_seats(3);
        assert_eq!(workshop.available(&"SEAT".into()), Some(3));

        let stocked = Product::new("p2", VendorId::new(), ProductType::Product, Money::from_cents(100))
            .with_stock(5);
        assert_eq!(stocked.available(&"ANY".into()), Some(5));
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let vendor_id = VendorId::new();
        let json = serde_json::json!({
            "id": "mug",
            "vendor_id": vendor_id,
            "product_type": "PRODUCT",
            "price": 450,
        });
        let product: Product = serde_json::from_value(json).unwrap();
        assert!(product.active);
        assert!(product.variants.is_empty());
        assert_eq!(product.price, Money::from_cents(450));
    }

    #[tokio::test]
    async fn test_in_memory_lookup() {
        let catalog = InMemoryCatalogService::new();
        let product = Product::new("p1", VendorId::new(), ProductType::Product, Money::from_cents(1));
        catalog.insert_product(product.clone());

        assert_eq!(catalog.get_product(&"p1".into()).await.unwrap(), Some(product));
        assert_eq!(catalog.get_product(&"p2".into()).await.unwrap(), None);
    }
}
