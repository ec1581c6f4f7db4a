//! Cart line items.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::value_objects::{ProductId, Sku};

/// Kind of catalog entry a line item refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Product,
    Workshop,
    Service,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Product => "PRODUCT",
            ProductType::Workshop => "WORKSHOP",
            ProductType::Service => "SERVICE",
        }
    }
}

impl std::fmt::Display for ProductType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Attributes that only make sense for one product type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemAttributes {
    Product {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preorder_date: Option<NaiveDate>,
    },
    Workshop {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_date: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        attendees: Vec<String>,
    },
    Service {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        appointment: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
}

impl ItemAttributes {
    /// Empty attributes for the given product type.
    pub fn empty(product_type: ProductType) -> Self {
        match product_type {
            ProductType::Product => ItemAttributes::Product {
                preorder_date: None,
            },
            ProductType::Workshop => ItemAttributes::Workshop {
                session_date: None,
                attendees: Vec::new(),
            },
            ProductType::Service => ItemAttributes::Service {
                appointment: None,
                location: None,
            },
        }
    }

    pub fn product_type(&self) -> ProductType {
        match self {
            ItemAttributes::Product { .. } => ProductType::Product,
            ItemAttributes::Workshop { .. } => ProductType::Workshop,
            ItemAttributes::Service { .. } => ProductType::Service,
        }
    }
}

/// A line in a cart, and later in an order snapshot.
///
/// Identified within its cart by `(product_id, sku)`: the same product may
/// appear several times with different variant SKUs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub sku: Sku,
    /// Unit price.
    pub price: Money,
    pub quantity: u32,
    pub attributes: ItemAttributes,
}

impl CartItem {
    pub fn new(
        product_id: impl Into<ProductId>,
        sku: impl Into<Sku>,
        price: Money,
        quantity: u32,
        attributes: ItemAttributes,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            sku: sku.into(),
            price,
            quantity,
            attributes,
        }
    }

    /// Returns `price * quantity`, or `None` if it overflows.
    pub fn line_total(&self) -> Option<Money> {
        self.price.checked_multiply(self.quantity)
    }

    /// Returns true if this line has the given composite key.
    pub fn matches(&self, product_id: &ProductId, sku: &Sku) -> bool {
        &self.product_id == product_id && &self.sku == sku
    }

    /// Display name used on gateway invoices, `"{productId}_{sku}"`.
    pub fn invoice_name(&self) -> String {
        format!("{}_{}", self.product_id, self.sku)
    }
}

/// Client-editable fields of an existing line item.
///
/// Price is deliberately absent: it always comes from the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemPatch {
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub attributes: Option<ItemAttributes>,
}
