//! Cart mutations checked against the catalog.

use chrono::Utc;
use common::{CartId, CustomerId, VendorId};
use domain::{Cart, CartItem, CartItemPatch, CartUpdate, ItemAttributes, ProductId, Sku};
use serde::{Deserialize, Serialize};
use store::{Store, StoreError};

use crate::config::{CheckoutConfig, bounded_store};
use crate::error::{CheckoutError, Result, ValidationError};
use crate::locks::CartLocks;
use crate::services::{CatalogService, Product};

/// A line item the customer asks to add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub sku: Sku,
    pub quantity: u32,
    #[serde(default)]
    pub attributes: Option<ItemAttributes>,
}

/// Cart Store operations as exposed to clients.
///
/// Every mutation runs under the cart's lock and keeps the totals equal to
/// the item price fold. Once checkout has created an order for a cart, the
/// cart is frozen until it is checked out again or abandoned.
pub struct CartService<S, C>
where
    S: Store,
    C: CatalogService,
{
    store: S,
    catalog: C,
    locks: CartLocks,
    config: CheckoutConfig,
}

impl<S, C> CartService<S, C>
where
    S: Store,
    C: CatalogService,
{
    /// Creates a new cart service.
    pub fn new(store: S, catalog: C, locks: CartLocks, config: CheckoutConfig) -> Self {
        Self {
            store,
            catalog,
            locks,
            config,
        }
    }

    /// Returns the customer's cart with a vendor, creating an empty one if
    /// none exists.
    #[tracing::instrument(skip(self))]
    pub async fn get_or_create_cart(
        &self,
        customer_id: CustomerId,
        vendor_id: VendorId,
    ) -> Result<Cart> {
        let limit = self.config.store_timeout;
        if let Some(cart) = bounded_store(
            limit,
            "find_cart",
            self.store.find_cart(customer_id, vendor_id),
        )
        .await?
        {
            return Ok(cart);
        }

        let cart = Cart::new(customer_id, vendor_id, Utc::now());
        match tokio::time::timeout(limit, self.store.insert_cart(&cart)).await {
            Ok(Ok(())) => {
                tracing::info!(cart_id = %cart.id, "cart created");
                Ok(cart)
            }
            // Lost a creation race; the winner's cart is the customer's cart.
            Ok(Err(StoreError::DuplicateCart { .. })) => bounded_store(
                limit,
                "find_cart",
                self.store.find_cart(customer_id, vendor_id),
            )
            .await?
            .ok_or_else(|| CheckoutError::Conflict("cart vanished after creation race".into())),
            Ok(Err(err)) => Err(err.into()),
            Err(_) => Err(CheckoutError::Persistence(format!(
                "insert_cart timed out after {limit:?}"
            ))),
        }
    }

    /// Fetches a cart by ID.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, cart_id: CartId) -> Result<Cart> {
        self.load(cart_id).await
    }

    /// Applies a whitelisted field update.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_cart(&self, cart_id: CartId, update: CartUpdate) -> Result<Cart> {
        let _guard = self.locks.lock(cart_id).await;
        let mut cart = self.load(cart_id).await?;
        if update.is_empty() {
            return Ok(cart);
        }
        self.ensure_editable(cart_id).await?;

        cart.apply_update(update);
        self.save(&cart).await
    }

    /// Adds a catalog product to the cart, or increases its quantity if the
    /// `(product, sku)` line already exists.
    #[tracing::instrument(skip(self, item), fields(product_id = %item.product_id, sku = %item.sku))]
    pub async fn add_item(&self, cart_id: CartId, item: NewCartItem) -> Result<Cart> {
        let _guard = self.locks.lock(cart_id).await;
        let mut cart = self.load(cart_id).await?;
        self.ensure_editable(cart_id).await?;
        let product = self.product_for(&cart, &item.product_id).await?;

        let price = product
            .unit_price(&item.sku)
            .ok_or_else(|| ValidationError::UnknownSku {
                product_id: item.product_id.clone(),
                sku: item.sku.clone(),
            })?;

        let already = cart
            .find_item(&item.product_id, &item.sku)
            .map_or(0, |line| line.quantity);
        check_availability(&product, &item.sku, already.saturating_add(item.quantity))?;

        let attributes = match item.attributes {
            Some(attributes) if attributes.product_type() != product.product_type => {
                return Err(ValidationError::AttributesMismatch(product.product_type).into());
            }
            Some(attributes) => attributes,
            None => ItemAttributes::empty(product.product_type),
        };

        cart.add_item(CartItem::new(
            item.product_id,
            item.sku,
            price,
            item.quantity,
            attributes,
        ))?;
        self.save(&cart).await
    }

    /// Updates the quantity or attributes of the `(product, sku)` line.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        sku: Sku,
        patch: CartItemPatch,
    ) -> Result<Cart> {
        let _guard = self.locks.lock(cart_id).await;
        let mut cart = self.load(cart_id).await?;
        self.ensure_editable(cart_id).await?;

        if let Some(quantity) = patch.quantity
            && cart.find_item(&product_id, &sku).is_some()
        {
            let product = self.product_for(&cart, &product_id).await?;
            check_availability(&product, &sku, quantity)?;
        }

        cart.update_item(&product_id, &sku, patch)?;
        self.save(&cart).await
    }

    /// Removes the `(product, sku)` line.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        sku: Sku,
    ) -> Result<Cart> {
        let _guard = self.locks.lock(cart_id).await;
        let mut cart = self.load(cart_id).await?;
        self.ensure_editable(cart_id).await?;
        cart.remove_item(&product_id, &sku)?;
        self.save(&cart).await
    }

    /// Rewrites the stored totals from the item fold.
    #[tracing::instrument(skip(self))]
    pub async fn recalculate_totals(&self, cart_id: CartId) -> Result<Cart> {
        let _guard = self.locks.lock(cart_id).await;
        let cart = self.load(cart_id).await?;
        let total = cart.computed_total()?;

        bounded_store(
            self.config.store_timeout,
            "update_totals",
            self.store.update_totals(cart_id, total, total),
        )
        .await
    }

    /// Abandons a cart.
    #[tracing::instrument(skip(self))]
    pub async fn delete_cart(&self, cart_id: CartId) -> Result<()> {
        let _guard = self.locks.lock(cart_id).await;
        let deleted = bounded_store(
            self.config.store_timeout,
            "delete_cart",
            self.store.delete_cart(cart_id),
        )
        .await?;

        if !deleted {
            return Err(ValidationError::CartNotFound(cart_id).into());
        }
        tracing::info!("cart abandoned");
        Ok(())
    }

    async fn load(&self, cart_id: CartId) -> Result<Cart> {
        bounded_store(
            self.config.store_timeout,
            "get_cart",
            self.store.get_cart(cart_id),
        )
        .await?
        .ok_or_else(|| ValidationError::CartNotFound(cart_id).into())
    }

    async fn ensure_editable(&self, cart_id: CartId) -> Result<()> {
        let order = bounded_store(
            self.config.store_timeout,
            "find_order_by_cart",
            self.store.find_order_by_cart(cart_id),
        )
        .await?;

        match order {
            Some(order) => Err(ValidationError::CartAlreadyOrdered {
                cart_id,
                order_id: order.id,
            }
            .into()),
            None => Ok(()),
        }
    }

    async fn save(&self, cart: &Cart) -> Result<Cart> {
        bounded_store(
            self.config.store_timeout,
            "save_cart",
            self.store.save_cart(cart),
        )
        .await
    }

    /// Looks a product up and checks it can go into this cart.
    async fn product_for(&self, cart: &Cart, product_id: &ProductId) -> Result<Product> {
        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or_else(|| ValidationError::ProductNotFound(product_id.clone()))?;

        if !product.active {
            return Err(ValidationError::ProductUnavailable(product_id.clone()).into());
        }
        if product.vendor_id != cart.vendor_id {
            return Err(ValidationError::ProductVendorMismatch {
                product_id: product_id.clone(),
                vendor_id: cart.vendor_id,
            }
            .into());
        }
        Ok(product)
    }
}

fn check_availability(product: &Product, sku: &Sku, requested: u32) -> Result<()> {
    match product.available(sku) {
        Some(available) if requested > available => {
            Err(ValidationError::InsufficientAvailability {
                product_id: product.id.clone(),
                requested,
                available,
            }
            .into())
        }
        _ => Ok(()),
    }
}
