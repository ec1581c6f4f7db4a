use async_trait::async_trait;
use common::{CartId, CustomerId, VendorId};
use domain::{Cart, Money};

use crate::{Result, StoreError};

/// Storage for mutable pre-order carts.
///
/// Every write is a single atomic operation. Writes that replace a cart are
/// guarded by the cart's `version`.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Inserts a new cart.
    ///
    /// Fails with `DuplicateCart` if the customer already has a cart with
    /// the vendor.
    async fn insert_cart(&self, cart: &Cart) -> Result<()>;

    /// Retrieves a cart by ID.
    async fn get_cart(&self, cart_id: CartId) -> Result<Option<Cart>>;

    /// Retrieves the cart a customer holds with a vendor.
    async fn find_cart(&self, customer_id: CustomerId, vendor_id: VendorId)
    -> Result<Option<Cart>>;

    /// Replaces a cart's mutable state.
    ///
    /// Succeeds only if the stored version equals `cart.version`; otherwise
    /// fails with `ConcurrencyConflict`. Returns the cart as stored, with its
    /// version bumped.
    async fn save_cart(&self, cart: &Cart) -> Result<Cart>;

    /// Overwrites the stored totals without touching the items.
    async fn update_totals(
        &self,
        cart_id: CartId,
        total_price: Money,
        final_price: Money,
    ) -> Result<Cart>;

    /// Deletes a cart. Returns false if it did not exist.
    async fn delete_cart(&self, cart_id: CartId) -> Result<bool>;
}

/// Extension trait providing convenience methods for cart stores.
#[async_trait]
pub trait CartStoreExt: CartStore {
    /// Retrieves a cart, failing with `CartNotFound` if it does not exist.
    async fn require_cart(&self, cart_id: CartId) -> Result<Cart> {
        self.get_cart(cart_id)
            .await?
            .ok_or(StoreError::CartNotFound(cart_id))
    }
}

impl<T: CartStore + ?Sized> CartStoreExt for T {}
