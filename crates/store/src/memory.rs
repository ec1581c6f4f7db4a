use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, CustomerId, OrderId, VendorId};
use domain::{Cart, InvoiceId, Money, Order, OrderNumber, StatusChange};
use tokio::sync::RwLock;

use crate::cart::CartStore;
use crate::ledger::{LedgerInsert, OrderLedger, initial_status_change};
use crate::{Result, StoreError};

#[derive(Default)]
struct LedgerState {
    orders: HashMap<OrderId, Order>,
    history: Vec<StatusChange>,
}

/// In-memory cart store and order ledger for testing.
///
/// Provides the same interface as the PostgreSQL implementation. Clones
/// share state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    carts: Arc<RwLock<HashMap<CartId, Cart>>>,
    ledger: Arc<RwLock<LedgerState>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the number of carts stored.
    pub async fn cart_count(&self) -> usize {
        self.carts.read().await.len()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.ledger.read().await.orders.len()
    }

    /// Stores a cart as-is, bypassing version checks.
    ///
    /// Lets tests plant carts whose stored totals have drifted.
    pub async fn put_cart_raw(&self, cart: Cart) {
        self.carts.write().await.insert(cart.id, cart);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CartStore for InMemoryStore {
    async fn insert_cart(&self, cart: &Cart) -> Result<()> {
        self.check_available()?;
        let mut carts = self.carts.write().await;

        if carts
            .values()
            .any(|c| c.customer_id == cart.customer_id && c.vendor_id == cart.vendor_id)
        {
            return Err(StoreError::DuplicateCart {
                customer_id: cart.customer_id,
                vendor_id: cart.vendor_id,
            });
        }

        carts.insert(cart.id, cart.clone());
        Ok(())
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<Option<Cart>> {
        self.check_available()?;
        Ok(self.carts.read().await.get(&cart_id).cloned())
    }

    async fn find_cart(
        &self,
        customer_id: CustomerId,
        vendor_id: VendorId,
    ) -> Result<Option<Cart>> {
        self.check_available()?;
        Ok(self
            .carts
            .read()
            .await
            .values()
            .find(|c| c.customer_id == customer_id && c.vendor_id == vendor_id)
            .cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Cart> {
        self.check_available()?;
        let mut carts = self.carts.write().await;

        let stored = carts
            .get_mut(&cart.id)
            .ok_or(StoreError::CartNotFound(cart.id))?;

        if stored.version != cart.version {
            return Err(StoreError::ConcurrencyConflict {
                cart_id: cart.id,
                expected: cart.version,
                actual: stored.version,
            });
        }

        let mut next = cart.clone();
        next.version = cart.version + 1;
        next.updated_at = Utc::now();
        *stored = next.clone();
        Ok(next)
    }

    async fn update_totals(
        &self,
        cart_id: CartId,
        total_price: Money,
        final_price: Money,
    ) -> Result<Cart> {
        self.check_available()?;
        let mut carts = self.carts.write().await;

        let stored = carts
            .get_mut(&cart_id)
            .ok_or(StoreError::CartNotFound(cart_id))?;
        stored.total_price = total_price;
        stored.final_price = final_price;
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_cart(&self, cart_id: CartId) -> Result<bool> {
        self.check_available()?;
        Ok(self.carts.write().await.remove(&cart_id).is_some())
    }
}

#[async_trait]
impl OrderLedger for InMemoryStore {
    async fn insert_if_absent(&self, order: &Order) -> Result<LedgerInsert> {
        self.check_available()?;
        let mut ledger = self.ledger.write().await;

        if let Some(existing) = ledger.orders.values().find(|o| o.cart_id == order.cart_id) {
            return Ok(LedgerInsert::Existing(existing.clone()));
        }

        ledger.orders.insert(order.id, order.clone());
        ledger.history.push(initial_status_change(order));
        Ok(LedgerInsert::Inserted(order.clone()))
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        self.check_available()?;
        Ok(self.ledger.read().await.orders.get(&order_id).cloned())
    }

    async fn find_order_by_cart(&self, cart_id: CartId) -> Result<Option<Order>> {
        self.check_available()?;
        Ok(self
            .ledger
            .read()
            .await
            .orders
            .values()
            .find(|o| o.cart_id == cart_id)
            .cloned())
    }

    async fn find_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>> {
        self.check_available()?;
        Ok(self
            .ledger
            .read()
            .await
            .orders
            .values()
            .find(|o| &o.order_number == number)
            .cloned())
    }

    async fn record_invoice(
        &self,
        order_id: OrderId,
        invoice_id: &InvoiceId,
        at: DateTime<Utc>,
    ) -> Result<Order> {
        self.check_available()?;
        let mut ledger = self.ledger.write().await;

        let order = ledger
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::OrderNotFound(order_id))?;
        order.invoice_id = Some(invoice_id.clone());
        order.updated_at = at;
        Ok(order.clone())
    }

    async fn update_status(&self, change: &StatusChange) -> Result<Order> {
        self.check_available()?;
        let mut ledger = self.ledger.write().await;

        let order = ledger
            .orders
            .get_mut(&change.order_id)
            .ok_or(StoreError::OrderNotFound(change.order_id))?;

        if let Some(expected) = change.from
            && order.status != expected
        {
            return Err(StoreError::StatusConflict {
                order_id: change.order_id,
                expected,
                actual: order.status,
            });
        }

        order.status = change.to;
        order.updated_at = change.recorded_at;
        let updated = order.clone();
        ledger.history.push(change.clone());
        Ok(updated)
    }

    async fn status_history(&self, order_id: OrderId) -> Result<Vec<StatusChange>> {
        self.check_available()?;
        Ok(self
            .ledger
            .read()
            .await
            .history
            .iter()
            .filter(|c| c.order_id == order_id)
            .cloned()
            .collect())
    }
}
