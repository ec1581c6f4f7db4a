use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, OrderId};
use domain::{InvoiceId, Order, OrderNumber, StatusChange};

use crate::{Result, StoreError};

/// Outcome of a conditional order insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerInsert {
    /// No order existed for the cart; this one was stored.
    Inserted(Order),
    /// An order for the cart already existed and was left untouched.
    Existing(Order),
}

impl LedgerInsert {
    pub fn was_inserted(&self) -> bool {
        matches!(self, LedgerInsert::Inserted(_))
    }

    pub fn order(&self) -> &Order {
        match self {
            LedgerInsert::Inserted(order) | LedgerInsert::Existing(order) => order,
        }
    }

    pub fn into_order(self) -> Order {
        match self {
            LedgerInsert::Inserted(order) | LedgerInsert::Existing(order) => order,
        }
    }
}

/// Append-mostly store of order records.
///
/// At most one order exists per cart ID; [`OrderLedger::insert_if_absent`]
/// enforces that atomically.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Stores the order unless one already exists for `order.cart_id`, in
    /// which case the existing order is returned instead.
    ///
    /// The initial status is appended to the status history on insert.
    async fn insert_if_absent(&self, order: &Order) -> Result<LedgerInsert>;

    /// Retrieves an order by its internal ID.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Retrieves the order created from a cart.
    async fn find_order_by_cart(&self, cart_id: CartId) -> Result<Option<Order>>;

    /// Retrieves an order by its human-facing number.
    async fn find_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>>;

    /// Records the gateway invoice of an executed payment.
    async fn record_invoice(
        &self,
        order_id: OrderId,
        invoice_id: &InvoiceId,
        at: DateTime<Utc>,
    ) -> Result<Order>;

    /// Applies a status change and appends it to the history.
    ///
    /// Fails with `StatusConflict` if the stored status is not `change.from`.
    async fn update_status(&self, change: &StatusChange) -> Result<Order>;

    /// Returns the status history of an order, oldest first.
    async fn status_history(&self, order_id: OrderId) -> Result<Vec<StatusChange>>;
}

/// Extension trait providing convenience methods for order ledgers.
#[async_trait]
pub trait OrderLedgerExt: OrderLedger {
    /// Retrieves an order, failing with `OrderNotFound` if it does not exist.
    async fn require_order(&self, order_id: OrderId) -> Result<Order> {
        self.get_order(order_id)
            .await?
            .ok_or(StoreError::OrderNotFound(order_id))
    }
}

impl<T: OrderLedger + ?Sized> OrderLedgerExt for T {}

/// History entry for the status an order is created with.
pub(crate) fn initial_status_change(order: &Order) -> StatusChange {
    StatusChange {
        order_id: order.id,
        from: None,
        to: order.status,
        recorded_at: order.created_at,
    }
}
