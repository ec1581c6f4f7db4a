//! Immutable order record.

use chrono::{DateTime, Utc};
use common::{CartId, CustomerId, OrderId, VendorId};
use serde::{Deserialize, Serialize};

use super::{OrderError, OrderNumber, OrderStatus};
use crate::cart::{Cart, CartItem};
use crate::money::Money;
use crate::value_objects::{Address, AppliedCoupon, CustomerInfo, DeliveryMethod, PaymentMethod};

/// Gateway-side invoice identifier recorded once payment executes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(String);

impl InvoiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Post-checkout snapshot of a cart.
///
/// Everything except `status`, `invoice_id` and `updated_at` is fixed at
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub cart_id: CartId,
    pub vendor_id: VendorId,
    pub customer_id: CustomerId,
    pub customer_info: Option<CustomerInfo>,
    pub items: Vec<CartItem>,
    pub payment_method: PaymentMethod,
    pub delivery_method: DeliveryMethod,
    pub consignee_address: Option<Address>,
    pub shipper_address: Option<Address>,
    pub applied_coupon: Option<AppliedCoupon>,
    pub total_price: Money,
    pub final_price: Money,
    pub status: OrderStatus,
    pub invoice_id: Option<InvoiceId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Snapshots a checkout-ready cart into a new order.
    ///
    /// Prices are taken from the item fold, never from the stored totals.
    pub fn from_cart(
        cart: &Cart,
        order_number: OrderNumber,
        now: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        let (delivery_method, payment_method) = cart.checkout_selection()?;
        let total = cart.computed_total()?;

        Ok(Self {
            id: OrderId::new(),
            order_number,
            cart_id: cart.id,
            vendor_id: cart.vendor_id,
            customer_id: cart.customer_id,
            customer_info: cart.customer_info.clone(),
            items: cart.items.clone(),
            payment_method,
            delivery_method,
            consignee_address: cart.consignee_address.clone(),
            shipper_address: cart.shipper_address.clone(),
            applied_coupon: cart.applied_coupon.clone(),
            total_price: total,
            final_price: total,
            status: OrderStatus::initial_for(payment_method),
            invoice_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true if this order goes through the payment gateway.
    pub fn is_online(&self) -> bool {
        self.payment_method.is_online()
    }

    /// Moves an online order out of `Created` and returns the history entry.
    pub fn transition_to(
        &mut self,
        to: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, OrderError> {
        if !self.status.is_awaiting_payment() || to == OrderStatus::Created {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        let change = StatusChange {
            order_id: self.id,
            from: Some(self.status),
            to,
            recorded_at: now,
        };
        self.status = to;
        self.updated_at = now;
        Ok(change)
    }

    /// Customer email to notify, if any.
    pub fn customer_email(&self) -> Option<&str> {
        self.customer_info.as_ref().and_then(CustomerInfo::contact_email)
    }

    /// Returns true if `candidate`, snapshotted from the same cart later,
    /// would charge for the same thing: same items, totals, payment and
    /// delivery.
    pub fn same_snapshot(&self, candidate: &Order) -> bool {
        self.cart_id == candidate.cart_id
            && self.items == candidate.items
            && self.total_price == candidate.total_price
            && self.final_price == candidate.final_price
            && self.payment_method == candidate.payment_method
            && self.delivery_method == candidate.delivery_method
            && self.consignee_address == candidate.consignee_address
    }
}

/// One entry of an order's append-only status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub order_id: OrderId,
    /// `None` for the status the order was created with.
    pub from: Option<OrderStatus>,
    pub to: OrderStatus,
    pub recorded_at: DateTime<Utc>,
}
