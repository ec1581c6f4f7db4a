//! Order status state machine and gateway invoice statuses.

use serde::{Deserialize, Serialize};

use crate::value_objects::{ParseEnumError, PaymentMethod};

/// Settlement status of an order.
///
/// State transitions:
/// ```text
/// (ONLINE) Created ──┬──► Pending   (gateway reports Paid)
///                    └──► Failed    (gateway reports anything else definitive)
/// (CASH)   Pending
/// ```
/// `Pending` and `Failed` are terminal for checkout; later fulfillment
/// states are driven elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Awaiting confirmation of an online payment.
    Created,
    /// Payment settled, or cash order awaiting fulfillment.
    Pending,
    /// Payment declined or cancelled at the gateway.
    Failed,
}

impl OrderStatus {
    /// Status a freshly created order starts in.
    pub fn initial_for(payment_method: PaymentMethod) -> Self {
        if payment_method.is_online() {
            OrderStatus::Created
        } else {
            OrderStatus::Pending
        }
    }

    /// Returns true while an online payment is unconfirmed.
    pub fn is_awaiting_payment(&self) -> bool {
        matches!(self, OrderStatus::Created)
    }

    /// Returns true if settlement can no longer change this status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Failed)
    }

    /// Maps a gateway invoice status onto the next order status.
    ///
    /// Returns `None` when nothing should change: the gateway is still
    /// pending, or the order is already settled.
    pub fn settle(&self, invoice: &InvoiceStatus) -> Option<OrderStatus> {
        if !self.is_awaiting_payment() {
            return None;
        }
        match invoice {
            InvoiceStatus::Pending => None,
            InvoiceStatus::Paid => Some(OrderStatus::Pending),
            InvoiceStatus::Canceled | InvoiceStatus::Other(_) => Some(OrderStatus::Failed),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "CREATED",
            OrderStatus::Pending => "PENDING",
            OrderStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(OrderStatus::Created),
            "PENDING" => Ok(OrderStatus::Pending),
            "FAILED" => Ok(OrderStatus::Failed),
            other => Err(ParseEnumError {
                kind: "order status",
                value: other.to_string(),
            }),
        }
    }
}

/// Invoice status as reported by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Canceled,
    /// Any status the gateway may add later; treated as a failure.
    Other(String),
}

impl InvoiceStatus {
    /// Returns true if the gateway has reached a final verdict.
    pub fn is_definitive(&self) -> bool {
        !matches!(self, InvoiceStatus::Pending)
    }

    pub fn as_str(&self) -> &str {
        match self {
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Paid => "Paid",
            InvoiceStatus::Canceled => "Canceled",
            InvoiceStatus::Other(s) => s,
        }
    }
}

impl From<String> for InvoiceStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Pending" => InvoiceStatus::Pending,
            "Paid" => InvoiceStatus::Paid,
            "Canceled" => InvoiceStatus::Canceled,
            _ => InvoiceStatus::Other(s),
        }
    }
}

impl From<InvoiceStatus> for String {
    fn from(status: InvoiceStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
