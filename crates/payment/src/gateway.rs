use async_trait::async_trait;
use domain::{InvoiceId, InvoiceStatus, Money, Order};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Gateway-issued token for one customer payment attempt.
///
/// Not persisted locally; the client carries it from initiation to checkout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the token is blank.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A freshly initiated payment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub session_id: SessionId,
    pub country_code: Option<String>,
}

/// Invoice created by a successful execute call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: InvoiceId,
    /// Where to send the customer to complete payment, if the gateway
    /// requires a redirect.
    pub payment_url: Option<String>,
    pub is_direct_payment: bool,
}

/// Current gateway view of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceReport {
    pub invoice_id: InvoiceId,
    pub status: InvoiceStatus,
    pub invoice_value: Option<f64>,
    pub customer_reference: Option<String>,
}

/// Gateway acknowledgement of a refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundReceipt {
    pub key: Option<String>,
    pub refund_id: Option<String>,
    pub refund_reference: Option<String>,
    pub refund_amount: Option<f64>,
    pub comment: Option<String>,
}

/// Client for the external payment provider.
///
/// Every operation is a single outbound call. Implementations must report
/// business rejections as [`GatewayError::Rejected`](crate::GatewayError)
/// and everything else that leaves the outcome unknown as one of the
/// indeterminate variants.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Obtains a session token for a new payment attempt.
    async fn initiate_session(&self) -> Result<PaymentSession>;

    /// Submits an order for payment against a session.
    ///
    /// `vendor_slug` is used to build the success and failure redirects.
    async fn execute(
        &self,
        order: &Order,
        session_id: &SessionId,
        vendor_slug: &str,
    ) -> Result<Invoice>;

    /// Queries the current status of an invoice.
    async fn payment_status(&self, invoice_id: &InvoiceId) -> Result<InvoiceReport>;

    /// Issues a full refund of `amount` against an invoice.
    async fn refund(&self, invoice_id: &InvoiceId, amount: Money) -> Result<RefundReceipt>;
}
