//! Results of checkout and settlement operations.

use domain::{InvoiceId, InvoiceStatus, Order};
use payment::{GatewayBusinessError, GatewayValidationError, RefundReceipt};
use serde::Serialize;

/// What is known about a payment attempt that was not rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    /// The gateway created an invoice. Settlement is confirmed later by a
    /// status check.
    Executed {
        invoice_id: InvoiceId,
        payment_url: Option<String>,
    },
    /// The execute call timed out or could not be delivered. The order stays
    /// `CREATED` until a retry or status check resolves it.
    Indeterminate { reason: String },
}

/// A payment attempt: an outcome, or the gateway's business rejection.
pub type PaymentAttempt = Result<PaymentOutcome, GatewayBusinessError>;

/// Result of a checkout call.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    /// `None` when no payment was attempted.
    pub payment: Option<PaymentAttempt>,
    /// True if an order for this cart already existed.
    pub reused: bool,
}

impl CheckoutOutcome {
    /// Structured gateway errors, if the payment was rejected.
    pub fn errors(&self) -> Option<Vec<GatewayValidationError>> {
        match &self.payment {
            Some(Err(rejection)) => Some(rejection.error_list()),
            _ => None,
        }
    }

    /// The successful payment outcome, if any.
    pub fn payment_outcome(&self) -> Option<&PaymentOutcome> {
        self.payment.as_ref().and_then(|attempt| attempt.as_ref().ok())
    }

    /// Returns true if the cart was kept for a retry.
    pub fn cart_retained(&self) -> bool {
        matches!(
            self.payment,
            Some(Err(_)) | Some(Ok(PaymentOutcome::Indeterminate { .. }))
        )
    }
}

/// Result of a refund request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RefundOutcome {
    Refunded(RefundReceipt),
    /// Needs manual follow-up.
    Rejected(GatewayBusinessError),
    Indeterminate { reason: String },
}

impl RefundOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RefundOutcome::Refunded(_) => "refunded",
            RefundOutcome::Rejected(_) => "rejected",
            RefundOutcome::Indeterminate { .. } => "indeterminate",
        }
    }
}

/// Result of a payment status check.
#[derive(Debug, Clone)]
pub struct SettlementReport {
    pub order: Order,
    pub gateway_status: InvoiceStatus,
    /// True if this check moved the order to a settled status.
    pub changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{CustomerId, VendorId};
    use domain::{Cart, CartItem, CustomerInfo, DeliveryMethod, ItemAttributes, Money};
    use domain::{OrderNumber, PaymentMethod, ProductType};

    fn order() -> Order {
        let mut cart = Cart::new(CustomerId::new(), VendorId::new(), Utc::now());
        cart.add_item(CartItem::new(
            "p1",
            "S",
            Money::from_cents(100),
            1,
            ItemAttributes::empty(ProductType::Product),
        ))
        .unwrap();
        cart.delivery_method = Some(DeliveryMethod::Pickup);
        cart.payment_method = Some(PaymentMethod::Online);
        cart.customer_info = Some(CustomerInfo {
            first_name: "Sara".into(),
            last_name: "Ali".into(),
            email: "sara@example.com".into(),
            phone: None,
        });
        Order::from_cart(&cart, OrderNumber::new("SHOP-ABCDEFGH"), Utc::now()).unwrap()
    }

    #[test]
    fn test_rejection_exposes_errors_and_keeps_cart() {
        let outcome = CheckoutOutcome {
            order: order(),
            payment: Some(Err(
                GatewayBusinessError::new("Invalid data").with_error("SessionId", "expired")
            )),
            reused: false,
        };

        let errors = outcome.errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].name, "SessionId");
        assert!(outcome.cart_retained());
        assert!(outcome.payment_outcome().is_none());
    }

    #[test]
    fn test_executed_disposes_cart() {
        let outcome = CheckoutOutcome {
            order: order(),
            payment: Some(Ok(PaymentOutcome::Executed {
                invoice_id: InvoiceId::new("100001"),
                payment_url: None,
            })),
            reused: false,
        };
        assert!(outcome.errors().is_none());
        assert!(!outcome.cart_retained());

        let cash = CheckoutOutcome {
            payment: None,
            ..outcome
        };
        assert!(!cash.cart_retained());
    }

    #[test]
    fn test_indeterminate_keeps_cart() {
        let outcome = CheckoutOutcome {
            order: order(),
            payment: Some(Ok(PaymentOutcome::Indeterminate {
                reason: "timed out".into(),
            })),
            reused: true,
        };
        assert!(outcome.cart_retained());
        assert!(outcome.errors().is_none());
    }

    #[test]
    fn test_payment_outcome_serializes_tagged() {
        let json = serde_json::to_value(PaymentOutcome::Executed {
            invoice_id: InvoiceId::new("42"),
            payment_url: Some("https://pay.example/42".into()),
        })
        .unwrap();
        assert_eq!(json["outcome"], "executed");
        assert_eq!(json["invoice_id"], "42");
    }
}
