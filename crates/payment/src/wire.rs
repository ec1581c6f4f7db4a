//! Request and response bodies exchanged with the gateway.
//!
//! Field names are defined by the provider and mirrored exactly.

use domain::{InvoiceId, InvoiceStatus, Money, Order};
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::GatewayConfig;
use crate::error::{GatewayBusinessError, GatewayValidationError};

pub const INITIATE_SESSION_PATH: &str = "/v2/InitiateSession";
pub const EXECUTE_PAYMENT_PATH: &str = "/v2/ExecutePayment";
pub const PAYMENT_STATUS_PATH: &str = "/v2/GetPaymentStatus";
pub const MAKE_REFUND_PATH: &str = "/v2/MakeRefund";

const KEY_TYPE_INVOICE: &str = "invoiceid";

/// Envelope wrapping every gateway response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiResponse<T> {
    pub is_success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub validation_errors: Option<Vec<WireValidationError>>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Builds the business error carried by an unsuccessful response.
    pub fn business_error(&self) -> GatewayBusinessError {
        GatewayBusinessError {
            message: self
                .message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Payment gateway rejected the request".to_string()),
            errors: self
                .validation_errors
                .iter()
                .flatten()
                .map(|e| GatewayValidationError {
                    name: e.name.clone(),
                    error: e.error.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireValidationError {
    pub name: String,
    pub error: String,
}

/// `InitiateSession` response data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InitiateSessionData {
    pub session_id: String,
    #[serde(default)]
    pub country_code: Option<String>,
}

/// `ExecutePayment` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutePaymentRequest {
    pub session_id: String,
    pub invoice_value: f64,
    pub customer_name: String,
    pub display_currency_iso: String,
    pub customer_email: String,
    pub customer_reference: String,
    pub call_back_url: String,
    pub error_url: String,
    pub invoice_items: Vec<InvoiceItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InvoiceItem {
    pub item_name: String,
    pub quantity: u32,
    pub unit_price: f64,
}

impl ExecutePaymentRequest {
    /// Builds the request for an order.
    ///
    /// Invoice items map 1:1 onto order items so settlement can be matched
    /// back line by line.
    pub fn for_order(
        order: &Order,
        session_id: &str,
        vendor_slug: &str,
        config: &GatewayConfig,
    ) -> Self {
        let (customer_name, customer_email) = order
            .customer_info
            .as_ref()
            .map(|c| (c.full_name(), c.email.clone()))
            .unwrap_or_default();

        Self {
            session_id: session_id.to_string(),
            invoice_value: order.final_price.to_decimal(),
            customer_name,
            display_currency_iso: config.currency.clone(),
            customer_email,
            customer_reference: order.order_number.to_string(),
            call_back_url: config.callback_url_for(vendor_slug, order.id),
            error_url: config.error_url_for(vendor_slug, order.id),
            invoice_items: order
                .items
                .iter()
                .map(|item| InvoiceItem {
                    item_name: item.invoice_name(),
                    quantity: item.quantity,
                    unit_price: item.price.to_decimal(),
                })
                .collect(),
        }
    }
}

/// `ExecutePayment` response data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExecutePaymentData {
    #[serde(deserialize_with = "string_or_number")]
    pub invoice_id: String,
    #[serde(default)]
    pub is_direct_payment: bool,
    #[serde(rename = "PaymentURL", default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub customer_reference: Option<String>,
}

/// Body shared by `GetPaymentStatus` and the key part of `MakeRefund`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentStatusRequest {
    pub key: String,
    pub key_type: String,
}

impl PaymentStatusRequest {
    pub fn for_invoice(invoice_id: &InvoiceId) -> Self {
        Self {
            key: invoice_id.to_string(),
            key_type: KEY_TYPE_INVOICE.to_string(),
        }
    }
}

/// `GetPaymentStatus` response data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentStatusData {
    #[serde(deserialize_with = "string_or_number")]
    pub invoice_id: String,
    pub invoice_status: InvoiceStatus,
    #[serde(default)]
    pub invoice_value: Option<f64>,
    #[serde(default)]
    pub customer_reference: Option<String>,
}

/// `MakeRefund` request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RefundRequest {
    pub key: String,
    pub key_type: String,
    pub refund_charge_on_customer: bool,
    pub service_charge_on_customer: bool,
    pub amount: f64,
    pub comment: String,
    pub amount_deducted_from_supplier: f64,
}

impl RefundRequest {
    /// Full refund with both charges borne by the customer.
    ///
    /// The comment echoes the invoice id for audit correlation.
    pub fn full(invoice_id: &InvoiceId, amount: Money) -> Self {
        Self {
            key: invoice_id.to_string(),
            key_type: KEY_TYPE_INVOICE.to_string(),
            refund_charge_on_customer: true,
            service_charge_on_customer: true,
            amount: amount.to_decimal(),
            comment: invoice_id.to_string(),
            amount_deducted_from_supplier: 0.0,
        }
    }
}

/// `MakeRefund` response data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RefundData {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub refund_id: Option<String>,
    #[serde(default)]
    pub refund_reference: Option<String>,
    #[serde(default)]
    pub refund_amount: Option<f64>,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{CustomerId, VendorId};
    use domain::{
        Cart, CartItem, CustomerInfo, DeliveryMethod, ItemAttributes, OrderNumber, PaymentMethod,
        ProductType,
    };
    use serde_json::json;

    fn online_order() -> Order {
        let mut cart = Cart::new(CustomerId::new(), VendorId::new(), Utc::now());
        cart.add_item(CartItem::new(
            "prod-1",
            "BLUE-L",
            Money::from_cents(1050),
            2,
            ItemAttributes::empty(ProductType::Product),
        ))
        .unwrap();
        cart.add_item(CartItem::new(
            "ws-9",
            "SEAT",
            Money::from_cents(2500),
            1,
            ItemAttributes::empty(ProductType::Workshop),
        ))
        .unwrap();
        cart.delivery_method = Some(DeliveryMethod::Pickup);
        cart.payment_method = Some(PaymentMethod::Online);
        cart.customer_info = Some(CustomerInfo {
            first_name: "Sara".to_string(),
            last_name: "Ali".to_string(),
            email: "sara@example.com".to_string(),
            phone: None,
        });
        Order::from_cart(&cart, OrderNumber::new("ACME-AB12CD34"), Utc::now()).unwrap()
    }

    #[test]
    fn test_execute_request_wire_shape() {
        let order = online_order();
        let request = ExecutePaymentRequest::for_order(
            &order,
            "sess-1",
            "acme",
            &GatewayConfig::default(),
        );
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["SessionId"], "sess-1");
        assert_eq!(value["InvoiceValue"], json!(46.0));
        assert_eq!(value["CustomerName"], "Sara Ali");
        assert_eq!(value["CustomerEmail"], "sara@example.com");
        assert_eq!(value["DisplayCurrencyIso"], "KWD");
        assert_eq!(value["CustomerReference"], "ACME-AB12CD34");
        assert_eq!(
            value["CallBackUrl"],
            format!("https://app.dev.anyaa.io/acme/checkout/{}/confirmation", order.id)
        );
        assert_eq!(
            value["InvoiceItems"],
            json!([
                {"ItemName": "prod-1_BLUE-L", "Quantity": 2, "UnitPrice": 10.5},
                {"ItemName": "ws-9_SEAT", "Quantity": 1, "UnitPrice": 25.0},
            ])
        );
    }

    #[test]
    fn test_refund_request_wire_shape() {
        let request = RefundRequest::full(&InvoiceId::new("613842"), Money::from_cents(4600));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "Key": "613842",
                "KeyType": "invoiceid",
                "RefundChargeOnCustomer": true,
                "ServiceChargeOnCustomer": true,
                "Amount": 46.0,
                "Comment": "613842",
                "AmountDeductedFromSupplier": 0.0,
            })
        );
    }

    #[test]
    fn test_invoice_id_accepts_number_or_string() {
        let numeric: ExecutePaymentData = serde_json::from_value(json!({
            "InvoiceId": 613842,
            "IsDirectPayment": false,
            "PaymentURL": "https://pay.example/613842",
        }))
        .unwrap();
        assert_eq!(numeric.invoice_id, "613842");
        assert_eq!(numeric.payment_url.as_deref(), Some("https://pay.example/613842"));

        let text: PaymentStatusData = serde_json::from_value(json!({
            "InvoiceId": "613842",
            "InvoiceStatus": "Paid",
        }))
        .unwrap();
        assert_eq!(text.invoice_id, "613842");
        assert_eq!(text.invoice_status, InvoiceStatus::Paid);
    }

    #[test]
    fn test_envelope_business_error() {
        let response: ApiResponse<ExecutePaymentData> = serde_json::from_value(json!({
            "IsSuccess": false,
            "Message": "Invalid data",
            "ValidationErrors": [{"Name": "SessionId", "Error": "Session expired"}],
            "Data": null,
        }))
        .unwrap();

        assert!(!response.is_success);
        assert!(response.data.is_none());
        let err = response.business_error();
        assert_eq!(err.message, "Invalid data");
        assert_eq!(err.errors[0].name, "SessionId");
        assert_eq!(err.errors[0].error, "Session expired");
    }
}
