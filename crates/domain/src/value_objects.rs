//! Value objects shared by carts and orders.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Catalog product identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new product ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the product ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Stock keeping unit of a product variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Creates a new SKU from a string.
    pub fn new(sku: impl Into<String>) -> Self {
        Self(sku.into())
    }

    /// Returns the SKU as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Sku {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Sku {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Contact details of the customer placing the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl CustomerInfo {
    /// Returns `"{first} {last}"`, the name sent to the payment gateway.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Returns the email if it is non-blank.
    pub fn contact_email(&self) -> Option<&str> {
        let email = self.email.trim();
        (!email.is_empty()).then_some(email)
    }
}

/// Postal address used for consignee and shipper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A coupon the customer applied to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
}

/// Returned when a stored or submitted enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Paid on fulfillment; no gateway involvement.
    Cash,
    /// Paid through the payment gateway at checkout.
    Online,
}

impl PaymentMethod {
    pub fn is_online(&self) -> bool {
        matches!(self, PaymentMethod::Online)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Online => "ONLINE",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CASH" => Ok(PaymentMethod::Cash),
            "ONLINE" => Ok(PaymentMethod::Online),
            other => Err(ParseEnumError {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMethod {
    /// Customer collects from the vendor.
    Pickup,
    /// Vendor delivers locally.
    Delivery,
    /// Shipped through a carrier.
    Shipping,
}

impl DeliveryMethod {
    /// Returns true if checkout needs a consignee address for this method.
    pub fn requires_consignee_address(&self) -> bool {
        matches!(self, DeliveryMethod::Delivery | DeliveryMethod::Shipping)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Pickup => "PICKUP",
            DeliveryMethod::Delivery => "DELIVERY",
            DeliveryMethod::Shipping => "SHIPPING",
        }
    }
}

impl std::fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DeliveryMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PICKUP" => Ok(DeliveryMethod::Pickup),
            "DELIVERY" => Ok(DeliveryMethod::Delivery),
            "SHIPPING" => Ok(DeliveryMethod::Shipping),
            other => Err(ParseEnumError {
                kind: "delivery method",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let info = CustomerInfo {
            first_name: "Sara".to_string(),
            last_name: "Ali".to_string(),
            email: "sara@example.com".to_string(),
            phone: None,
        };
        assert_eq!(info.full_name(), "Sara Ali");
        assert_eq!(info.contact_email(), Some("sara@example.com"));
    }

    #[test]
    fn test_blank_email_is_not_a_contact() {
        let info = CustomerInfo {
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            email: "  ".to_string(),
            phone: None,
        };
        assert_eq!(info.contact_email(), None);
    }

    #[test]
    fn test_payment_method_strings() {
        assert_eq!("ONLINE".parse::<PaymentMethod>().unwrap(), PaymentMethod::Online);
        assert_eq!(PaymentMethod::Cash.to_string(), "CASH");
        assert!("card".parse::<PaymentMethod>().is_err());
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Online).unwrap(),
            "\"ONLINE\""
        );
    }

    #[test]
    fn test_delivery_method_address_requirement() {
        assert!(!DeliveryMethod::Pickup.requires_consignee_address());
        assert!(DeliveryMethod::Delivery.requires_consignee_address());
        assert!(DeliveryMethod::Shipping.requires_consignee_address());
        assert_eq!("PICKUP".parse::<DeliveryMethod>().unwrap(), DeliveryMethod::Pickup);
    }
}
