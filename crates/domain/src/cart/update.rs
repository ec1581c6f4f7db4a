//! Whitelisted cart field updates.

use serde::{Deserialize, Deserializer, Serialize};

use crate::value_objects::{Address, AppliedCoupon, CustomerInfo, DeliveryMethod, PaymentMethod};

/// The cart fields a client may change directly.
///
/// Each field distinguishes "leave as is" (`None`) from "clear" (`Some(None)`)
/// and "set" (`Some(Some(v))`). In JSON that is: key absent, `null`, value.
/// Items and prices are not here; they change only through line-item
/// operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CartUpdate {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub delivery_method: Option<Option<DeliveryMethod>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<Option<PaymentMethod>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub consignee_address: Option<Option<Address>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub shipper_address: Option<Option<Address>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub applied_coupon: Option<Option<AppliedCoupon>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub customer_info: Option<Option<CustomerInfo>>,
}

impl CartUpdate {
    /// Returns true if the update touches no field.
    pub fn is_empty(&self) -> bool {
        self.delivery_method.is_none()
            && self.payment_method.is_none()
            && self.consignee_address.is_none()
            && self.shipper_address.is_none()
            && self.applied_coupon.is_none()
            && self.customer_info.is_none()
    }

    pub fn delivery_method(mut self, method: DeliveryMethod) -> Self {
        self.delivery_method = Some(Some(method));
        self
    }

    pub fn payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = Some(Some(method));
        self
    }

    pub fn consignee_address(mut self, address: Address) -> Self {
        self.consignee_address = Some(Some(address));
        self
    }

    pub fn customer_info(mut self, info: CustomerInfo) -> Self {
        self.customer_info = Some(Some(info));
        self
    }

    pub fn applied_coupon(mut self, coupon: AppliedCoupon) -> Self {
        self.applied_coupon = Some(Some(coupon));
        self
    }
}

// A present key (even `null`) deserializes to `Some(..)`; absent keys hit `default`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_null_and_value_are_distinct() {
        let update: CartUpdate = serde_json::from_value(serde_json::json!({
            "payment_method": "CASH",
            "shipper_address": null
        }))
        .unwrap();

        assert_eq!(update.payment_method, Some(Some(PaymentMethod::Cash)));
        assert_eq!(update.shipper_address, Some(None));
        assert_eq!(update.delivery_method, None);
        assert!(!update.is_empty());
    }

    #[test]
    fn test_empty_update() {
        let update: CartUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.is_empty());
    }

    #[test]
    fn test_non_whitelisted_fields_are_rejected() {
        let result: Result<CartUpdate, _> =
            serde_json::from_value(serde_json::json!({ "total_price": 1 }));
        assert!(result.is_err());
    }
}
