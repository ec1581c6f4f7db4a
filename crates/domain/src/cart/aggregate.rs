//! Cart aggregate.

use chrono::{DateTime, Utc};
use common::{CartId, CustomerId, VendorId};
use serde::{Deserialize, Serialize};

use super::{CartError, CartItem, CartItemPatch, CartUpdate};
use crate::money::Money;
use crate::value_objects::{
    Address, AppliedCoupon, CustomerInfo, DeliveryMethod, PaymentMethod, ProductId, Sku,
};

/// Mutable pre-checkout basket for one customer/vendor pair.
///
/// `total_price` and `final_price` always equal the fold
/// `sum(item.price * item.quantity)` after any mutation made through this
/// type. A cart read back from storage may still disagree with the fold;
/// [`Cart::reconcile_totals`] corrects that before checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub customer_id: CustomerId,
    pub vendor_id: VendorId,
    pub items: Vec<CartItem>,
    pub total_price: Money,
    pub final_price: Money,
    pub delivery_method: Option<DeliveryMethod>,
    pub payment_method: Option<PaymentMethod>,
    pub consignee_address: Option<Address>,
    pub shipper_address: Option<Address>,
    pub applied_coupon: Option<AppliedCoupon>,
    pub customer_info: Option<CustomerInfo>,
    /// Optimistic concurrency version, bumped by every store write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Creates an empty cart.
    pub fn new(customer_id: CustomerId, vendor_id: VendorId, now: DateTime<Utc>) -> Self {
        Self {
            id: CartId::new(),
            customer_id,
            vendor_id,
            items: Vec::new(),
            total_price: Money::zero(),
            final_price: Money::zero(),
            delivery_method: None,
            payment_method: None,
            consignee_address: None,
            shipper_address: None,
            applied_coupon: None,
            customer_info: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the price fold over the current items.
    pub fn computed_total(&self) -> Result<Money, CartError> {
        fold(&self.items)
    }

    /// Returns true if the stored totals disagree with the item fold.
    pub fn has_price_drift(&self) -> bool {
        match self.computed_total() {
            Ok(computed) => self.total_price != computed || self.final_price != computed,
            Err(_) => true,
        }
    }

    /// Resets the totals to the item fold. Returns true if they had drifted.
    pub fn reconcile_totals(&mut self) -> Result<bool, CartError> {
        let drifted = self.has_price_drift();
        let computed = self.computed_total()?;
        self.total_price = computed;
        self.final_price = computed;
        Ok(drifted)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Returns the line with the given composite key.
    pub fn find_item(&self, product_id: &ProductId, sku: &Sku) -> Option<&CartItem> {
        self.items.iter().find(|item| item.matches(product_id, sku))
    }

    /// Adds a line, or increases the quantity of an existing line with the
    /// same `(product_id, sku)`.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        validate_quantity(item.quantity)?;
        if item.price.cents() < 0 {
            return Err(CartError::InvalidPrice {
                price: item.price.cents(),
            });
        }

        let mut items = self.items.clone();
        match items
            .iter_mut()
            .find(|existing| existing.matches(&item.product_id, &item.sku))
        {
            Some(existing) => {
                existing.quantity = existing.quantity.checked_add(item.quantity).ok_or_else(
                    || CartError::QuantityOverflow {
                        product_id: item.product_id.clone(),
                        sku: item.sku.clone(),
                    },
                )?;
                existing.price = item.price;
            }
            None => items.push(item),
        }

        self.replace_items(items)
    }

    /// Applies a patch to the line with the given composite key.
    pub fn update_item(
        &mut self,
        product_id: &ProductId,
        sku: &Sku,
        patch: CartItemPatch,
    ) -> Result<(), CartError> {
        if let Some(quantity) = patch.quantity {
            validate_quantity(quantity)?;
        }

        let mut items = self.items.clone();
        let item = items
            .iter_mut()
            .find(|item| item.matches(product_id, sku))
            .ok_or_else(|| CartError::ItemNotFound {
                product_id: product_id.clone(),
                sku: sku.clone(),
            })?;

        if let Some(quantity) = patch.quantity {
            item.quantity = quantity;
        }
        if let Some(attributes) = patch.attributes {
            item.attributes = attributes;
        }

        self.replace_items(items)
    }

    /// Removes the line with the given composite key and returns it.
    pub fn remove_item(&mut self, product_id: &ProductId, sku: &Sku) -> Result<CartItem, CartError> {
        let index = self
            .items
            .iter()
            .position(|item| item.matches(product_id, sku))
            .ok_or_else(|| CartError::ItemNotFound {
                product_id: product_id.clone(),
                sku: sku.clone(),
            })?;

        let mut items = self.items.clone();
        let removed = items.remove(index);
        self.replace_items(items)?;
        Ok(removed)
    }

    /// Swaps in a new item list if its fold is representable. On error the
    /// cart is left untouched.
    fn replace_items(&mut self, items: Vec<CartItem>) -> Result<(), CartError> {
        let total = fold(&items)?;
        self.items = items;
        self.total_price = total;
        self.final_price = total;
        Ok(())
    }

    /// Applies a whitelisted field update.
    pub fn apply_update(&mut self, update: CartUpdate) {
        if let Some(v) = update.delivery_method {
            self.delivery_method = v;
        }
        if let Some(v) = update.payment_method {
            self.payment_method = v;
        }
        if let Some(v) = update.consignee_address {
            self.consignee_address = v;
        }
        if let Some(v) = update.shipper_address {
            self.shipper_address = v;
        }
        if let Some(v) = update.applied_coupon {
            self.applied_coupon = v;
        }
        if let Some(v) = update.customer_info {
            self.customer_info = v;
        }
    }

    /// Checks the cart is ready to become an order and returns the chosen
    /// delivery and payment methods.
    ///
    /// Checks run in order: delivery method, payment method, consignee
    /// address, items.
    pub fn checkout_selection(&self) -> Result<(DeliveryMethod, PaymentMethod), CartError> {
        let delivery = self
            .delivery_method
            .ok_or(CartError::DeliveryMethodRequired)?;
        let payment = self.payment_method.ok_or(CartError::PaymentMethodRequired)?;

        if delivery.requires_consignee_address() && self.consignee_address.is_none() {
            return Err(CartError::ConsigneeAddressRequired(delivery));
        }
        if self.is_empty() {
            return Err(CartError::Empty);
        }

        Ok((delivery, payment))
    }
}

fn fold(items: &[CartItem]) -> Result<Money, CartError> {
    items.iter().try_fold(Money::zero(), |total, item| {
        item.line_total()
            .and_then(|line| total.checked_add(line))
            .ok_or(CartError::AmountOverflow)
    })
}

fn validate_quantity(quantity: u32) -> Result<(), CartError> {
    if quantity == 0 {
        return Err(CartError::InvalidQuantity { quantity });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{ItemAttributes, ProductType};

    fn cart() -> Cart {
        Cart::new(CustomerId::new(), VendorId::new(), Utc::now())
    }

    fn item(product: &str, sku: &str, cents: i64, quantity: u32) -> CartItem {
        CartItem::new(
            product,
            sku,
            Money::from_cents(cents),
            quantity,
            ItemAttributes::empty(ProductType::Product),
        )
    }

    fn assert_fold(cart: &Cart) {
        let expected: i64 = cart
            .items
            .iter()
            .map(|i| i.price.cents() * i64::from(i.quantity))
            .sum();
        assert_eq!(cart.total_price.cents(), expected);
        assert_eq!(cart.final_price.cents(), expected);
    }

    #[test]
    fn test_new_cart_is_empty() {
        let cart = cart();
        assert!(cart.is_empty());
        assert!(cart.total_price.is_zero());
        assert_eq!(cart.version, 0);
    }

    #[test]
    fn test_fold_holds_after_every_mutation() {
        let mut cart = cart();

        cart.add_item(item("p1", "S", 1000, 2)).unwrap();
        assert_fold(&cart);
        cart.add_item(item("p1", "M", 1200, 1)).unwrap();
        assert_fold(&cart);
        cart.add_item(item("p2", "X", 350, 4)).unwrap();
        assert_fold(&cart);
        assert_eq!(cart.total_price.cents(), 2000 + 1200 + 1400);

        cart.update_item(
            &ProductId::new("p1"),
            &Sku::new("S"),
            CartItemPatch {
                quantity: Some(5),
                attributes: None,
            },
        )
        .unwrap();
        assert_fold(&cart);

        cart.remove_item(&ProductId::new("p2"), &Sku::new("X")).unwrap();
        assert_fold(&cart);
        assert_eq!(cart.total_price.cents(), 5000 + 1200);

        cart.remove_item(&ProductId::new("p1"), &Sku::new("S")).unwrap();
        cart.remove_item(&ProductId::new("p1"), &Sku::new("M")).unwrap();
        assert_fold(&cart);
        assert!(cart.total_price.is_zero());
    }

    #[test]
    fn test_add_same_key_merges_quantity() {
        let mut cart = cart();
        cart.add_item(item("p1", "S", 1000, 2)).unwrap();
        cart.add_item(item("p1", "S", 1000, 3)).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.total_price.cents(), 5000);
    }

    #[test]
    fn test_same_product_different_sku_are_separate_lines() {
        let mut cart = cart();
        cart.add_item(item("p1", "S", 1000, 1)).unwrap();
        cart.add_item(item("p1", "L", 1500, 1)).unwrap();
        assert_eq!(cart.item_count(), 2);

        cart.remove_item(&ProductId::new("p1"), &Sku::new("S")).unwrap();
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.items[0].sku, Sku::new("L"));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut cart = cart();
        assert_eq!(
            cart.add_item(item("p1", "S", 1000, 0)),
            Err(CartError::InvalidQuantity { quantity: 0 })
        );

        cart.add_item(item("p1", "S", 1000, 1)).unwrap();
        let result = cart.update_item(
            &ProductId::new("p1"),
            &Sku::new("S"),
            CartItemPatch {
                quantity: Some(0),
                attributes: None,
            },
        );
        assert!(matches!(result, Err(CartError::InvalidQuantity { .. })));
        assert_eq!(cart.items[0].quantity, 1);
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut cart = cart();
        let result = cart.add_item(item("p1", "S", -1, 1));
        assert!(matches!(result, Err(CartError::InvalidPrice { price: -1 })));
    }

    #[test]
    fn test_missing_item_errors() {
        let mut cart = cart();
        let err = cart
            .remove_item(&ProductId::new("nope"), &Sku::new("S"))
            .unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound { .. }));

        let err = cart
            .update_item(
                &ProductId::new("nope"),
                &Sku::new("S"),
                CartItemPatch::default(),
            )
            .unwrap_err();
        assert!(matches!(err, CartError::ItemNotFound { .. }));
    }

    #[test]
    fn test_reconcile_corrects_drift() {
        let mut cart = cart();
        cart.add_item(item("p1", "S", 1000, 2)).unwrap();
        cart.total_price = Money::from_cents(1);

        assert!(cart.has_price_drift());
        assert_eq!(cart.reconcile_totals(), Ok(true));
        assert_eq!(cart.total_price.cents(), 2000);
        assert_eq!(cart.reconcile_totals(), Ok(false));
    }

    #[test]
    fn test_merging_quantities_past_u32_is_rejected() {
        let mut cart = cart();
        cart.add_item(item("p1", "S", 1, 3_000_000_000)).unwrap();

        let err = cart.add_item(item("p1", "S", 1, 3_000_000_000)).unwrap_err();
        assert_eq!(
            err,
            CartError::QuantityOverflow {
                product_id: ProductId::new("p1"),
                sku: Sku::new("S"),
            }
        );
        assert_eq!(cart.items[0].quantity, 3_000_000_000);
        assert_fold(&cart);
    }

    #[test]
    fn test_line_total_overflow_leaves_cart_unchanged() {
        let mut cart = cart();
        let err = cart
            .add_item(item("p1", "S", i64::MAX / 2, 3))
            .unwrap_err();
        assert_eq!(err, CartError::AmountOverflow);
        assert!(cart.is_empty());
        assert!(cart.total_price.is_zero());

        cart.add_item(item("p1", "S", i64::MAX / 4, 1)).unwrap();
        let err = cart
            .update_item(
                &ProductId::new("p1"),
                &Sku::new("S"),
                CartItemPatch {
                    quantity: Some(u32::MAX),
                    attributes: None,
                },
            )
            .unwrap_err();
        assert_eq!(err, CartError::AmountOverflow);
        assert_eq!(cart.items[0].quantity, 1);
        assert_eq!(cart.total_price.cents(), i64::MAX / 4);
    }

    #[test]
    fn test_cart_total_overflow_is_rejected() {
        let mut cart = cart();
        cart.add_item(item("p1", "S", i64::MAX - 10, 1)).unwrap();

        let err = cart.add_item(item("p2", "S", 11, 1)).unwrap_err();
        assert_eq!(err, CartError::AmountOverflow);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_overflowing_stored_cart_is_reported() {
        let mut cart = cart();
        cart.items.push(item("p1", "S", i64::MAX, 2));

        assert!(cart.has_price_drift());
        assert_eq!(cart.computed_total(), Err(CartError::AmountOverflow));
        assert_eq!(cart.reconcile_totals(), Err(CartError::AmountOverflow));
    }

    #[test]
    fn test_apply_update_sets_and_clears() {
        let mut cart = cart();
        cart.apply_update(
            CartUpdate::default()
                .delivery_method(DeliveryMethod::Pickup)
                .payment_method(PaymentMethod::Cash),
        );
        assert_eq!(cart.delivery_method, Some(DeliveryMethod::Pickup));
        assert_eq!(cart.payment_method, Some(PaymentMethod::Cash));

        cart.apply_update(CartUpdate {
            payment_method: Some(None),
            ..CartUpdate::default()
        });
        assert_eq!(cart.payment_method, None);
        assert_eq!(cart.delivery_method, Some(DeliveryMethod::Pickup));
    }

    #[test]
    fn test_checkout_selection_order_of_checks() {
        let mut cart = cart();
        assert_eq!(
            cart.checkout_selection(),
            Err(CartError::DeliveryMethodRequired)
        );

        cart.delivery_method = Some(DeliveryMethod::Delivery);
        assert_eq!(
            cart.checkout_selection(),
            Err(CartError::PaymentMethodRequired)
        );

        cart.payment_method = Some(PaymentMethod::Cash);
        assert_eq!(
            cart.checkout_selection(),
            Err(CartError::ConsigneeAddressRequired(DeliveryMethod::Delivery))
        );

        cart.delivery_method = Some(DeliveryMethod::Pickup);
        assert_eq!(cart.checkout_selection(), Err(CartError::Empty));

        cart.add_item(item("p1", "S", 1000, 1)).unwrap();
        assert_eq!(
            cart.checkout_selection(),
            Ok((DeliveryMethod::Pickup, PaymentMethod::Cash))
        );
    }
}
