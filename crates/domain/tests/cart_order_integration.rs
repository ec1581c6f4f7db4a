//! Integration tests for the cart to order transition.
//!
//! These tests drive a cart through line-item edits and field updates, then
//! snapshot it into an order and settle that order.

use chrono::Utc;
use common::{CustomerId, VendorId};
use domain::{
    Address, AppliedCoupon, Cart, CartError, CartItem, CartItemPatch, CartUpdate, CustomerInfo,
    DeliveryMethod, InvoiceStatus, ItemAttributes, Money, Order, OrderError, OrderNumber,
    OrderStatus, PaymentMethod, ProductType,
};

fn cart() -> Cart {
    Cart::new(CustomerId::new(), VendorId::new(), Utc::now())
}

fn tee(sku: &str, cents: i64, quantity: u32) -> CartItem {
    CartItem::new(
        "tee",
        sku,
        Money::from_cents(cents),
        quantity,
        ItemAttributes::empty(ProductType::Product),
    )
}

fn customer() -> CustomerInfo {
    CustomerInfo {
        first_name: "Sara".to_string(),
        last_name: "Ali".to_string(),
        email: "sara@example.com".to_string(),
        phone: Some("+96550000000".to_string()),
    }
}

mod cart_lifecycle {
    use super::*;

    #[test]
    fn test_price_fold_after_every_mutation() {
        let mut cart = cart();

        cart.add_item(tee("S", 1000, 2)).unwrap();
        assert_eq!(Ok(cart.total_price), cart.computed_total());

        cart.add_item(tee("XL", 1250, 1)).unwrap();
        assert_eq!(cart.total_price, Money::from_cents(3250));

        cart.update_item(
            &"tee".into(),
            &"S".into(),
            CartItemPatch {
                quantity: Some(4),
                attributes: None,
            },
        )
        .unwrap();
        assert_eq!(cart.total_price, Money::from_cents(5250));

        cart.remove_item(&"tee".into(), &"XL".into()).unwrap();
        assert_eq!(cart.total_price, Money::from_cents(4000));
        assert_eq!(cart.final_price, cart.total_price);
        assert!(!cart.has_price_drift());
    }

    #[test]
    fn test_same_product_different_skus_are_distinct_lines() {
        let mut cart = cart();
        cart.add_item(tee("S", 1000, 1)).unwrap();
        cart.add_item(tee("M", 1000, 1)).unwrap();
        cart.add_item(tee("S", 1000, 2)).unwrap();

        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.find_item(&"tee".into(), &"S".into()).unwrap().quantity, 3);
    }

    #[test]
    fn test_update_clears_and_sets_fields() {
        let mut cart = cart();
        cart.apply_update(
            CartUpdate::default()
                .delivery_method(DeliveryMethod::Delivery)
                .customer_info(customer()),
        );
        assert_eq!(cart.delivery_method, Some(DeliveryMethod::Delivery));

        let cleared: CartUpdate = serde_json::from_str(r#"{"customer_info": null}"#).unwrap();
        cart.apply_update(cleared);
        assert!(cart.customer_info.is_none());
        assert_eq!(cart.delivery_method, Some(DeliveryMethod::Delivery));
    }

    #[test]
    fn test_drifted_totals_are_reconciled() {
        let mut cart = cart();
        cart.add_item(tee("S", 1000, 2)).unwrap();
        cart.total_price = Money::from_cents(1);

        assert!(cart.has_price_drift());
        assert_eq!(cart.reconcile_totals(), Ok(true));
        assert_eq!(cart.total_price, Money::from_cents(2000));
        assert_eq!(cart.reconcile_totals(), Ok(false));
    }
}

mod checkout_snapshot {
    use super::*;

    #[test]
    fn test_delivery_requires_consignee_address() {
        let mut cart = cart();
        cart.add_item(tee("S", 1000, 1)).unwrap();
        cart.apply_update(
            CartUpdate::default()
                .delivery_method(DeliveryMethod::Delivery)
                .payment_method(PaymentMethod::Cash),
        );

        let err = Order::from_cart(&cart, OrderNumber::new("ACME-AAAAAAAA"), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            OrderError::Cart(CartError::ConsigneeAddressRequired(DeliveryMethod::Delivery))
        );

        cart.apply_update(CartUpdate::default().consignee_address(Address {
            name: "Sara Ali".to_string(),
            line1: "Block 3, Street 12".to_string(),
            line2: None,
            city: "Kuwait City".to_string(),
            area: Some("Salmiya".to_string()),
            country: "KW".to_string(),
            phone: None,
        }));
        assert!(Order::from_cart(&cart, OrderNumber::new("ACME-AAAAAAAA"), Utc::now()).is_ok());
    }

    #[test]
    fn test_order_copies_cart_verbatim() {
        let mut cart = cart();
        cart.add_item(tee("S", 1000, 2)).unwrap();
        cart.apply_update(
            CartUpdate::default()
                .delivery_method(DeliveryMethod::Pickup)
                .payment_method(PaymentMethod::Online)
                .customer_info(customer())
                .applied_coupon(AppliedCoupon {
                    code: "WELCOME".to_string(),
                }),
        );

        let number = OrderNumber::generate("acme");
        let order = Order::from_cart(&cart, number.clone(), Utc::now()).unwrap();

        assert_eq!(order.cart_id, cart.id);
        assert_eq!(order.order_number, number);
        assert_eq!(order.items, cart.items);
        assert_eq!(order.customer_info, cart.customer_info);
        assert_eq!(order.applied_coupon.as_ref().unwrap().code, "WELCOME");
        assert_eq!(order.total_price, Money::from_cents(2000));
        assert_eq!(order.status, OrderStatus::Created);
        assert!(order.invoice_id.is_none());
        assert_eq!(order.customer_email(), Some("sara@example.com"));
    }

    #[test]
    fn test_settlement_runs_once() {
        let mut cart = cart();
        cart.add_item(tee("S", 1000, 1)).unwrap();
        cart.apply_update(
            CartUpdate::default()
                .delivery_method(DeliveryMethod::Pickup)
                .payment_method(PaymentMethod::Online)
                .customer_info(customer()),
        );
        let mut order =
            Order::from_cart(&cart, OrderNumber::new("ACME-AAAAAAAA"), Utc::now()).unwrap();

        assert_eq!(order.status.settle(&InvoiceStatus::Pending), None);
        let target = order.status.settle(&InvoiceStatus::Paid).unwrap();
        let change = order.transition_to(target, Utc::now()).unwrap();

        assert_eq!(change.from, Some(OrderStatus::Created));
        assert_eq!(change.to, OrderStatus::Pending);
        assert_eq!(order.status.settle(&InvoiceStatus::Canceled), None);
        assert!(order.transition_to(OrderStatus::Failed, Utc::now()).is_err());
    }
}
