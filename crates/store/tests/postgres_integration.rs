//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{CustomerId, OrderId, VendorId};
use domain::{
    Address, Cart, CartItem, CustomerInfo, DeliveryMethod, InvoiceId, ItemAttributes, Money,
    Order, OrderNumber, OrderStatus, PaymentMethod, ProductType,
};
use serial_test::serial;
use sqlx::PgPool;
use store::{CartStore, CartStoreExt, OrderLedger, OrderLedgerExt, PostgresStore, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_checkout_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_status_history, orders, carts")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn full_cart(payment: PaymentMethod) -> Cart {
    let mut cart = Cart::new(CustomerId::new(), VendorId::new(), Utc::now());
    cart.add_item(CartItem::new(
        "p1",
        "RED-M",
        Money::from_cents(1250),
        2,
        ItemAttributes::empty(ProductType::Product),
    ))
    .unwrap();
    cart.delivery_method = Some(DeliveryMethod::Delivery);
    cart.payment_method = Some(payment);
    cart.consignee_address = Some(Address {
        name: "Home".to_string(),
        line1: "Block 3, Street 12".to_string(),
        line2: None,
        city: "Kuwait City".to_string(),
        area: Some("Salmiya".to_string()),
        country: "KW".to_string(),
        phone: None,
    });
    cart.customer_info = Some(CustomerInfo {
        first_name: "Noor".to_string(),
        last_name: "Saleh".to_string(),
        email: "noor@example.com".to_string(),
        phone: None,
    });
    cart
}

#[tokio::test]
#[serial]
async fn test_cart_round_trips_through_jsonb() {
    let store = get_test_store().await;
    let cart = full_cart(PaymentMethod::Online);
    store.insert_cart(&cart).await.unwrap();

    let loaded = store.require_cart(cart.id).await.unwrap();
    assert_eq!(loaded.items, cart.items);
    assert_eq!(loaded.consignee_address, cart.consignee_address);
    assert_eq!(loaded.customer_info, cart.customer_info);
    assert_eq!(loaded.payment_method, Some(PaymentMethod::Online));
    assert_eq!(loaded.total_price, cart.total_price);
    assert_eq!(loaded.version, 0);
}

#[tokio::test]
#[serial]
async fn test_duplicate_cart_rejected() {
    let store = get_test_store().await;
    let cart = Cart::new(CustomerId::new(), VendorId::new(), Utc::now());
    store.insert_cart(&cart).await.unwrap();

    let twin = Cart::new(cart.customer_id, cart.vendor_id, Utc::now());
    let result = store.insert_cart(&twin).await;
    assert!(matches!(result, Err(StoreError::DuplicateCart { .. })));

    let found = store
        .find_cart(cart.customer_id, cart.vendor_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, cart.id);
}

#[tokio::test]
#[serial]
async fn test_save_cart_version_check() {
    let store = get_test_store().await;
    let mut cart = Cart::new(CustomerId::new(), VendorId::new(), Utc::now());
    store.insert_cart(&cart).await.unwrap();

    cart.payment_method = Some(PaymentMethod::Cash);
    let saved = store.save_cart(&cart).await.unwrap();
    assert_eq!(saved.version, 1);
    assert_eq!(saved.payment_method, Some(PaymentMethod::Cash));

    // Same stale version again
    let result = store.save_cart(&cart).await;
    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict {
            expected: 0,
            actual: 1,
            ..
        })
    ));

    let missing = Cart::new(CustomerId::new(), VendorId::new(), Utc::now());
    assert!(matches!(
        store.save_cart(&missing).await,
        Err(StoreError::CartNotFound(_))
    ));
}

#[tokio::test]
#[serial]
async fn test_update_totals_and_delete() {
    let store = get_test_store().await;
    let cart = full_cart(PaymentMethod::Cash);
    store.insert_cart(&cart).await.unwrap();

    let updated = store
        .update_totals(cart.id, Money::from_cents(42), Money::from_cents(42))
        .await
        .unwrap();
    assert_eq!(updated.total_price.cents(), 42);
    assert_eq!(updated.version, 1);

    assert!(store.delete_cart(cart.id).await.unwrap());
    assert!(!store.delete_cart(cart.id).await.unwrap());
}

#[tokio::test]
#[serial]
async fn test_insert_if_absent_keeps_first_order() {
    let store = get_test_store().await;
    let cart = full_cart(PaymentMethod::Online);

    let first = Order::from_cart(&cart, OrderNumber::generate("PG"), Utc::now()).unwrap();
    let second = Order::from_cart(&cart, OrderNumber::generate("PG"), Utc::now()).unwrap();

    assert!(store.insert_if_absent(&first).await.unwrap().was_inserted());

    let again = store.insert_if_absent(&second).await.unwrap();
    assert!(!again.was_inserted());
    assert_eq!(again.order().id, first.id);
    assert_eq!(again.order().order_number, first.order_number);
    assert_eq!(again.order().items, first.items);
}

#[tokio::test]
#[serial]
async fn test_concurrent_inserts_yield_one_order() {
    let store = get_test_store().await;
    let cart = full_cart(PaymentMethod::Cash);

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let store = store.clone();
            let order = Order::from_cart(&cart, OrderNumber::generate("PG"), Utc::now()).unwrap();
            tokio::spawn(async move { store.insert_if_absent(&order).await.unwrap() })
        })
        .collect();

    let mut ids = Vec::new();
    let mut inserted = 0;
    for handle in handles {
        let result = handle.await.unwrap();
        inserted += usize::from(result.was_inserted());
        ids.push(result.order().id);
    }

    assert_eq!(inserted, 1);
    assert!(ids.windows(2).all(|w| w[0] == w[1]));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
#[serial]
async fn test_order_lookups_and_invoice() {
    let store = get_test_store().await;
    let cart = full_cart(PaymentMethod::Online);
    let order = Order::from_cart(&cart, OrderNumber::generate("PG"), Utc::now()).unwrap();
    store.insert_if_absent(&order).await.unwrap();

    let by_number = store
        .find_order_by_number(&order.order_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_number.id, order.id);

    let by_cart = store.find_order_by_cart(cart.id).await.unwrap().unwrap();
    assert_eq!(by_cart.id, order.id);

    let updated = store
        .record_invoice(order.id, &InvoiceId::new("998877"), Utc::now())
        .await
        .unwrap();
    assert_eq!(updated.invoice_id, Some(InvoiceId::new("998877")));
    assert_eq!(updated.status, OrderStatus::Created);

    assert!(matches!(
        store.require_order(OrderId::new()).await,
        Err(StoreError::OrderNotFound(_))
    ));
}

#[tokio::test]
#[serial]
async fn test_status_update_appends_history() {
    let store = get_test_store().await;
    let cart = full_cart(PaymentMethod::Online);
    let order = Order::from_cart(&cart, OrderNumber::generate("PG"), Utc::now()).unwrap();
    store.insert_if_absent(&order).await.unwrap();

    let change = order
        .clone()
        .transition_to(OrderStatus::Failed, Utc::now())
        .unwrap();
    let updated = store.update_status(&change).await.unwrap();
    assert_eq!(updated.status, OrderStatus::Failed);

    let history = store.status_history(order.id).await.unwrap();
    let statuses: Vec<_> = history.iter().map(|c| (c.from, c.to)).collect();
    assert_eq!(
        statuses,
        vec![
            (None, OrderStatus::Created),
            (Some(OrderStatus::Created), OrderStatus::Failed),
        ]
    );

    // A stale change from CREATED no longer applies
    let stale = order
        .clone()
        .transition_to(OrderStatus::Pending, Utc::now())
        .unwrap();
    assert!(matches!(
        store.update_status(&stale).await,
        Err(StoreError::StatusConflict {
            expected: OrderStatus::Created,
            actual: OrderStatus::Failed,
            ..
        })
    ));
    assert_eq!(store.status_history(order.id).await.unwrap().len(), 2);
}
