use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, CustomerId, OrderId, VendorId};
use domain::{Cart, InvoiceId, Money, Order, OrderNumber, OrderStatus, StatusChange};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::cart::CartStore;
use crate::ledger::{LedgerInsert, OrderLedger, initial_status_change};
use crate::{Result, StoreError};

const CART_COLUMNS: &str = "id, customer_id, vendor_id, items, total_price, final_price, \
     delivery_method, payment_method, consignee_address, shipper_address, applied_coupon, \
     customer_info, version, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, order_number, cart_id, vendor_id, customer_id, customer_info, \
     items, payment_method, delivery_method, consignee_address, shipper_address, applied_coupon, \
     total_price, final_price, status, invoice_id, created_at, updated_at";

/// PostgreSQL-backed cart store and order ledger.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool to `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_cart(row: PgRow) -> Result<Cart> {
        Ok(Cart {
            id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            vendor_id: VendorId::from_uuid(row.try_get::<Uuid, _>("vendor_id")?),
            items: serde_json::from_value(row.try_get("items")?)?,
            total_price: Money::from_cents(row.try_get("total_price")?),
            final_price: Money::from_cents(row.try_get("final_price")?),
            delivery_method: parse_opt(row.try_get("delivery_method")?)?,
            payment_method: parse_opt(row.try_get("payment_method")?)?,
            consignee_address: from_json_opt(row.try_get("consignee_address")?)?,
            shipper_address: from_json_opt(row.try_get("shipper_address")?)?,
            applied_coupon: from_json_opt(row.try_get("applied_coupon")?)?,
            customer_info: from_json_opt(row.try_get("customer_info")?)?,
            version: row.try_get("version")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            order_number: OrderNumber::new(row.try_get::<String, _>("order_number")?),
            cart_id: CartId::from_uuid(row.try_get::<Uuid, _>("cart_id")?),
            vendor_id: VendorId::from_uuid(row.try_get::<Uuid, _>("vendor_id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            customer_info: from_json_opt(row.try_get("customer_info")?)?,
            items: serde_json::from_value(row.try_get("items")?)?,
            payment_method: row.try_get::<String, _>("payment_method")?.parse()?,
            delivery_method: row.try_get::<String, _>("delivery_method")?.parse()?,
            consignee_address: from_json_opt(row.try_get("consignee_address")?)?,
            shipper_address: from_json_opt(row.try_get("shipper_address")?)?,
            applied_coupon: from_json_opt(row.try_get("applied_coupon")?)?,
            total_price: Money::from_cents(row.try_get("total_price")?),
            final_price: Money::from_cents(row.try_get("final_price")?),
            status: row.try_get::<String, _>("status")?.parse()?,
            invoice_id: row
                .try_get::<Option<String>, _>("invoice_id")?
                .map(InvoiceId::new),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_status_change(row: PgRow) -> Result<StatusChange> {
        Ok(StatusChange {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            from: parse_opt(row.try_get("from_status")?)?,
            to: row.try_get::<String, _>("to_status")?.parse()?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }

    async fn order_status(&self, order_id: OrderId) -> Result<Option<OrderStatus>> {
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(parse_opt(status)?)
    }
}

fn to_json_opt<T: Serialize>(value: &Option<T>) -> Result<Option<serde_json::Value>> {
    Ok(value.as_ref().map(serde_json::to_value).transpose()?)
}

fn from_json_opt<T: DeserializeOwned>(value: Option<serde_json::Value>) -> Result<Option<T>> {
    Ok(value.map(serde_json::from_value).transpose()?)
}

fn parse_opt<T>(value: Option<String>) -> std::result::Result<Option<T>, T::Err>
where
    T: std::str::FromStr,
{
    value.map(|s| s.parse()).transpose()
}

#[async_trait]
impl CartStore for PostgresStore {
    async fn insert_cart(&self, cart: &Cart) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO carts (id, customer_id, vendor_id, items, total_price, final_price,
                delivery_method, payment_method, consignee_address, shipper_address,
                applied_coupon, customer_info, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(cart.customer_id.as_uuid())
        .bind(cart.vendor_id.as_uuid())
        .bind(serde_json::to_value(&cart.items)?)
        .bind(cart.total_price.cents())
        .bind(cart.final_price.cents())
        .bind(cart.delivery_method.map(|m| m.as_str()))
        .bind(cart.payment_method.map(|m| m.as_str()))
        .bind(to_json_opt(&cart.consignee_address)?)
        .bind(to_json_opt(&cart.shipper_address)?)
        .bind(to_json_opt(&cart.applied_coupon)?)
        .bind(to_json_opt(&cart.customer_info)?)
        .bind(cart.version)
        .bind(cart.created_at)
        .bind(cart.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_cart_customer_vendor")
            {
                return StoreError::DuplicateCart {
                    customer_id: cart.customer_id,
                    vendor_id: cart.vendor_id,
                };
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_cart(&self, cart_id: CartId) -> Result<Option<Cart>> {
        let row = sqlx::query(&format!("SELECT {CART_COLUMNS} FROM carts WHERE id = $1"))
            .bind(cart_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_cart).transpose()
    }

    async fn find_cart(
        &self,
        customer_id: CustomerId,
        vendor_id: VendorId,
    ) -> Result<Option<Cart>> {
        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts WHERE customer_id = $1 AND vendor_id = $2"
        ))
        .bind(customer_id.as_uuid())
        .bind(vendor_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_cart).transpose()
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Cart> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE carts SET
                items = $3, total_price = $4, final_price = $5,
                delivery_method = $6, payment_method = $7,
                consignee_address = $8, shipper_address = $9,
                applied_coupon = $10, customer_info = $11,
                version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {CART_COLUMNS}
            "#
        ))
        .bind(cart.id.as_uuid())
        .bind(cart.version)
        .bind(serde_json::to_value(&cart.items)?)
        .bind(cart.total_price.cents())
        .bind(cart.final_price.cents())
        .bind(cart.delivery_method.map(|m| m.as_str()))
        .bind(cart.payment_method.map(|m| m.as_str()))
        .bind(to_json_opt(&cart.consignee_address)?)
        .bind(to_json_opt(&cart.shipper_address)?)
        .bind(to_json_opt(&cart.applied_coupon)?)
        .bind(to_json_opt(&cart.customer_info)?)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Self::row_to_cart(row);
        }

        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM carts WHERE id = $1")
            .bind(cart.id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        match actual {
            Some(actual) => Err(StoreError::ConcurrencyConflict {
                cart_id: cart.id,
                expected: cart.version,
                actual,
            }),
            None => Err(StoreError::CartNotFound(cart.id)),
        }
    }

    async fn update_totals(
        &self,
        cart_id: CartId,
        total_price: Money,
        final_price: Money,
    ) -> Result<Cart> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE carts SET total_price = $2, final_price = $3,
                version = version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING {CART_COLUMNS}
            "#
        ))
        .bind(cart_id.as_uuid())
        .bind(total_price.cents())
        .bind(final_price.cents())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_cart)
            .transpose()?
            .ok_or(StoreError::CartNotFound(cart_id))
    }

    async fn delete_cart(&self, cart_id: CartId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderLedger for PostgresStore {
    async fn insert_if_absent(&self, order: &Order) -> Result<LedgerInsert> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, cart_id, vendor_id, customer_id, customer_info,
                items, payment_method, delivery_method, consignee_address, shipper_address,
                applied_coupon, total_price, final_price, status, invoice_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (cart_id) DO NOTHING
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.order_number.as_str())
        .bind(order.cart_id.as_uuid())
        .bind(order.vendor_id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(to_json_opt(&order.customer_info)?)
        .bind(serde_json::to_value(&order.items)?)
        .bind(order.payment_method.as_str())
        .bind(order.delivery_method.as_str())
        .bind(to_json_opt(&order.consignee_address)?)
        .bind(to_json_opt(&order.shipper_address)?)
        .bind(to_json_opt(&order.applied_coupon)?)
        .bind(order.total_price.cents())
        .bind(order.final_price.cents())
        .bind(order.status.as_str())
        .bind(order.invoice_id.as_ref().map(InvoiceId::as_str))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if !inserted {
            // The row that won the conflict is committed by now.
            let row = sqlx::query(&format!(
                "SELECT {ORDER_COLUMNS} FROM orders WHERE cart_id = $1"
            ))
            .bind(order.cart_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;

            let existing = Self::row_to_order(row)?;
            tracing::debug!(cart_id = %order.cart_id, order_id = %existing.id, "order already exists for cart");
            return Ok(LedgerInsert::Existing(existing));
        }

        let initial = initial_status_change(order);
        sqlx::query(
            r#"
            INSERT INTO order_status_history (order_id, from_status, to_status, recorded_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(initial.order_id.as_uuid())
        .bind(initial.from.map(|s| s.as_str()))
        .bind(initial.to.as_str())
        .bind(initial.recorded_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(LedgerInsert::Inserted(order.clone()))
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_order_by_cart(&self, cart_id: CartId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE cart_id = $1"
        ))
        .bind(cart_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = $1"
        ))
        .bind(number.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn record_invoice(
        &self,
        order_id: OrderId,
        invoice_id: &InvoiceId,
        at: DateTime<Utc>,
    ) -> Result<Order> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET invoice_id = $2, updated_at = $3
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id.as_uuid())
        .bind(invoice_id.as_str())
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order)
            .transpose()?
            .ok_or(StoreError::OrderNotFound(order_id))
    }

    async fn update_status(&self, change: &StatusChange) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET status = $2, updated_at = $3
            WHERE id = $1 AND ($4::TEXT IS NULL OR status = $4)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(change.order_id.as_uuid())
        .bind(change.to.as_str())
        .bind(change.recorded_at)
        .bind(change.from.map(|s| s.as_str()))
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return match (self.order_status(change.order_id).await?, change.from) {
                (Some(actual), Some(expected)) => Err(StoreError::StatusConflict {
                    order_id: change.order_id,
                    expected,
                    actual,
                }),
                _ => Err(StoreError::OrderNotFound(change.order_id)),
            };
        };

        sqlx::query(
            r#"
            INSERT INTO order_status_history (order_id, from_status, to_status, recorded_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(change.order_id.as_uuid())
        .bind(change.from.map(|s| s.as_str()))
        .bind(change.to.as_str())
        .bind(change.recorded_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Self::row_to_order(row)
    }

    async fn status_history(&self, order_id: OrderId) -> Result<Vec<StatusChange>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, from_status, to_status, recorded_at
            FROM order_status_history
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_status_change).collect()
    }
}
