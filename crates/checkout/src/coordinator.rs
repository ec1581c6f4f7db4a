//! Checkout coordinator: cart to order to payment.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use common::CartId;
use domain::{Cart, Order, OrderNumber, OrderStatus};
use payment::{GatewayError, PaymentGateway, SessionId};
use store::Store;
use tracing::Instrument;

use crate::config::{CheckoutConfig, bounded_store};
use crate::error::{CheckoutError, Result, ValidationError};
use crate::locks::{CartLockGuard, CartLocks};
use crate::outcome::{CheckoutOutcome, PaymentAttempt, PaymentOutcome};
use crate::services::{NotificationKind, NotificationService, ServiceError, Vendor, VendorService};

/// Drives the checkout saga for one cart at a time.
///
/// Steps:
/// 1. Validate the cart and resolve the vendor
/// 2. Insert the order, or reuse the one already created for the cart if it
///    still matches the cart
/// 3. Execute the online payment
/// 4. Dispose of the cart unless the payment must be retried
/// 5. Notify customer and vendor on every pass that reaches the ledger
///
/// Nothing is written before step 2. From step 2 onward the saga runs on its
/// own task, so a caller that goes away cannot leave it half done.
pub struct CheckoutCoordinator<S, G, V, N>
where
    S: Store,
    G: PaymentGateway + 'static,
    V: VendorService + 'static,
    N: NotificationService + 'static,
{
    inner: Arc<Saga<S, G, V, N>>,
    locks: CartLocks,
}

struct Saga<S, G, V, N> {
    store: S,
    gateway: G,
    vendors: V,
    notifier: N,
    config: CheckoutConfig,
}

impl<S, G, V, N> CheckoutCoordinator<S, G, V, N>
where
    S: Store,
    G: PaymentGateway + 'static,
    V: VendorService + 'static,
    N: NotificationService + 'static,
{
    /// Creates a new checkout coordinator.
    ///
    /// `locks` must be shared with every other service that mutates carts.
    pub fn new(
        store: S,
        gateway: G,
        vendors: V,
        notifier: N,
        locks: CartLocks,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Saga {
                store,
                gateway,
                vendors,
                notifier,
                config,
            }),
            locks,
        }
    }

    /// Checks a cart out.
    ///
    /// Retrying with the same cart is safe: the order created by an earlier
    /// attempt is reused. Payment rejections and indeterminate payments are
    /// reported in the outcome, not as errors.
    #[tracing::instrument(skip(self, session))]
    pub async fn checkout(
        &self,
        cart_id: CartId,
        session: Option<SessionId>,
    ) -> Result<CheckoutOutcome> {
        metrics::counter!("checkout_requests_total").increment(1);
        let started = Instant::now();

        let result = self.run(cart_id, session).await;

        let outcome = if result.is_ok() { "ok" } else { "error" };
        metrics::histogram!("checkout_duration_seconds", "outcome" => outcome)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn run(&self, cart_id: CartId, session: Option<SessionId>) -> Result<CheckoutOutcome> {
        let guard = self.locks.lock(cart_id).await;
        let saga = &self.inner;

        let Some(cart) = saga.load_cart(cart_id).await? else {
            return saga.replay(cart_id).await;
        };
        let cart = saga.prepare(cart, session.as_ref()).await?;
        let vendor = saga.resolve_vendor(&cart).await?;
        let order_number = OrderNumber::generate(&vendor.order_prefix);
        let order = Order::from_cart(&cart, order_number, Utc::now())?;

        let saga = Arc::clone(&self.inner);
        let task = tokio::spawn(
            async move {
                let _guard: CartLockGuard = guard;
                saga.commit(cart_id, order, vendor, session).await
            }
            .instrument(tracing::Span::current()),
        );

        match task.await {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(error = %err, "checkout task failed");
                Err(CheckoutError::Internal(format!("checkout task failed: {err}")))
            }
        }
    }
}

impl<S, G, V, N> Saga<S, G, V, N>
where
    S: Store,
    G: PaymentGateway,
    V: VendorService,
    N: NotificationService,
{
    async fn load_cart(&self, cart_id: CartId) -> Result<Option<Cart>> {
        bounded_store(
            self.config.store_timeout,
            "get_cart",
            self.store.get_cart(cart_id),
        )
        .await
    }

    /// A cart that is gone may have been disposed of by a finished checkout.
    async fn replay(&self, cart_id: CartId) -> Result<CheckoutOutcome> {
        let order = bounded_store(
            self.config.store_timeout,
            "find_order_by_cart",
            self.store.find_order_by_cart(cart_id),
        )
        .await?
        .ok_or(ValidationError::CartNotFound(cart_id))?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            "cart already checked out"
        );
        metrics::counter!("checkout_orders_reused_total").increment(1);
        let payment = order.invoice_id.clone().map(|invoice_id| {
            Ok(PaymentOutcome::Executed {
                invoice_id,
                payment_url: None,
            })
        });
        Ok(CheckoutOutcome {
            order,
            payment,
            reused: true,
        })
    }

    /// Checks preconditions and corrects drifted totals.
    async fn prepare(&self, mut cart: Cart, session: Option<&SessionId>) -> Result<Cart> {
        let (_, payment_method) = cart.checkout_selection()?;

        if payment_method.is_online() {
            if session.is_none_or(SessionId::is_blank) {
                return Err(ValidationError::PaymentSessionRequired.into());
            }
            let has_contact = cart
                .customer_info
                .as_ref()
                .and_then(|info| info.contact_email())
                .is_some();
            if !has_contact {
                return Err(ValidationError::CustomerInfoRequired.into());
            }
        }

        if cart.has_price_drift() {
            let stored = cart.total_price;
            cart.reconcile_totals()?;
            tracing::warn!(
                stored = %stored,
                computed = %cart.total_price,
                "cart totals drifted from items, correcting"
            );
            metrics::counter!("cart_price_drift_corrected_total").increment(1);
            cart = bounded_store(
                self.config.store_timeout,
                "update_totals",
                self.store
                    .update_totals(cart.id, cart.total_price, cart.final_price),
            )
            .await?;
        }

        Ok(cart)
    }

    async fn resolve_vendor(&self, cart: &Cart) -> Result<Vendor> {
        let limit = self.config.store_timeout;
        let (vendor, prefix) = tokio::try_join!(
            bounded_service(limit, self.vendors.get_vendor(cart.vendor_id)),
            bounded_service(limit, self.vendors.get_order_prefix(cart.vendor_id)),
        )?;

        let not_found = || ValidationError::VendorNotFound(cart.vendor_id);
        let mut vendor = vendor.ok_or_else(not_found)?;
        vendor.order_prefix = prefix.ok_or_else(not_found)?;
        Ok(vendor)
    }

    /// Runs the saga from the ledger insert onward.
    async fn commit(
        &self,
        cart_id: CartId,
        order: Order,
        vendor: Vendor,
        session: Option<SessionId>,
    ) -> Result<CheckoutOutcome> {
        let limit = self.config.store_timeout;
        let insert = bounded_store(limit, "insert_if_absent", self.store.insert_if_absent(&order))
            .await?;
        let created = insert.was_inserted();
        let existing = insert.into_order();

        if !created && !existing.same_snapshot(&order) {
            tracing::warn!(
                order_id = %existing.id,
                order_number = %existing.order_number,
                "cart changed since its order was created"
            );
            return Err(ValidationError::CartChangedSinceOrder {
                cart_id,
                order_id: existing.id,
            }
            .into());
        }
        let order = existing;

        if created {
            metrics::counter!("checkout_orders_created_total").increment(1);
            tracing::info!(
                order_id = %order.id,
                order_number = %order.order_number,
                status = %order.status,
                "order created"
            );
        } else {
            metrics::counter!("checkout_orders_reused_total").increment(1);
            tracing::info!(
                order_id = %order.id,
                order_number = %order.order_number,
                status = %order.status,
                "reusing existing order"
            );
        }

        let (order, payment) = self.pay(order, &vendor, session).await?;

        let dispose = matches!(payment, None | Some(Ok(PaymentOutcome::Executed { .. })));
        if dispose {
            bounded_store(limit, "delete_cart", self.store.delete_cart(cart_id)).await?;
            tracing::info!("cart disposed");
        } else {
            tracing::info!("cart retained for payment retry");
        }

        self.notify(&order, &vendor).await;

        Ok(CheckoutOutcome {
            order,
            payment,
            reused: !created,
        })
    }

    async fn pay(
        &self,
        order: Order,
        vendor: &Vendor,
        session: Option<SessionId>,
    ) -> Result<(Order, Option<PaymentAttempt>)> {
        if !order.is_online() || order.status != OrderStatus::Created {
            return Ok((order, None));
        }
        // Executed by an earlier attempt that did not get to dispose of the cart.
        if let Some(invoice_id) = order.invoice_id.clone() {
            let outcome = PaymentOutcome::Executed {
                invoice_id,
                payment_url: None,
            };
            return Ok((order, Some(Ok(outcome))));
        }
        let session = session
            .filter(|session| !session.is_blank())
            .ok_or(ValidationError::PaymentSessionRequired)?;

        let limit = self.config.gateway_timeout;
        let result = tokio::time::timeout(
            limit,
            self.gateway.execute(&order, &session, &vendor.slug),
        )
        .await
        .unwrap_or(Err(GatewayError::Timeout(limit)));

        match result {
            Ok(invoice) => {
                metrics::counter!("payment_executions_total", "outcome" => "executed")
                    .increment(1);
                tracing::info!(invoice_id = %invoice.invoice_id, "payment executed");
                let order = bounded_store(
                    self.config.store_timeout,
                    "record_invoice",
                    self.store
                        .record_invoice(order.id, &invoice.invoice_id, Utc::now()),
                )
                .await?;
                let outcome = PaymentOutcome::Executed {
                    invoice_id: invoice.invoice_id,
                    payment_url: invoice.payment_url,
                };
                Ok((order, Some(Ok(outcome))))
            }
            Err(GatewayError::Rejected(rejection)) => {
                metrics::counter!("payment_executions_total", "outcome" => "rejected")
                    .increment(1);
                tracing::warn!(
                    message = %rejection.message,
                    errors = rejection.errors.len(),
                    "payment rejected by gateway"
                );
                Ok((order, Some(Err(rejection))))
            }
            Err(err) => {
                metrics::counter!("payment_executions_total", "outcome" => "indeterminate")
                    .increment(1);
                tracing::warn!(error = %err, "payment outcome unknown");
                let outcome = PaymentOutcome::Indeterminate {
                    reason: err.to_string(),
                };
                Ok((order, Some(Ok(outcome))))
            }
        }
    }

    async fn notify(&self, order: &Order, vendor: &Vendor) {
        tokio::join!(
            self.send(NotificationKind::OrderPurchased, order.customer_email()),
            self.send(NotificationKind::OrderReceived, vendor.contact_email.as_deref()),
        );
    }

    async fn send(&self, kind: NotificationKind, recipient: Option<&str>) {
        let Some(recipient) = recipient else {
            return;
        };
        let limit = self.config.notification_timeout;
        let failure = match tokio::time::timeout(limit, self.notifier.send(kind, recipient)).await {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err.to_string(),
            Err(_) => format!("timed out after {limit:?}"),
        };

        metrics::counter!("notifications_failed_total", "kind" => kind.as_str()).increment(1);
        tracing::warn!(kind = kind.as_str(), recipient, error = %failure, "notification failed");
    }
}

async fn bounded_service<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, ServiceError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ServiceError::new("vendor", format!("timed out after {limit:?}")).into()),
    }
}
