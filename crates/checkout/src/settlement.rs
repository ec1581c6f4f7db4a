//! Payment settlement: session initiation, status polling and refunds.

use chrono::Utc;
use common::OrderId;
use domain::{InvoiceId, InvoiceStatus, Order, StatusChange};
use payment::{GatewayError, PaymentGateway, PaymentSession};
use store::Store;

use crate::config::{CheckoutConfig, bounded_store};
use crate::error::{CheckoutError, Result, ValidationError};
use crate::outcome::{RefundOutcome, SettlementReport};

/// Resolves payments after checkout.
///
/// Execute is not proof of payment, so an online order only leaves
/// `CREATED` when a status check here sees a definitive gateway verdict.
pub struct SettlementService<S, G>
where
    S: Store,
    G: PaymentGateway,
{
    store: S,
    gateway: G,
    config: CheckoutConfig,
}

impl<S, G> SettlementService<S, G>
where
    S: Store,
    G: PaymentGateway,
{
    /// Creates a new settlement service.
    pub fn new(store: S, gateway: G, config: CheckoutConfig) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    /// Obtains a session token for a new payment attempt.
    #[tracing::instrument(skip(self))]
    pub async fn initiate_session(&self) -> Result<PaymentSession> {
        let session = self.call_gateway(self.gateway.initiate_session()).await?;
        tracing::info!(session_id = %session.session_id, "payment session initiated");
        Ok(session)
    }

    /// Fetches an order.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.load(order_id).await
    }

    /// Returns the status history of an order, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn status_history(&self, order_id: OrderId) -> Result<Vec<StatusChange>> {
        self.load(order_id).await?;
        bounded_store(
            self.config.store_timeout,
            "status_history",
            self.store.status_history(order_id),
        )
        .await
    }

    /// Polls the gateway and settles the order if the invoice has a
    /// definitive status.
    ///
    /// A pending invoice, or an order that is already settled, leaves the
    /// stored status untouched.
    #[tracing::instrument(skip(self))]
    pub async fn check_status(&self, order_id: OrderId) -> Result<SettlementReport> {
        let mut order = self.load(order_id).await?;
        let invoice_id = require_invoice(&order)?;

        let report = self
            .call_gateway(self.gateway.payment_status(&invoice_id))
            .await?;
        metrics::counter!(
            "payment_status_checks_total",
            "gateway_status" => status_label(&report.status)
        )
        .increment(1);

        let Some(target) = order.status.settle(&report.status) else {
            tracing::debug!(
                status = %order.status,
                gateway_status = %report.status,
                "order status unchanged"
            );
            return Ok(SettlementReport {
                order,
                gateway_status: report.status,
                changed: false,
            });
        };

        let change = order.transition_to(target, Utc::now())?;
        let updated = bounded_store(
            self.config.store_timeout,
            "update_status",
            self.store.update_status(&change),
        )
        .await;

        match updated {
            Ok(order) => {
                tracing::info!(
                    order_number = %order.order_number,
                    status = %order.status,
                    gateway_status = %report.status,
                    "order settled"
                );
                Ok(SettlementReport {
                    order,
                    gateway_status: report.status,
                    changed: true,
                })
            }
            // A concurrent check settled it first.
            Err(CheckoutError::Conflict(reason)) => {
                tracing::debug!(%reason, "order settled concurrently");
                Ok(SettlementReport {
                    order: self.load(order_id).await?,
                    gateway_status: report.status,
                    changed: false,
                })
            }
            Err(err) => Err(err),
        }
    }

    /// Refunds the order's final price in full.
    ///
    /// Gateway rejections and unknown outcomes are returned for manual
    /// follow-up rather than raised.
    #[tracing::instrument(skip(self))]
    pub async fn refund(&self, order_id: OrderId) -> Result<RefundOutcome> {
        let order = self.load(order_id).await?;
        let invoice_id = require_invoice(&order)?;

        let limit = self.config.gateway_timeout;
        let result = tokio::time::timeout(
            limit,
            self.gateway.refund(&invoice_id, order.final_price),
        )
        .await
        .unwrap_or(Err(GatewayError::Timeout(limit)));

        let outcome = match result {
            Ok(receipt) => {
                tracing::info!(
                    refund_id = receipt.refund_id.as_deref().unwrap_or_default(),
                    amount = %order.final_price,
                    "refund issued"
                );
                RefundOutcome::Refunded(receipt)
            }
            Err(GatewayError::Rejected(rejection)) => {
                tracing::warn!(message = %rejection.message, "refund rejected by gateway");
                RefundOutcome::Rejected(rejection)
            }
            Err(err) => {
                tracing::warn!(error = %err, "refund outcome unknown");
                RefundOutcome::Indeterminate {
                    reason: err.to_string(),
                }
            }
        };

        metrics::counter!("payment_refunds_total", "outcome" => outcome.label()).increment(1);
        Ok(outcome)
    }

    async fn load(&self, order_id: OrderId) -> Result<Order> {
        bounded_store(
            self.config.store_timeout,
            "get_order",
            self.store.get_order(order_id),
        )
        .await?
        .ok_or_else(|| ValidationError::OrderNotFound(order_id).into())
    }

    async fn call_gateway<T, F>(&self, call: F) -> Result<T>
    where
        F: std::future::Future<Output = payment::Result<T>>,
    {
        let limit = self.config.gateway_timeout;
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result.map_err(|err| {
                tracing::warn!(error = %err, "payment gateway call failed");
                CheckoutError::from(err)
            }),
            Err(_) => {
                tracing::warn!(?limit, "payment gateway call timed out");
                Err(GatewayError::Timeout(limit).into())
            }
        }
    }
}

fn require_invoice(order: &Order) -> Result<InvoiceId> {
    order
        .invoice_id
        .clone()
        .ok_or_else(|| ValidationError::InvoiceMissing(order.id).into())
}

fn status_label(status: &InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Pending => "pending",
        InvoiceStatus::Paid => "paid",
        InvoiceStatus::Canceled => "canceled",
        InvoiceStatus::Other(_) => "other",
    }
}
