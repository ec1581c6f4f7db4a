use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use domain::{InvoiceId, InvoiceStatus, Money, Order};

use crate::config::GatewayConfig;
use crate::gateway::{
    Invoice, InvoiceReport, PaymentGateway, PaymentSession, RefundReceipt, SessionId,
};
use crate::wire::{ExecutePaymentRequest, RefundRequest};
use crate::{GatewayBusinessError, GatewayError, Result};

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    next_session: u32,
    next_invoice: u32,
    invoices: HashMap<InvoiceId, InvoiceStatus>,
    executions: Vec<ExecutePaymentRequest>,
    refunds: Vec<RefundRequest>,
    status_checks: u32,
    reject_execute: Option<GatewayBusinessError>,
    reject_refund: Option<GatewayBusinessError>,
    unreachable: bool,
    delay: Option<Duration>,
}

/// In-memory payment gateway for testing.
///
/// Issues sequential sessions and invoices, records every request it is
/// sent, and can be told to reject, drop or stall calls.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    config: GatewayConfig,
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes execute calls fail with the given business error.
    pub fn set_reject_execute(&self, error: Option<GatewayBusinessError>) {
        self.write().reject_execute = error;
    }

    /// Makes refund calls fail with the given business error.
    pub fn set_reject_refund(&self, error: Option<GatewayBusinessError>) {
        self.write().reject_refund = error;
    }

    /// Makes every call fail with a transport error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.write().unreachable = unreachable;
    }

    /// Stalls every call for `delay` before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.write().delay = delay;
    }

    /// Sets the status the gateway reports for an invoice.
    pub fn set_invoice_status(&self, invoice_id: &InvoiceId, status: InvoiceStatus) {
        self.write().invoices.insert(invoice_id.clone(), status);
    }

    /// Returns every execute request received, oldest first.
    pub fn executions(&self) -> Vec<ExecutePaymentRequest> {
        self.read().executions.clone()
    }

    /// Returns the number of execute requests received.
    pub fn execution_count(&self) -> usize {
        self.read().executions.len()
    }

    /// Returns every refund request received, oldest first.
    pub fn refunds(&self) -> Vec<RefundRequest> {
        self.read().refunds.clone()
    }

    /// Returns the number of status queries received.
    pub fn status_check_count(&self) -> u32 {
        self.read().status_checks
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InMemoryGatewayState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InMemoryGatewayState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies the configured delay and reachability.
    async fn simulate_network(&self) -> Result<()> {
        let (delay, unreachable) = {
            let state = self.read();
            (state.delay, state.unreachable)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if unreachable {
            return Err(GatewayError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn initiate_session(&self) -> Result<PaymentSession> {
        self.simulate_network().await?;
        let mut state = self.write();
        state.next_session += 1;

        Ok(PaymentSession {
            session_id: SessionId::new(format!("SESSION-{:04}", state.next_session)),
            country_code: Some("KWT".to_string()),
        })
    }

    async fn execute(
        &self,
        order: &Order,
        session_id: &SessionId,
        vendor_slug: &str,
    ) -> Result<Invoice> {
        self.simulate_network().await?;
        let mut state = self.write();

        let request =
            ExecutePaymentRequest::for_order(order, session_id.as_str(), vendor_slug, &self.config);
        state.executions.push(request);

        if let Some(error) = state.reject_execute.clone() {
            return Err(GatewayError::Rejected(error));
        }

        state.next_invoice += 1;
        let invoice_id = InvoiceId::new((100_000 + state.next_invoice).to_string());
        state
            .invoices
            .insert(invoice_id.clone(), InvoiceStatus::Pending);

        Ok(Invoice {
            payment_url: Some(format!("https://pay.test/invoice/{invoice_id}")),
            invoice_id,
            is_direct_payment: false,
        })
    }

    async fn payment_status(&self, invoice_id: &InvoiceId) -> Result<InvoiceReport> {
        self.simulate_network().await?;
        let mut state = self.write();
        state.status_checks += 1;

        let status = state.invoices.get(invoice_id).cloned().ok_or_else(|| {
            GatewayError::Rejected(
                GatewayBusinessError::new("Invalid data")
                    .with_error("Key", format!("Invoice {invoice_id} not found")),
            )
        })?;

        Ok(InvoiceReport {
            invoice_id: invoice_id.clone(),
            status,
            invoice_value: None,
            customer_reference: None,
        })
    }

    async fn refund(&self, invoice_id: &InvoiceId, amount: Money) -> Result<RefundReceipt> {
        self.simulate_network().await?;
        let mut state = self.write();

        let request = RefundRequest::full(invoice_id, amount);
        state.refunds.push(request.clone());

        if let Some(error) = state.reject_refund.clone() {
            return Err(GatewayError::Rejected(error));
        }

        Ok(RefundReceipt {
            key: Some(request.key),
            refund_id: Some(format!("R-{:04}", state.refunds.len())),
            refund_reference: None,
            refund_amount: Some(request.amount),
            comment: Some(request.comment),
        })
    }
}
