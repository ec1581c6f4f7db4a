use async_trait::async_trait;
use domain::{InvoiceId, Money, Order};
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};

use crate::config::GatewayConfig;
use crate::gateway::{
    Invoice, InvoiceReport, PaymentGateway, PaymentSession, RefundReceipt, SessionId,
};
use crate::wire::{
    ApiResponse, EXECUTE_PAYMENT_PATH, ExecutePaymentData, ExecutePaymentRequest,
    INITIATE_SESSION_PATH, InitiateSessionData, MAKE_REFUND_PATH, PAYMENT_STATUS_PATH,
    PaymentStatusData, PaymentStatusRequest, RefundData, RefundRequest,
};
use crate::{GatewayBusinessError, GatewayError, Result};

/// Payment gateway client speaking the provider's REST API over HTTPS.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: Client,
    config: GatewayConfig,
}

impl HttpPaymentGateway {
    /// Builds a client whose requests time out after `config.timeout`.
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Uses a caller-supplied client.
    pub fn with_client(config: GatewayConfig, client: Client) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Posts `body` and unwraps the response envelope.
    ///
    /// Connect failures, timeouts and 5xx are transport errors; 4xx and
    /// `IsSuccess: false` are rejections.
    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.config.endpoint(path))
            .bearer_auth(&self.config.api_token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(self.config.timeout)
                } else {
                    GatewayError::from(e)
                }
            })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(self.config.timeout)
            } else {
                GatewayError::Transport(e.to_string())
            }
        })?;

        if status.is_server_error() {
            return Err(GatewayError::Transport(format!(
                "gateway returned {status}: {}",
                String::from_utf8_lossy(&bytes)
            )));
        }

        let envelope: ApiResponse<serde_json::Value> = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            Err(_) if status.is_client_error() => {
                return Err(GatewayError::Rejected(GatewayBusinessError::new(
                    format!("gateway returned {status}: {}", String::from_utf8_lossy(&bytes)),
                )));
            }
            Err(e) => return Err(GatewayError::Decode(e.to_string())),
        };

        if status.is_client_error() || !envelope.is_success {
            return Err(GatewayError::Rejected(envelope.business_error()));
        }

        let data = envelope
            .data
            .ok_or_else(|| GatewayError::Decode("response is missing Data".to_string()))?;
        serde_json::from_value(data).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[tracing::instrument(skip(self))]
    async fn initiate_session(&self) -> Result<PaymentSession> {
        let data: InitiateSessionData = self
            .post(INITIATE_SESSION_PATH, &serde_json::json!({}))
            .await?;

        Ok(PaymentSession {
            session_id: SessionId::new(data.session_id),
            country_code: data.country_code,
        })
    }

    #[tracing::instrument(skip(self, order, session_id), fields(order_number = %order.order_number))]
    async fn execute(
        &self,
        order: &Order,
        session_id: &SessionId,
        vendor_slug: &str,
    ) -> Result<Invoice> {
        let request =
            ExecutePaymentRequest::for_order(order, session_id.as_str(), vendor_slug, &self.config);
        let data: ExecutePaymentData = self.post(EXECUTE_PAYMENT_PATH, &request).await?;

        tracing::debug!(invoice_id = %data.invoice_id, "payment executed");
        Ok(Invoice {
            invoice_id: InvoiceId::new(data.invoice_id),
            payment_url: data.payment_url,
            is_direct_payment: data.is_direct_payment,
        })
    }

    #[tracing::instrument(skip(self, invoice_id), fields(invoice_id = %invoice_id))]
    async fn payment_status(&self, invoice_id: &InvoiceId) -> Result<InvoiceReport> {
        let request = PaymentStatusRequest::for_invoice(invoice_id);
        let data: PaymentStatusData = self.post(PAYMENT_STATUS_PATH, &request).await?;

        Ok(InvoiceReport {
            invoice_id: InvoiceId::new(data.invoice_id),
            status: data.invoice_status,
            invoice_value: data.invoice_value,
            customer_reference: data.customer_reference,
        })
    }

    #[tracing::instrument(skip(self, invoice_id), fields(invoice_id = %invoice_id))]
    async fn refund(&self, invoice_id: &InvoiceId, amount: Money) -> Result<RefundReceipt> {
        let request = RefundRequest::full(invoice_id, amount);
        let data: RefundData = self.post(MAKE_REFUND_PATH, &request).await?;

        Ok(RefundReceipt {
            key: data.key,
            refund_id: data.refund_id,
            refund_reference: data.refund_reference,
            refund_amount: data.refund_amount,
            comment: data.comment,
        })
    }
}
