use std::future::Future;
use std::time::Duration;

use crate::error::{CheckoutError, Result};

/// Bounds on every blocking call the checkout services make.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Limit for each cart store or order ledger call.
    pub store_timeout: Duration,
    /// Limit for each payment gateway call.
    pub gateway_timeout: Duration,
    /// Limit for each notification send.
    pub notification_timeout: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            gateway_timeout: Duration::from_secs(15),
            notification_timeout: Duration::from_secs(2),
        }
    }
}

/// Runs a store call under `limit`. Elapsed counts as a persistence failure.
pub(crate) async fn bounded_store<T, F>(limit: Duration, op: &'static str, call: F) -> Result<T>
where
    F: Future<Output = store::Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(|err| {
            if err.is_unavailable() {
                tracing::error!(op, error = %err, "store call failed");
            }
            CheckoutError::from(err)
        }),
        Err(_) => {
            tracing::error!(op, ?limit, "store call timed out");
            Err(CheckoutError::Persistence(format!(
                "{op} timed out after {limit:?}"
            )))
        }
    }
}
