//! Notification service trait and implementations.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use super::ServiceError;

/// What happened, from the recipient's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Sent to the customer who placed an order.
    OrderPurchased,
    /// Sent to the vendor who received an order.
    OrderReceived,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::OrderPurchased => "order_purchased",
            NotificationKind::OrderReceived => "order_received",
        }
    }
}

/// Outbound notification delivery. Callers never let a failure here
/// affect the operation that triggered it.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send(&self, kind: NotificationKind, recipient: &str) -> Result<(), ServiceError>;
}

/// Logs notifications instead of delivering them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotificationService;

#[async_trait]
impl NotificationService for TracingNotificationService {
    async fn send(&self, kind: NotificationKind, recipient: &str) -> Result<(), ServiceError> {
        tracing::info!(kind = kind.as_str(), recipient, "notification sent");
        Ok(())
    }
}

/// A notification recorded by [`InMemoryNotificationService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub kind: NotificationKind,
    pub recipient: String,
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    sent: Vec<SentNotification>,
    fail: bool,
    delay: Option<Duration>,
}

/// In-memory notification sink for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationService {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every send fail.
    pub fn set_fail(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail = fail;
    }

    /// Stalls every send for `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .delay = delay;
    }

    /// Returns every notification delivered, oldest first.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .clone()
    }
}

#[async_trait]
impl NotificationService for InMemoryNotificationService {
    async fn send(&self, kind: NotificationKind, recipient: &str) -> Result<(), ServiceError> {
        let (fail, delay) = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            (state.fail, state.delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(ServiceError::new("notification", "mail provider unavailable"));
        }

        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .push(SentNotification {
                kind,
                recipient: recipient.to_string(),
            });
        Ok(())
    }
}
