use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use common::CartId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Registry = Arc<Mutex<HashMap<CartId, Arc<AsyncMutex<()>>>>>;

/// Process-local mutual exclusion per cart.
///
/// Checkout and line-item mutations on one cart run one at a time. Entries
/// are dropped from the registry once nobody holds or awaits them.
#[derive(Debug, Clone, Default)]
pub struct CartLocks {
    registry: Registry,
}

impl CartLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to a cart.
    pub async fn lock(&self, cart_id: CartId) -> CartLockGuard {
        let mutex = {
            let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry.entry(cart_id).or_default().clone()
        };

        let guard = mutex.lock_owned().await;
        CartLockGuard {
            cart_id,
            registry: self.registry.clone(),
            guard: Some(guard),
        }
    }

    /// Returns the number of carts currently locked or awaited.
    pub fn active(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Exclusive access to one cart, released on drop.
#[derive(Debug)]
pub struct CartLockGuard {
    cart_id: CartId,
    registry: Registry,
    guard: Option<OwnedMutexGuard<()>>,
}

impl CartLockGuard {
    pub fn cart_id(&self) -> CartId {
        self.cart_id
    }
}

impl Drop for CartLockGuard {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        drop(self.guard.take());

        // Only the registry's own handle left: no holder, no waiter.
        if registry
            .get(&self.cart_id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            registry.remove(&self.cart_id);
        }
    }
}
