//! HTTP handlers.

pub mod carts;
pub mod orders;
pub mod payments;
pub mod system;

use checkout::{
    CartLocks, CartService, CheckoutConfig, CheckoutCoordinator, InMemoryCatalogService,
    InMemoryVendorService, SettlementService, TracingNotificationService,
};
use payment::PaymentGateway;
use store::Store;

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S, G>
where
    S: Store,
    G: PaymentGateway + Clone + 'static,
{
    pub carts: CartService<S, InMemoryCatalogService>,
    pub checkout: CheckoutCoordinator<S, G, InMemoryVendorService, TracingNotificationService>,
    pub settlement: SettlementService<S, G>,
}

impl<S, G> AppState<S, G>
where
    S: Store,
    G: PaymentGateway + Clone + 'static,
{
    /// Wires the checkout services over one store and gateway. All of them
    /// share a single set of cart locks.
    pub fn new(
        store: S,
        gateway: G,
        catalog: InMemoryCatalogService,
        vendors: InMemoryVendorService,
        config: CheckoutConfig,
    ) -> Self {
        let locks = CartLocks::new();
        Self {
            carts: CartService::new(store.clone(), catalog, locks.clone(), config.clone()),
            checkout: CheckoutCoordinator::new(
                store.clone(),
                gateway.clone(),
                vendors,
                TracingNotificationService,
                locks,
                config.clone(),
            ),
            settlement: SettlementService::new(store, gateway, config),
        }
    }
}

/// Parses a path identifier, naming it in the error.
pub(crate) fn parse_id<T, E: std::fmt::Display>(
    kind: &str,
    raw: &str,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<T, ApiError> {
    parse(raw).map_err(|e| ApiError::BadRequest(format!("Invalid {kind} id {raw}: {e}")))
}
