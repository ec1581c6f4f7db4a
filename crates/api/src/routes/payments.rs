//! Payment session endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use payment::{PaymentGateway, PaymentSession};
use store::Store;

use super::AppState;
use crate::error::ApiError;

/// POST /payments/session
#[tracing::instrument(skip(state))]
pub async fn initiate_session<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
) -> Result<Json<PaymentSession>, ApiError> {
    Ok(Json(state.settlement.initiate_session().await?))
}
