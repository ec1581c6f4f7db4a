//! Order lookup and settlement endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use checkout::RefundOutcome;
use common::OrderId;
use domain::{InvoiceStatus, Order, OrderStatus, StatusChange};
use payment::PaymentGateway;
use serde::Serialize;
use store::Store;

use super::{AppState, parse_id};
use crate::error::ApiError;

#[derive(Serialize)]
pub struct PaymentStatusResponse {
    pub order_status: OrderStatus,
    pub gateway_status: InvoiceStatus,
    pub changed: bool,
    pub order: Order,
}

/// GET /orders/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<Order>, ApiError> {
    let order_id = parse_id("order", &id, OrderId::parse)?;
    Ok(Json(state.settlement.get_order(order_id).await?))
}

/// GET /orders/{id}/history
#[tracing::instrument(skip(state))]
pub async fn history<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StatusChange>>, ApiError> {
    let order_id = parse_id("order", &id, OrderId::parse)?;
    Ok(Json(state.settlement.status_history(order_id).await?))
}

/// POST /orders/{id}/payment-status
#[tracing::instrument(skip(state))]
pub async fn payment_status<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let order_id = parse_id("order", &id, OrderId::parse)?;
    let report = state.settlement.check_status(order_id).await?;

    Ok(Json(PaymentStatusResponse {
        order_status: report.order.status,
        gateway_status: report.gateway_status,
        changed: report.changed,
        order: report.order,
    }))
}

/// POST /orders/{id}/refund
///
/// A rejected or indeterminate refund is still a 200: it is reported for
/// manual follow-up, not treated as a request failure.
#[tracing::instrument(skip(state))]
pub async fn refund<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<RefundOutcome>, ApiError> {
    let order_id = parse_id("order", &id, OrderId::parse)?;
    Ok(Json(state.settlement.refund(order_id).await?))
}
