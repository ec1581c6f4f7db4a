//! Cart endpoints and checkout.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{CheckoutOutcome, NewCartItem, PaymentOutcome};
use common::{CartId, CustomerId, VendorId};
use domain::{Cart, CartItemPatch, CartUpdate, ItemAttributes, Order, ProductId, Sku};
use payment::{GatewayValidationError, PaymentGateway, SessionId};
use serde::{Deserialize, Serialize};
use store::Store;

use super::{AppState, parse_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct OpenCartRequest {
    pub customer_id: CustomerId,
    pub vendor_id: VendorId,
}

#[derive(Deserialize)]
pub struct UpdateItemRequest {
    pub product_id: ProductId,
    pub sku: Sku,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub attributes: Option<ItemAttributes>,
}

#[derive(Deserialize, Default)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub payment_session: Option<SessionId>,
}

// -- Response types --

/// Order snapshot plus payment outcome. `errors` is set only when the
/// gateway rejected the payment.
#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order: Order,
    pub reused: bool,
    pub payment: Option<PaymentOutcome>,
    pub errors: Option<Vec<GatewayValidationError>>,
}

impl From<CheckoutOutcome> for CheckoutResponse {
    fn from(outcome: CheckoutOutcome) -> Self {
        let errors = outcome.errors();
        let payment = outcome.payment_outcome().cloned();
        Self {
            order: outcome.order,
            reused: outcome.reused,
            payment,
            errors,
        }
    }
}

// -- Handlers --

/// POST /carts
#[tracing::instrument(skip(state, req))]
pub async fn open<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Json(req): Json<OpenCartRequest>,
) -> Result<Json<Cart>, ApiError> {
    let cart = state
        .carts
        .get_or_create_cart(req.customer_id, req.vendor_id)
        .await?;
    Ok(Json(cart))
}

/// GET /carts/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<Json<Cart>, ApiError> {
    let cart_id = parse_id("cart", &id, CartId::parse)?;
    Ok(Json(state.carts.get_cart(cart_id).await?))
}

/// PATCH /carts/{id}
#[tracing::instrument(skip(state, update))]
pub async fn update<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(update): Json<CartUpdate>,
) -> Result<Json<Cart>, ApiError> {
    let cart_id = parse_id("cart", &id, CartId::parse)?;
    Ok(Json(state.carts.update_cart(cart_id, update).await?))
}

/// DELETE /carts/{id}
#[tracing::instrument(skip(state))]
pub async fn abandon<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let cart_id = parse_id("cart", &id, CartId::parse)?;
    state.carts.delete_cart(cart_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /carts/{id}/items
#[tracing::instrument(skip(state, item))]
pub async fn add_item<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(item): Json<NewCartItem>,
) -> Result<Json<Cart>, ApiError> {
    let cart_id = parse_id("cart", &id, CartId::parse)?;
    Ok(Json(state.carts.add_item(cart_id, item).await?))
}

/// PUT /carts/{id}/items
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<Cart>, ApiError> {
    let cart_id = parse_id("cart", &id, CartId::parse)?;
    let patch = CartItemPatch {
        quantity: req.quantity,
        attributes: req.attributes,
    };
    let cart = state
        .carts
        .update_item(cart_id, req.product_id, req.sku, patch)
        .await?;
    Ok(Json(cart))
}

/// DELETE /carts/{id}/items/{product_id}/{sku}
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Path((id, product_id, sku)): Path<(String, String, String)>,
) -> Result<Json<Cart>, ApiError> {
    let cart_id = parse_id("cart", &id, CartId::parse)?;
    let cart = state
        .carts
        .remove_item(cart_id, product_id.into(), sku.into())
        .await?;
    Ok(Json(cart))
}

/// POST /carts/{id}/checkout
///
/// Gateway rejections come back as 200 with `errors` set; only failed
/// preconditions and infrastructure failures are error statuses.
#[tracing::instrument(skip(state, req))]
pub async fn checkout<S: Store, G: PaymentGateway + Clone + 'static>(
    State(state): State<Arc<AppState<S, G>>>,
    Path(id): Path<String>,
    req: Option<Json<CheckoutRequest>>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let cart_id = parse_id("cart", &id, CartId::parse)?;
    let Json(req) = req.unwrap_or_default();
    let outcome = state
        .checkout
        .checkout(cart_id, req.payment_session)
        .await?;
    Ok(Json(outcome.into()))
}
