//! Cart endpoints: view, line mutation, clear and guest merge.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::{GuestToken, Money, ProductId};
use domain::CartView;
use serde::{Deserialize, Serialize};
use store::CommerceStore;

use crate::error::ApiError;
use crate::routes::{require_user, shopper_identity};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AddLineRequest {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateLineRequest {
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct MergeRequest {
    pub guest_token: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartResponse {
    pub cart_id: String,
    pub lines: Vec<CartLineResponse>,
    pub subtotal: Money,
    pub savings: Money,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_subtotal: Money,
    pub line_savings: Money,
}

impl From<CartView> for CartResponse {
    fn from(view: CartView) -> Self {
        Self {
            cart_id: view.cart_id.to_string(),
            lines: view
                .lines
                .into_iter()
                .map(|l| CartLineResponse {
                    product_id: l.product_id.to_string(),
                    product_name: l.product_name,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                    line_subtotal: l.line_subtotal,
                    line_savings: l.line_savings,
                })
                .collect(),
            subtotal: view.subtotal,
            savings: view.savings,
        }
    }
}

// -- Handlers --

/// GET /cart — resolved cart with computed summary.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<CartResponse>, ApiError> {
    let identity = shopper_identity(&headers)?;
    let view = state.carts.view(&identity).await?;
    Ok(Json(view.into()))
}

/// POST /cart/lines — add a product to the cart.
#[tracing::instrument(skip(state, headers, req))]
pub async fn add_line<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<AddLineRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let identity = shopper_identity(&headers)?;
    let view = state
        .carts
        .add_line(&identity, &ProductId::new(req.product_id), req.quantity)
        .await?;
    Ok(Json(view.into()))
}

/// PUT /cart/lines/{product_id} — set a line to an exact quantity.
#[tracing::instrument(skip(state, headers, req))]
pub async fn update_line<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
    Json(req): Json<UpdateLineRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let identity = shopper_identity(&headers)?;
    let view = state
        .carts
        .update_quantity(&identity, &ProductId::new(product_id), req.quantity)
        .await?;
    Ok(Json(view.into()))
}

/// DELETE /cart/lines/{product_id} — remove a line.
#[tracing::instrument(skip(state, headers))]
pub async fn remove_line<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Result<Json<CartResponse>, ApiError> {
    let identity = shopper_identity(&headers)?;
    let view = state
        .carts
        .remove_line(&identity, &ProductId::new(product_id))
        .await?;
    Ok(Json(view.into()))
}

/// DELETE /cart — remove all lines; the cart row persists.
#[tracing::instrument(skip(state, headers))]
pub async fn clear<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<CartResponse>, ApiError> {
    let identity = shopper_identity(&headers)?;
    let view = state.carts.clear(&identity).await?;
    Ok(Json(view.into()))
}

/// POST /cart/merge — fold a guest cart into the authenticated user's cart.
///
/// The client presents its remembered guest token explicitly after login;
/// the guest identity is retired permanently on success.
#[tracing::instrument(skip(state, headers, req))]
pub async fn merge<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<MergeRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let user_id = require_user(&headers)?;
    let view = state
        .carts
        .merge_guest_cart(user_id, &GuestToken::new(req.guest_token))
        .await?;
    Ok(Json(view.into()))
}
