//! Checkout endpoint: converts the user's cart into an order.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use common::AddressId;
use domain::{DeliveryOption, PlaceOrder};
use serde::Deserialize;
use store::CommerceStore;

use crate::error::ApiError;
use crate::routes::orders::OrderResponse;
use crate::routes::require_user;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub address_id: String,
    pub payment_method: String,
    pub delivery_option: String,
    pub coupon_code: Option<String>,
}

/// POST /checkout — place an order from the authenticated user's cart.
#[tracing::instrument(skip(state, headers, req))]
pub async fn place<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let user_id = require_user(&headers)?;

    let address_uuid = uuid::Uuid::parse_str(&req.address_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid address_id: {e}")))?;

    let mut cmd = PlaceOrder::new(
        user_id,
        AddressId::from_uuid(address_uuid),
        req.payment_method,
        DeliveryOption::from_tag(&req.delivery_option),
    );
    if let Some(code) = req.coupon_code {
        cmd = cmd.with_coupon(code);
    }

    let details = state.checkout.place_order(cmd).await?;
    Ok((StatusCode::CREATED, Json(details.into())))
}
