//! Order endpoints: queries, cancellation, status progression, payment.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use common::{Money, OrderId};
use domain::OrderDetails;
use serde::{Deserialize, Serialize};
use store::{CommerceStore, OrderRecord, OrderStatus};

use crate::error::ApiError;
use crate::routes::require_user;
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AdvanceStatusRequest {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
    pub payment_method: String,
    pub delivery_option: String,
    pub subtotal: Money,
    pub shipping_fee: Money,
    pub discount: Money,
    pub grand_total: Money,
    pub created_at: String,
    pub lines: Vec<OrderLineResponse>,
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub unit_discount: Money,
}

#[derive(Serialize)]
pub struct OrderSummaryResponse {
    pub id: String,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
    pub grand_total: Money,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct PaymentSessionResponse {
    pub session_id: String,
    pub redirect_url: String,
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let order = details.order;
        Self {
            id: order.id.to_string(),
            order_number: order.order_number,
            status: order.status.to_string(),
            payment_status: order.payment_status.to_string(),
            payment_method: order.payment_method,
            delivery_option: order.delivery_option,
            subtotal: order.subtotal,
            shipping_fee: order.shipping_fee,
            discount: order.discount,
            grand_total: order.grand_total,
            created_at: order.created_at.to_rfc3339(),
            lines: details
                .lines
                .into_iter()
                .map(|l| OrderLineResponse {
                    product_id: l.product_id.to_string(),
                    product_name: l.product_name,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                    unit_discount: l.unit_discount,
                })
                .collect(),
        }
    }
}

impl From<OrderRecord> for OrderSummaryResponse {
    fn from(order: OrderRecord) -> Self {
        Self {
            id: order.id.to_string(),
            order_number: order.order_number,
            status: order.status.to_string(),
            payment_status: order.payment_status.to_string(),
            grand_total: order.grand_total,
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

// -- Handlers --

/// GET /orders — the authenticated user's orders, newest first.
#[tracing::instrument(skip(state, headers))]
pub async fn list<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let user_id = require_user(&headers)?;
    let orders = state.orders.list_orders(user_id).await?;
    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// GET /orders/{id} — an order with its line snapshots.
#[tracing::instrument(skip(state, headers))]
pub async fn get<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let user_id = require_user(&headers)?;
    let order_id = parse_order_id(&id)?;
    let details = state.orders.get_order(user_id, order_id).await?;
    Ok(Json(details.into()))
}

/// POST /orders/{id}/cancel — cancel a pending order, restoring stock.
#[tracing::instrument(skip(state, headers))]
pub async fn cancel<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let user_id = require_user(&headers)?;
    let order_id = parse_order_id(&id)?;
    let details = state.orders.cancel_order(user_id, order_id).await?;
    Ok(Json(details.into()))
}

/// POST /orders/{id}/status — admin forward transition on the fulfilment
/// track.
#[tracing::instrument(skip(state, req))]
pub async fn advance<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<AdvanceStatusRequest>,
) -> Result<Json<OrderSummaryResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let status = OrderStatus::parse(&req.status)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown order status: {}", req.status)))?;
    let order = state.orders.advance_status(order_id, status).await?;
    Ok(Json(order.into()))
}

/// POST /orders/{id}/pay — create a payment session for the order total.
#[tracing::instrument(skip(state, headers))]
pub async fn pay<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<PaymentSessionResponse>, ApiError> {
    let user_id = require_user(&headers)?;
    let order_id = parse_order_id(&id)?;
    let session = state.payments.start(user_id, order_id).await?;
    Ok(Json(PaymentSessionResponse {
        session_id: session.session_id,
        redirect_url: session.redirect_url,
    }))
}

pub(crate) fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
