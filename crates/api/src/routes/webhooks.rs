//! Webhook relay endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use payments::PaymentNotification;
use serde::Serialize;
use store::CommerceStore;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct WebhookAckResponse {
    pub order_id: String,
    pub status: String,
    pub payment_status: String,
}

/// POST /webhooks/payment — apply a gateway payment notification.
///
/// Signature verification happens upstream; this endpoint only receives
/// already-verified payloads.
#[tracing::instrument(skip(state, notification))]
pub async fn payment<S: CommerceStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(notification): Json<PaymentNotification>,
) -> Result<Json<WebhookAckResponse>, ApiError> {
    let order = state.payments.handle_notification(&notification).await?;

    Ok(Json(WebhookAckResponse {
        order_id: order.id.to_string(),
        status: order.status.to_string(),
        payment_status: order.payment_status.to_string(),
    }))
}
