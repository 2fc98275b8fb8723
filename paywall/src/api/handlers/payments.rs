//! HTTP handler for payment processor webhooks.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::{AppState, metrics};

/// Receive a subscription webhook from the configured payment provider.
///
/// Signature and parse failures return 400 so the processor surfaces them. Storage failures
/// return 500 so the delivery is retried; applying an event twice leaves the same state.
#[utoipa::path(
    post,
    path = "/webhooks/payments",
    tag = "payments",
    summary = "Payment webhook",
    request_body(content = String, description = "Raw provider payload", content_type = "application/json"),
    responses(
        (status = 200, description = "Event applied or ignored"),
        (status = 400, description = "Invalid signature or payload"),
        (status = 500, description = "Event could not be applied"),
        (status = 501, description = "No payment provider configured"),
    )
)]
#[tracing::instrument(skip_all)]
pub async fn webhook_handler(State(state): State<AppState>, headers: HeaderMap, body: String) -> StatusCode {
    let Some(provider) = state.payment_provider.as_ref() else {
        tracing::warn!("Payment webhook called but no payment provider is configured");
        return StatusCode::NOT_IMPLEMENTED;
    };

    let event = match provider.validate_webhook(&headers, &body).await {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(provider = provider.name(), "Rejected webhook: {}", e);
            metrics::record_billing_event("unknown", "rejected");
            return StatusCode::from(&e);
        }
    };

    tracing::info!(provider = provider.name(), event_type = %event.event_type, "Received webhook event");

    match provider.process_webhook_event(&state.db, &event).await {
        Ok(()) => {
            metrics::record_billing_event(&event.event_type, "applied");
            StatusCode::OK
        }
        Err(e) => {
            tracing::error!(event_type = %event.event_type, "Failed to apply webhook event: {}", e);
            metrics::record_billing_event(&event.event_type, "failed");
            StatusCode::from(&e)
        }
    }
}
