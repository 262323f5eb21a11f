//! Twilio webhook endpoints.
//!
//! `POST /webhooks/sms` receives technician replies; the response body is an
//! empty TwiML document because every reply goes out through the REST API
//! inside the conversation turn, not synchronously. `POST /webhooks/sms/status`
//! receives delivery receipts for outbound messages.

use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use chrono::Utc;
use tracing::{debug, error, info};

use leadline_agent::{ConversationService, InboundDisposition};
use leadline_core::domain::message::DeliveryStatus;
use leadline_db::repositories::MessageRepository;
use leadline_sms::{empty_twiml, DeliveryStatusPayload, InboundSmsPayload};

#[derive(Clone)]
pub struct WebhookState {
    pub service: Arc<ConversationService>,
    pub messages: Arc<dyn MessageRepository>,
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhooks/sms", post(inbound_sms))
        .route("/webhooks/sms/status", post(delivery_status))
        .with_state(state)
}

async fn inbound_sms(
    State(state): State<WebhookState>,
    Form(payload): Form<InboundSmsPayload>,
) -> Response {
    match state
        .service
        .handle_inbound_sms(&payload.from, &payload.body, &payload.message_sid, Utc::now())
        .await
    {
        Ok(disposition) => {
            info!(
                event_name = "webhook.sms.received",
                from = %payload.from,
                provider_sid = %payload.message_sid,
                disposition = disposition_label(&disposition),
                "inbound sms processed"
            );
            twiml_ack()
        }
        Err(error) => {
            error!(
                event_name = "webhook.sms.error",
                from = %payload.from,
                provider_sid = %payload.message_sid,
                error = %error,
                "inbound sms processing failed"
            );
            // A 500 makes the provider retry the delivery later.
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn delivery_status(
    State(state): State<WebhookState>,
    Form(payload): Form<DeliveryStatusPayload>,
) -> Response {
    let Some(status) = payload.delivery_status() else {
        debug!(
            event_name = "webhook.status.ignored",
            provider_sid = %payload.message_sid,
            raw_status = %payload.message_status,
            "unrecognized delivery status acknowledged"
        );
        return StatusCode::OK.into_response();
    };

    let delivered_at = (status == DeliveryStatus::Delivered).then(Utc::now);
    match state.messages.update_delivery_status(&payload.message_sid, status, delivered_at).await {
        Ok(()) => {
            debug!(
                event_name = "webhook.status.updated",
                provider_sid = %payload.message_sid,
                status = status.as_str(),
                error_code = payload.error_code.as_deref().unwrap_or(""),
                "delivery status recorded"
            );
            StatusCode::OK.into_response()
        }
        Err(error) => {
            error!(
                event_name = "webhook.status.error",
                provider_sid = %payload.message_sid,
                error = %error,
                "delivery status update failed"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn twiml_ack() -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], empty_twiml()).into_response()
}

fn disposition_label(disposition: &InboundDisposition) -> &'static str {
    match disposition {
        InboundDisposition::DuplicateDelivery => "duplicate_delivery",
        InboundDisposition::NoActiveConversation => "no_active_conversation",
        InboundDisposition::SendFailed => "send_failed",
        InboundDisposition::Replied { .. } => "replied",
    }
}
