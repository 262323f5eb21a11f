use serde::Deserialize;

use leadline_core::domain::message::DeliveryStatus;

/// Form body Twilio posts for an inbound SMS.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct InboundSmsPayload {
    #[serde(rename = "MessageSid")]
    pub message_sid: String,
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

/// Form body Twilio posts to the delivery status callback.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct DeliveryStatusPayload {
    #[serde(rename = "MessageSid")]
    pub message_sid: String,
    #[serde(rename = "MessageStatus")]
    pub message_status: String,
    #[serde(rename = "ErrorCode", default)]
    pub error_code: Option<String>,
}

impl DeliveryStatusPayload {
    /// Collapses Twilio's status vocabulary onto the tracked delivery states.
    /// Unknown values return `None` and the callback is acknowledged without
    /// touching the log.
    pub fn delivery_status(&self) -> Option<DeliveryStatus> {
        match self.message_status.to_ascii_lowercase().as_str() {
            "accepted" | "queued" | "scheduled" => Some(DeliveryStatus::Queued),
            "sending" | "sent" => Some(DeliveryStatus::Sent),
            "delivered" | "read" => Some(DeliveryStatus::Delivered),
            "undelivered" => Some(DeliveryStatus::Undelivered),
            "failed" | "canceled" => Some(DeliveryStatus::Failed),
            "received" => Some(DeliveryStatus::Received),
            _ => None,
        }
    }
}

/// Twilio expects a TwiML document in the webhook response; an empty one
/// acknowledges the message without sending a synchronous reply.
pub fn empty_twiml() -> &'static str {
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response></Response>"
}
