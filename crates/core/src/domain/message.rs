use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::contact::ContactId;
use crate::domain::conversation::ConversationId;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            other => Err(DomainError::unknown("message direction", other)),
        }
    }
}

/// Delivery state reported by the message provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Queued,
    Sent,
    Delivered,
    Failed,
    Undelivered,
    Received,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
            Self::Undelivered => "undelivered",
            Self::Received => "received",
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "queued" => Ok(Self::Queued),
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            "undelivered" => Ok(Self::Undelivered),
            "received" => Ok(Self::Received),
            other => Err(DomainError::unknown("delivery status", other)),
        }
    }
}

/// Immutable log record of one SMS.
///
/// Append-only: after creation only the delivery status (keyed by the
/// provider message id) may change. References to contact and conversation
/// are weak lookups; a stray inbound notice carries neither.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: Option<ConversationId>,
    pub contact_id: Option<ContactId>,
    pub direction: Direction,
    pub from_number: String,
    pub to_number: String,
    pub body: String,
    pub provider_sid: Option<String>,
    pub provider_status: Option<DeliveryStatus>,
    pub sent_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Message {
    pub fn inbound(
        conversation_id: ConversationId,
        contact_id: ContactId,
        from_number: impl Into<String>,
        to_number: impl Into<String>,
        body: impl Into<String>,
        provider_sid: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id: Some(conversation_id),
            contact_id: Some(contact_id),
            direction: Direction::Inbound,
            from_number: from_number.into(),
            to_number: to_number.into(),
            body: body.into(),
            provider_sid: Some(provider_sid.into()),
            provider_status: Some(DeliveryStatus::Received),
            sent_at: now,
            delivered_at: None,
        }
    }

    pub fn outbound(
        conversation_id: Option<ConversationId>,
        contact_id: Option<ContactId>,
        from_number: impl Into<String>,
        to_number: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            conversation_id,
            contact_id,
            direction: Direction::Outbound,
            from_number: from_number.into(),
            to_number: to_number.into(),
            body: body.into(),
            provider_sid: None,
            provider_status: None,
            sent_at: now,
            delivered_at: None,
        }
    }

    pub fn with_receipt(mut self, provider_sid: impl Into<String>, status: DeliveryStatus) -> Self {
        self.provider_sid = Some(provider_sid.into());
        self.provider_status = Some(status);
        self
    }
}
