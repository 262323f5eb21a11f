use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use leadline_core::domain::contact::{Contact, ContactId};
use leadline_core::domain::conversation::{Conversation, ConversationId};
use leadline_core::domain::message::{DeliveryStatus, Message};

pub mod contact;
pub mod conversation;
pub mod memory;
pub mod message;

pub use contact::SqlContactRepository;
pub use conversation::SqlConversationRepository;
pub use memory::InMemoryStore;
pub use message::SqlMessageRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("constraint conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError>;

    async fn find_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<Contact>, RepositoryError>;

    async fn save(&self, contact: &Contact) -> Result<(), RepositoryError>;

    /// Contacts whose scheduled first follow-up time has arrived.
    async fn due_for_followup(&self, now: DateTime<Utc>)
        -> Result<Vec<Contact>, RepositoryError>;

    /// Contacts with a recorded NO whose last retry is at or before `cutoff`,
    /// still awaiting confirmation.
    async fn due_for_retry(&self, cutoff: DateTime<Utc>)
        -> Result<Vec<Contact>, RepositoryError>;

    /// Contacts with an open confirmation question, silent since `cutoff`,
    /// and no recorded NO (mutual exclusion with the retry cycle).
    async fn due_for_persistence(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Contact>, RepositoryError>;

    /// Qualified contacts waiting on project creation in the external system.
    async fn pending_project_creation(&self) -> Result<Vec<Contact>, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// The single non-terminal conversation for a technician phone, most
    /// recently active first.
    async fn find_active_by_phone(
        &self,
        technician_phone: &str,
    ) -> Result<Option<Conversation>, RepositoryError>;

    async fn find_active_for_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    async fn save(&self, conversation: &Conversation) -> Result<(), RepositoryError>;

    /// Persists one dialogue turn as a unit: contact mutation, conversation
    /// transition, and the message log entries must not commit separately.
    async fn commit_turn(
        &self,
        contact: &Contact,
        conversation: &Conversation,
        turn_messages: &[Message],
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn append(&self, message: &Message) -> Result<(), RepositoryError>;

    async fn find_by_provider_sid(
        &self,
        provider_sid: &str,
    ) -> Result<Option<Message>, RepositoryError>;

    async fn update_delivery_status(
        &self,
        provider_sid: &str,
        status: DeliveryStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError>;
}

pub(crate) fn encode_datetime(value: DateTime<Utc>) -> String {
    value.to_rfc3339()
}

pub(crate) fn encode_optional_datetime(value: Option<DateTime<Utc>>) -> Option<String> {
    value.map(encode_datetime)
}

pub(crate) fn decode_enum<T>(kind: &str, value: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|error| RepositoryError::Decode(format!("{kind} `{value}`: {error}")))
}

pub(crate) fn decode_datetime(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| RepositoryError::Decode(format!("timestamp `{value}`: {error}")))
}

pub(crate) fn decode_optional_datetime(
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    value.as_deref().map(decode_datetime).transpose()
}
