use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use leadline_core::domain::contact::ContactId;
use leadline_core::domain::conversation::ConversationId;
use leadline_core::domain::message::{DeliveryStatus, Message, MessageId};

use super::{
    decode_datetime, decode_enum, decode_optional_datetime, encode_datetime,
    encode_optional_datetime, MessageRepository, RepositoryError,
};
use crate::DbPool;

const MESSAGE_COLUMNS: &str = "id, conversation_id, contact_id, direction, from_number, \
     to_number, body, provider_sid, provider_status, sent_at, delivered_at";

pub struct SqlMessageRepository {
    pool: DbPool,
}

impl SqlMessageRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for SqlMessageRepository {
    async fn append(&self, message: &Message) -> Result<(), RepositoryError> {
        insert_message(&self.pool, message).await
    }

    async fn find_by_provider_sid(
        &self,
        provider_sid: &str,
    ) -> Result<Option<Message>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE provider_sid = ?"
        ))
        .bind(provider_sid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(message_from_row).transpose()
    }

    async fn update_delivery_status(
        &self,
        provider_sid: &str,
        status: DeliveryStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE messages SET provider_status = ?, delivered_at = ? WHERE provider_sid = ?",
        )
        .bind(status.as_str())
        .bind(encode_optional_datetime(delivered_at))
        .bind(provider_sid)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub(crate) async fn insert_message<'e, E>(
    executor: E,
    message: &Message,
) -> Result<(), RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO messages (
            id, conversation_id, contact_id, direction, from_number, to_number,
            body, provider_sid, provider_status, sent_at, delivered_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(message.id.0.to_string())
    .bind(message.conversation_id.as_ref().map(|id| id.0.to_string()))
    .bind(message.contact_id.as_ref().map(|id| id.0.to_string()))
    .bind(message.direction.as_str())
    .bind(&message.from_number)
    .bind(&message.to_number)
    .bind(&message.body)
    .bind(message.provider_sid.as_deref())
    .bind(message.provider_status.map(|status| status.as_str()))
    .bind(encode_datetime(message.sent_at))
    .bind(encode_optional_datetime(message.delivered_at))
    .execute(executor)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
            Err(RepositoryError::Conflict(format!(
                "message with provider sid {:?} already logged",
                message.provider_sid
            )))
        }
        Err(error) => Err(error.into()),
    }
}

fn message_from_row(row: SqliteRow) -> Result<Message, RepositoryError> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|error| RepositoryError::Decode(format!("message id `{id}`: {error}")))?;

    let conversation_id: Option<String> = row.get("conversation_id");
    let conversation_id = conversation_id
        .map(|value| {
            Uuid::parse_str(&value).map(ConversationId).map_err(|error| {
                RepositoryError::Decode(format!("conversation id `{value}`: {error}"))
            })
        })
        .transpose()?;

    let contact_id: Option<String> = row.get("contact_id");
    let contact_id = contact_id
        .map(|value| {
            Uuid::parse_str(&value)
                .map(ContactId)
                .map_err(|error| RepositoryError::Decode(format!("contact id `{value}`: {error}")))
        })
        .transpose()?;

    let direction: String = row.get("direction");
    let provider_status: Option<String> = row.get("provider_status");

    Ok(Message {
        id: MessageId(id),
        conversation_id,
        contact_id,
        direction: decode_enum("message direction", &direction)?,
        from_number: row.get("from_number"),
        to_number: row.get("to_number"),
        body: row.get("body"),
        provider_sid: row.get("provider_sid"),
        provider_status: provider_status
            .as_deref()
            .map(|value| decode_enum("delivery status", value))
            .transpose()?,
        sent_at: decode_datetime(&row.get::<String, _>("sent_at"))?,
        delivered_at: decode_optional_datetime(row.get("delivered_at"))?,
    })
}
