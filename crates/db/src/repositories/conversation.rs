use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use leadline_core::domain::contact::{Contact, ContactId};
use leadline_core::domain::conversation::{Conversation, ConversationId};
use leadline_core::domain::message::Message;

use super::contact::upsert_contact;
use super::message::insert_message;
use super::{
    decode_datetime, decode_enum, decode_optional_datetime, encode_datetime,
    encode_optional_datetime, ConversationRepository, RepositoryError,
};
use crate::DbPool;

const CONVERSATION_COLUMNS: &str = "id, contact_id, state, technician_phone, contact_confirmed, \
     outcome, outcome_details, started_at, last_message_at, completed_at";

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?"
        ))
        .bind(id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(conversation_from_row).transpose()
    }

    async fn find_active_by_phone(
        &self,
        technician_phone: &str,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE technician_phone = ? AND state != 'completed'
             ORDER BY last_message_at DESC
             LIMIT 1"
        ))
        .bind(technician_phone)
        .fetch_optional(&self.pool)
        .await?;

        row.map(conversation_from_row).transpose()
    }

    async fn find_active_for_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE contact_id = ? AND state != 'completed'
             LIMIT 1"
        ))
        .bind(contact_id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(conversation_from_row).transpose()
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        upsert_conversation(&self.pool, conversation).await
    }

    async fn commit_turn(
        &self,
        contact: &Contact,
        conversation: &Conversation,
        turn_messages: &[Message],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        upsert_contact(&mut *tx, contact).await?;
        upsert_conversation(&mut *tx, conversation).await?;
        for message in turn_messages {
            insert_message(&mut *tx, message).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

pub(crate) async fn upsert_conversation<'e, E>(
    executor: E,
    conversation: &Conversation,
) -> Result<(), RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO conversations (
            id, contact_id, state, technician_phone, contact_confirmed, outcome,
            outcome_details, started_at, last_message_at, completed_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            state = excluded.state,
            contact_confirmed = excluded.contact_confirmed,
            outcome = excluded.outcome,
            outcome_details = excluded.outcome_details,
            last_message_at = excluded.last_message_at,
            completed_at = excluded.completed_at",
    )
    .bind(conversation.id.0.to_string())
    .bind(conversation.contact_id.0.to_string())
    .bind(conversation.state.as_str())
    .bind(&conversation.technician_phone)
    .bind(conversation.contact_confirmed)
    .bind(conversation.outcome.map(|value| value.as_str()))
    .bind(conversation.outcome_details.as_deref())
    .bind(encode_datetime(conversation.started_at))
    .bind(encode_datetime(conversation.last_message_at))
    .bind(encode_optional_datetime(conversation.completed_at))
    .execute(executor)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
            Err(RepositoryError::Conflict(format!(
                "contact {} already has an active conversation",
                conversation.contact_id.0
            )))
        }
        Err(error) => Err(error.into()),
    }
}

fn conversation_from_row(row: SqliteRow) -> Result<Conversation, RepositoryError> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|error| RepositoryError::Decode(format!("conversation id `{id}`: {error}")))?;

    let contact_id: String = row.get("contact_id");
    let contact_id = Uuid::parse_str(&contact_id)
        .map_err(|error| RepositoryError::Decode(format!("contact id `{contact_id}`: {error}")))?;

    let state: String = row.get("state");
    let outcome: Option<String> = row.get("outcome");

    Ok(Conversation {
        id: ConversationId(id),
        contact_id: ContactId(contact_id),
        state: decode_enum("dialogue state", &state)?,
        technician_phone: row.get("technician_phone"),
        contact_confirmed: row.get("contact_confirmed"),
        outcome: outcome
            .as_deref()
            .map(|value| decode_enum("outcome", value))
            .transpose()?,
        outcome_details: row.get("outcome_details"),
        started_at: decode_datetime(&row.get::<String, _>("started_at"))?,
        last_message_at: decode_datetime(&row.get::<String, _>("last_message_at"))?,
        completed_at: decode_optional_datetime(row.get("completed_at"))?,
    })
}
