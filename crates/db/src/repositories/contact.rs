use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use leadline_core::domain::contact::{Contact, ContactId};

use super::{
    decode_datetime, decode_enum, decode_optional_datetime, encode_datetime,
    encode_optional_datetime, ContactRepository, RepositoryError,
};
use crate::DbPool;

const CONTACT_COLUMNS: &str = "id, external_id, first_name, last_name, full_name, email, phone, \
     address, status, outcome, project_type, property_type, residential_subtype, has_insurance, \
     insurance_company, referral_source, project_creation_needed, project_created, \
     external_project_id, retry_count, last_retry_at, persistence_mode, persistence_count, \
     last_persistence_at, created_at, external_created_at, follow_up_scheduled_at, \
     follow_up_sent_at, contact_made_at, outcome_received_at, completed_at";

pub struct SqlContactRepository {
    pool: DbPool,
}

impl SqlContactRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContactRepository for SqlContactRepository {
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        let row =
            sqlx::query(&format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?"))
                .bind(id.0.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(contact_from_row).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<Contact>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts WHERE external_id = ?"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(contact_from_row).transpose()
    }

    async fn save(&self, contact: &Contact) -> Result<(), RepositoryError> {
        upsert_contact(&self.pool, contact).await
    }

    async fn due_for_followup(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE status = 'follow_up_scheduled'
               AND follow_up_scheduled_at IS NOT NULL
               AND follow_up_scheduled_at <= ?
             ORDER BY follow_up_scheduled_at ASC"
        ))
        .bind(encode_datetime(now))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(contact_from_row).collect()
    }

    async fn due_for_retry(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query(&contact_join_query(
            "c.last_retry_at IS NOT NULL AND c.last_retry_at <= ?",
        ))
        .bind(encode_datetime(cutoff))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(contact_from_row).collect()
    }

    async fn due_for_persistence(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query(&contact_join_query(
            "c.last_retry_at IS NULL AND v.last_message_at <= ?",
        ))
        .bind(encode_datetime(cutoff))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(contact_from_row).collect()
    }

    async fn pending_project_creation(&self) -> Result<Vec<Contact>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE project_creation_needed = 1 AND project_created = 0
             ORDER BY outcome_received_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(contact_from_row).collect()
    }
}

fn contact_join_query(extra_predicate: &str) -> String {
    let columns: String = CONTACT_COLUMNS
        .split(", ")
        .map(|column| format!("c.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {columns} FROM contacts c
         JOIN conversations v ON v.contact_id = c.id
         WHERE v.state = 'awaiting_contact_confirmation'
           AND v.completed_at IS NULL
           AND {extra_predicate}
         ORDER BY v.last_message_at ASC"
    )
}

pub(crate) async fn upsert_contact<'e, E>(executor: E, contact: &Contact) -> Result<(), RepositoryError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO contacts (
            id, external_id, first_name, last_name, full_name, email, phone, address,
            status, outcome, project_type, property_type, residential_subtype, has_insurance,
            insurance_company, referral_source, project_creation_needed, project_created,
            external_project_id, retry_count, last_retry_at, persistence_mode,
            persistence_count, last_persistence_at, created_at, external_created_at,
            follow_up_scheduled_at, follow_up_sent_at, contact_made_at, outcome_received_at,
            completed_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
            external_id = excluded.external_id,
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            full_name = excluded.full_name,
            email = excluded.email,
            phone = excluded.phone,
            address = excluded.address,
            status = excluded.status,
            outcome = excluded.outcome,
            project_type = excluded.project_type,
            property_type = excluded.property_type,
            residential_subtype = excluded.residential_subtype,
            has_insurance = excluded.has_insurance,
            insurance_company = excluded.insurance_company,
            referral_source = excluded.referral_source,
            project_creation_needed = excluded.project_creation_needed,
            project_created = excluded.project_created,
            external_project_id = excluded.external_project_id,
            retry_count = excluded.retry_count,
            last_retry_at = excluded.last_retry_at,
            persistence_mode = excluded.persistence_mode,
            persistence_count = excluded.persistence_count,
            last_persistence_at = excluded.last_persistence_at,
            external_created_at = excluded.external_created_at,
            follow_up_scheduled_at = excluded.follow_up_scheduled_at,
            follow_up_sent_at = excluded.follow_up_sent_at,
            contact_made_at = excluded.contact_made_at,
            outcome_received_at = excluded.outcome_received_at,
            completed_at = excluded.completed_at",
    )
    .bind(contact.id.0.to_string())
    .bind(contact.external_id)
    .bind(contact.first_name.as_deref())
    .bind(contact.last_name.as_deref())
    .bind(&contact.full_name)
    .bind(contact.email.as_deref())
    .bind(contact.phone.as_deref())
    .bind(contact.address.as_deref())
    .bind(contact.status.as_str())
    .bind(contact.outcome.as_str())
    .bind(contact.project_type.map(|value| value.as_str()))
    .bind(contact.property_type.map(|value| value.as_str()))
    .bind(contact.residential_subtype.map(|value| value.as_str()))
    .bind(contact.has_insurance)
    .bind(contact.insurance_company.as_deref())
    .bind(contact.referral_source.map(|value| value.as_str()))
    .bind(contact.project_creation_needed)
    .bind(contact.project_created)
    .bind(contact.external_project_id)
    .bind(i64::from(contact.retry_count))
    .bind(encode_optional_datetime(contact.last_retry_at))
    .bind(contact.persistence_mode)
    .bind(i64::from(contact.persistence_count))
    .bind(encode_optional_datetime(contact.last_persistence_at))
    .bind(encode_datetime(contact.created_at))
    .bind(encode_optional_datetime(contact.external_created_at))
    .bind(encode_optional_datetime(contact.follow_up_scheduled_at))
    .bind(encode_optional_datetime(contact.follow_up_sent_at))
    .bind(encode_optional_datetime(contact.contact_made_at))
    .bind(encode_optional_datetime(contact.outcome_received_at))
    .bind(encode_optional_datetime(contact.completed_at))
    .execute(executor)
    .await?;

    Ok(())
}

fn contact_from_row(row: SqliteRow) -> Result<Contact, RepositoryError> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|error| RepositoryError::Decode(format!("contact id `{id}`: {error}")))?;

    let status: String = row.get("status");
    let outcome: String = row.get("outcome");
    let project_type: Option<String> = row.get("project_type");
    let property_type: Option<String> = row.get("property_type");
    let residential_subtype: Option<String> = row.get("residential_subtype");
    let referral_source: Option<String> = row.get("referral_source");

    Ok(Contact {
        id: ContactId(id),
        external_id: row.get("external_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        address: row.get("address"),
        status: decode_enum("contact status", &status)?,
        outcome: decode_enum("outcome", &outcome)?,
        project_type: project_type
            .as_deref()
            .map(|value| decode_enum("project type", value))
            .transpose()?,
        property_type: property_type
            .as_deref()
            .map(|value| decode_enum("property type", value))
            .transpose()?,
        residential_subtype: residential_subtype
            .as_deref()
            .map(|value| decode_enum("residential subtype", value))
            .transpose()?,
        has_insurance: row.get("has_insurance"),
        insurance_company: row.get("insurance_company"),
        referral_source: referral_source
            .as_deref()
            .map(|value| decode_enum("referral source", value))
            .transpose()?,
        project_creation_needed: row.get("project_creation_needed"),
        project_created: row.get("project_created"),
        external_project_id: row.get("external_project_id"),
        retry_count: row.get::<i64, _>("retry_count") as u32,
        last_retry_at: decode_optional_datetime(row.get("last_retry_at"))?,
        persistence_mode: row.get("persistence_mode"),
        persistence_count: row.get::<i64, _>("persistence_count") as u32,
        last_persistence_at: decode_optional_datetime(row.get("last_persistence_at"))?,
        created_at: decode_datetime(&row.get::<String, _>("created_at"))?,
        external_created_at: decode_optional_datetime(row.get("external_created_at"))?,
        follow_up_scheduled_at: decode_optional_datetime(row.get("follow_up_scheduled_at"))?,
        follow_up_sent_at: decode_optional_datetime(row.get("follow_up_sent_at"))?,
        contact_made_at: decode_optional_datetime(row.get("contact_made_at"))?,
        outcome_received_at: decode_optional_datetime(row.get("outcome_received_at"))?,
        completed_at: decode_optional_datetime(row.get("completed_at"))?,
    })
}
