use sqlx::migrate::{MigrateError, Migrator};

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Applies outstanding migrations and reports how many ran.
pub async fn run_pending(pool: &DbPool) -> Result<u64, MigrateError> {
    let before = applied_count(pool).await;
    MIGRATOR.run(pool).await?;
    Ok(applied_count(pool).await.saturating_sub(before))
}

async fn applied_count(pool: &DbPool) -> u64 {
    // The ledger table does not exist before the first run.
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .map(|count| count.max(0) as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::run_pending;
    use crate::{connect_with_settings, DbPool, PoolSettings};

    // Private in-memory databases live on a single connection.
    async fn memory_pool() -> DbPool {
        let settings = PoolSettings { max_connections: 1, ..PoolSettings::default() };
        connect_with_settings("sqlite::memory:", settings).await.expect("connect")
    }

    const MANAGED_SCHEMA_OBJECTS: &[&str] = &[
        "contacts",
        "conversations",
        "messages",
        "idx_contacts_status",
        "idx_contacts_last_retry_at",
        "idx_contacts_follow_up_scheduled_at",
        "idx_contacts_project_creation",
        "idx_conversations_one_active_per_contact",
        "idx_conversations_phone_state",
        "idx_conversations_last_message_at",
        "idx_messages_conversation_id",
        "idx_messages_contact_id",
        "idx_messages_sent_at",
    ];

    #[tokio::test]
    async fn migrations_create_tracking_schema() {
        let pool = memory_pool().await;
        run_pending(&pool).await.expect("run migrations");

        for object in MANAGED_SCHEMA_OBJECTS {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = ?",
            )
            .bind(object)
            .fetch_one(&pool)
            .await
            .expect("schema lookup");
            assert_eq!(count, 1, "expected schema object `{object}`");
        }
    }

    #[tokio::test]
    async fn run_pending_reports_newly_applied_migrations() {
        let pool = memory_pool().await;

        let first = run_pending(&pool).await.expect("first run");
        assert_eq!(first, 1);

        let second = run_pending(&pool).await.expect("second run");
        assert_eq!(second, 0, "an up-to-date schema applies nothing");
    }

    #[tokio::test]
    async fn active_conversation_uniqueness_is_enforced() {
        let pool = memory_pool().await;
        run_pending(&pool).await.expect("run migrations");

        sqlx::query(
            "INSERT INTO contacts (id, external_id, full_name, status, outcome, created_at)
             VALUES ('c-1', 1, 'Test Contact', 'new', 'pending', '2026-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await
        .expect("insert contact");

        let insert_conversation = |id: &'static str, state: &'static str| {
            let pool = pool.clone();
            async move {
                sqlx::query(
                    "INSERT INTO conversations
                        (id, contact_id, state, technician_phone, started_at, last_message_at)
                     VALUES (?, 'c-1', ?, '+15550001111',
                             '2026-01-01T00:00:00Z', '2026-01-01T00:00:00Z')",
                )
                .bind(id)
                .bind(state)
                .execute(&pool)
                .await
            }
        };

        insert_conversation("v-1", "awaiting_contact_confirmation")
            .await
            .expect("first active conversation");
        insert_conversation("v-2", "awaiting_outcome")
            .await
            .expect_err("second active conversation must violate uniqueness");
        insert_conversation("v-3", "completed")
            .await
            .expect("completed conversations are exempt");
    }
}
