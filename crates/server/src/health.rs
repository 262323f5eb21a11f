//! Readiness endpoint.
//!
//! `/health` reports whether the tracking database answers a domain query and
//! whether the follow-up scheduler is still ticking. A scheduler that has
//! silently stopped means no retries and no persistence reminders go out, so
//! it degrades readiness just like a dead database.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use leadline_agent::FollowupScheduler;
use leadline_db::DbPool;

/// A stalled scheduler is tolerated for this many tick intervals before the
/// endpoint degrades.
const STALE_TICK_MULTIPLIER: u64 = 3;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    scheduler: Arc<FollowupScheduler>,
    tick_interval_secs: u64,
}

impl HealthState {
    pub fn new(
        db_pool: DbPool,
        scheduler: Arc<FollowupScheduler>,
        tick_interval_secs: u64,
    ) -> Self {
        Self { db_pool, scheduler, tick_interval_secs }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: HealthCheck,
    pub scheduler: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let now = Utc::now();
    let database = database_check(&state.db_pool).await;
    let scheduler =
        scheduler_check(state.scheduler.last_tick_at().await, state.tick_interval_secs, now);
    let ready = database.status == "ready" && scheduler.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        database,
        scheduler,
        checked_at: now.to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

/// Counts open conversations instead of probing with a constant, so the check
/// also proves the tracking schema is in place.
async fn database_check(pool: &DbPool) -> HealthCheck {
    let open: Result<i64, sqlx::Error> =
        sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE state != 'completed'")
            .fetch_one(pool)
            .await;

    match open {
        Ok(open) => HealthCheck {
            status: "ready",
            detail: format!("database reachable, {open} open conversation(s)"),
        },
        Err(error) => {
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}

fn scheduler_check(
    last_tick: Option<DateTime<Utc>>,
    tick_interval_secs: u64,
    now: DateTime<Utc>,
) -> HealthCheck {
    let Some(last) = last_tick else {
        return HealthCheck { status: "ready", detail: "first scheduler tick pending".to_string() };
    };

    let elapsed_secs = (now - last).num_seconds().max(0) as u64;
    let allowed_secs = tick_interval_secs.max(1).saturating_mul(STALE_TICK_MULTIPLIER);
    if elapsed_secs <= allowed_secs {
        HealthCheck { status: "ready", detail: format!("last tick at {}", last.to_rfc3339()) }
    } else {
        HealthCheck {
            status: "degraded",
            detail: format!(
                "scheduler stalled, last tick at {} ({elapsed_secs}s ago)",
                last.to_rfc3339()
            ),
        }
    }
}
