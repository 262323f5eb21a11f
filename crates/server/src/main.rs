mod bootstrap;
mod crm;
mod health;
mod webhooks;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tracing::{error, info};

use leadline_core::config::{AppConfig, LoadOptions};

use crate::webhooks::WebhookState;

fn init_logging(config: &AppConfig) {
    use leadline_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        health::HealthState::new(
            app.db_pool.clone(),
            Arc::clone(&app.scheduler),
            app.config.followup.tick_interval_secs,
        ),
    )
    .await?;

    spawn_scheduler_loop(&app);
    spawn_crm_loop(&app);

    let router = webhooks::router(WebhookState {
        service: Arc::clone(&app.service),
        messages: Arc::clone(&app.messages) as Arc<_>,
    });
    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.server.started",
        bind_address = %address,
        crm_polling = app.intake.is_some(),
        "leadline-server started"
    );

    axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).await?;

    info!(event_name = "system.server.stopping", "leadline-server stopping");
    Ok(())
}

/// Drives follow-ups, retries, persistence reminders, and the project
/// creation sweep on one interval.
fn spawn_scheduler_loop(app: &bootstrap::Application) {
    let scheduler = Arc::clone(&app.scheduler);
    let projects = Arc::clone(&app.projects);
    let tick_interval = Duration::from_secs(app.config.followup.tick_interval_secs.max(1));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            match scheduler.run_tick(Utc::now()).await {
                Ok(report) if report.total() > 0 => {
                    info!(
                        event_name = "scheduler.tick",
                        followups = report.followups_sent,
                        retries = report.retries_sent,
                        persistence = report.persistence_sent,
                        "scheduler tick completed"
                    );
                }
                Ok(_) => {}
                Err(error) => {
                    error!(event_name = "scheduler.tick_failed", error = %error, "scheduler tick failed");
                }
            }
            if let Err(error) = projects.run(Utc::now()).await {
                error!(event_name = "scheduler.projects_failed", error = %error, "project pass failed");
            }
        }
    });
}

fn spawn_crm_loop(app: &bootstrap::Application) {
    let Some(intake) = app.intake.as_ref().map(Arc::clone) else {
        return;
    };
    let poll_interval =
        Duration::from_secs(app.config.crm.polling_interval_minutes.max(1) * 60);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            // Fires immediately on startup, then on the polling interval.
            interval.tick().await;
            match intake.sync(Utc::now()).await {
                Ok(report) => {
                    info!(
                        event_name = "crm.sync",
                        seen = report.seen,
                        scheduled = report.scheduled,
                        "crm contact sync completed"
                    );
                }
                Err(error) => {
                    error!(event_name = "crm.sync_failed", error = %error, "crm contact sync failed");
                }
            }
        }
    });
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(event_name = "system.server.signal_error", error = %error, "shutdown signal wait failed");
    }
}
