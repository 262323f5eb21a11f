use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use leadline_agent::{
    ContactIntake, ConversationService, FollowupScheduler, IntakeError, LoggingProjectCreator,
    ProjectPass, ServiceSettings,
};
use leadline_core::config::{AppConfig, ConfigError, LoadOptions};
use leadline_core::followup::FollowupPolicy;
use leadline_db::repositories::{
    ContactRepository, SqlContactRepository, SqlConversationRepository, SqlMessageRepository,
};
use leadline_db::{connect_with_settings, migrations, DbPool, PoolSettings};
use leadline_sms::{GatewayError, TwilioGateway};

use crate::crm::HttpCrmClient;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub contacts: Arc<dyn ContactRepository>,
    pub messages: Arc<SqlMessageRepository>,
    pub service: Arc<ConversationService>,
    pub scheduler: Arc<FollowupScheduler>,
    /// Present only when CRM polling is enabled in config.
    pub intake: Option<Arc<ContactIntake>>,
    pub projects: Arc<ProjectPass>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("sms gateway setup failed: {0}")]
    Gateway(#[from] GatewayError),
    #[error("crm client setup failed: {0}")]
    Crm(#[from] IntakeError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool =
        connect_with_settings(&config.database.url, PoolSettings::from(&config.database))
            .await
            .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    let applied = migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        applied,
        "database migrations applied"
    );

    let contacts: Arc<dyn ContactRepository> =
        Arc::new(SqlContactRepository::new(db_pool.clone()));
    let conversations = Arc::new(SqlConversationRepository::new(db_pool.clone()));
    let messages = Arc::new(SqlMessageRepository::new(db_pool.clone()));
    let gateway = Arc::new(TwilioGateway::from_config(&config.twilio)?);

    let policy = FollowupPolicy::from_minutes(
        config.followup.retry_after_minutes,
        config.followup.persistence_after_minutes,
    );
    let service = Arc::new(ConversationService::new(
        Arc::clone(&contacts),
        conversations,
        Arc::clone(&messages) as Arc<_>,
        gateway,
        ServiceSettings {
            technician_name: config.followup.technician_name.clone(),
            technician_phone: config.followup.technician_phone.clone(),
            from_number: config.twilio.from_number.clone(),
        },
        policy,
    ));
    let scheduler =
        Arc::new(FollowupScheduler::new(Arc::clone(&contacts), Arc::clone(&service), policy));

    let intake = if config.crm.enabled {
        let crm = Arc::new(HttpCrmClient::from_config(&config.crm)?);
        Some(Arc::new(ContactIntake::with_delay(
            crm,
            Arc::clone(&contacts),
            chrono::Duration::hours(config.followup.initial_delay_hours),
        )))
    } else {
        info!(event_name = "system.bootstrap.crm_disabled", "crm polling disabled by config");
        None
    };

    let projects =
        Arc::new(ProjectPass::new(Arc::clone(&contacts), Arc::new(LoggingProjectCreator)));

    Ok(Application {
        config,
        db_pool,
        contacts,
        messages,
        service,
        scheduler,
        intake,
        projects,
    })
}
