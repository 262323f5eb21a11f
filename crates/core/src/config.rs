use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Process configuration, constructed once at startup and passed by
/// reference. Nothing in the core reads ambient global state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub twilio: TwilioConfig,
    pub crm: CrmConfig,
    pub followup: FollowupConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
    /// SQLite busy handler wait; webhook writes contend with scheduler ticks
    /// on the same file.
    pub busy_timeout_ms: u32,
}

#[derive(Clone, Debug)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: SecretString,
    pub from_number: String,
    /// Bound on every gateway send; a hung provider call must not stall a
    /// webhook or a scheduler tick.
    pub send_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct CrmConfig {
    pub enabled: bool,
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub polling_interval_minutes: u64,
}

#[derive(Clone, Debug)]
pub struct FollowupConfig {
    pub technician_name: String,
    pub technician_phone: String,
    /// Delay between contact sync and the first confirmation prompt.
    pub initial_delay_hours: i64,
    pub retry_after_minutes: i64,
    pub persistence_after_minutes: i64,
    pub tick_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

/// Programmatic overrides, applied last. Used by the CLI and by tests.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_from_number: Option<String>,
    pub crm_enabled: Option<bool>,
    pub crm_base_url: Option<String>,
    pub crm_api_key: Option<String>,
    pub technician_phone: Option<String>,
    pub technician_name: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://leadline.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
                busy_timeout_ms: 5_000,
            },
            twilio: TwilioConfig {
                account_sid: String::new(),
                auth_token: String::new().into(),
                from_number: String::new(),
                send_timeout_secs: 15,
            },
            crm: CrmConfig {
                enabled: false,
                base_url: "https://api.example-fsm.com/v5".to_string(),
                api_key: None,
                polling_interval_minutes: 15,
            },
            followup: FollowupConfig {
                technician_name: "Rudy".to_string(),
                technician_phone: String::new(),
                initial_delay_hours: 24,
                retry_after_minutes: 120,
                persistence_after_minutes: 10,
                tick_interval_secs: 60,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                health_check_port: 8080,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("leadline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
            if let Some(busy_timeout_ms) = database.busy_timeout_ms {
                self.database.busy_timeout_ms = busy_timeout_ms;
            }
        }

        if let Some(twilio) = patch.twilio {
            if let Some(account_sid) = twilio.account_sid {
                self.twilio.account_sid = account_sid;
            }
            if let Some(auth_token_value) = twilio.auth_token {
                self.twilio.auth_token = auth_token_value.into();
            }
            if let Some(from_number) = twilio.from_number {
                self.twilio.from_number = from_number;
            }
            if let Some(send_timeout_secs) = twilio.send_timeout_secs {
                self.twilio.send_timeout_secs = send_timeout_secs;
            }
        }

        if let Some(crm) = patch.crm {
            if let Some(enabled) = crm.enabled {
                self.crm.enabled = enabled;
            }
            if let Some(base_url) = crm.base_url {
                self.crm.base_url = base_url;
            }
            if let Some(api_key_value) = crm.api_key {
                self.crm.api_key = Some(api_key_value.into());
            }
            if let Some(polling_interval_minutes) = crm.polling_interval_minutes {
                self.crm.polling_interval_minutes = polling_interval_minutes;
            }
        }

        if let Some(followup) = patch.followup {
            if let Some(technician_name) = followup.technician_name {
                self.followup.technician_name = technician_name;
            }
            if let Some(technician_phone) = followup.technician_phone {
                self.followup.technician_phone = technician_phone;
            }
            if let Some(initial_delay_hours) = followup.initial_delay_hours {
                self.followup.initial_delay_hours = initial_delay_hours;
            }
            if let Some(retry_after_minutes) = followup.retry_after_minutes {
                self.followup.retry_after_minutes = retry_after_minutes;
            }
            if let Some(persistence_after_minutes) = followup.persistence_after_minutes {
                self.followup.persistence_after_minutes = persistence_after_minutes;
            }
            if let Some(tick_interval_secs) = followup.tick_interval_secs {
                self.followup.tick_interval_secs = tick_interval_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("LEADLINE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("LEADLINE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("LEADLINE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("LEADLINE_DATABASE_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms =
                parse_u32("LEADLINE_DATABASE_BUSY_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("LEADLINE_TWILIO_ACCOUNT_SID") {
            self.twilio.account_sid = value;
        }
        if let Some(value) = read_env("LEADLINE_TWILIO_AUTH_TOKEN") {
            self.twilio.auth_token = value.into();
        }
        if let Some(value) = read_env("LEADLINE_TWILIO_FROM_NUMBER") {
            self.twilio.from_number = value;
        }
        if let Some(value) = read_env("LEADLINE_CRM_ENABLED") {
            self.crm.enabled = parse_bool("LEADLINE_CRM_ENABLED", &value)?;
        }
        if let Some(value) = read_env("LEADLINE_CRM_BASE_URL") {
            self.crm.base_url = value;
        }
        if let Some(value) = read_env("LEADLINE_CRM_API_KEY") {
            self.crm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("LEADLINE_TECHNICIAN_PHONE") {
            self.followup.technician_phone = value;
        }
        if let Some(value) = read_env("LEADLINE_TECHNICIAN_NAME") {
            self.followup.technician_name = value;
        }
        if let Some(value) = read_env("LEADLINE_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("LEADLINE_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(account_sid) = overrides.twilio_account_sid {
            self.twilio.account_sid = account_sid;
        }
        if let Some(auth_token_value) = overrides.twilio_auth_token {
            self.twilio.auth_token = auth_token_value.into();
        }
        if let Some(from_number) = overrides.twilio_from_number {
            self.twilio.from_number = from_number;
        }
        if let Some(enabled) = overrides.crm_enabled {
            self.crm.enabled = enabled;
        }
        if let Some(base_url) = overrides.crm_base_url {
            self.crm.base_url = base_url;
        }
        if let Some(api_key_value) = overrides.crm_api_key {
            self.crm.api_key = Some(api_key_value.into());
        }
        if let Some(technician_phone) = overrides.technician_phone {
            self.followup.technician_phone = technician_phone;
        }
        if let Some(technician_name) = overrides.technician_name {
            self.followup.technician_name = technician_name;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database.url must not be empty".to_string()));
        }
        if !self.twilio.from_number.is_empty() && !self.twilio.from_number.starts_with('+') {
            return Err(ConfigError::Validation(format!(
                "twilio.from_number `{}` must be E.164 (leading `+`)",
                self.twilio.from_number
            )));
        }
        if !self.followup.technician_phone.is_empty()
            && !self.followup.technician_phone.starts_with('+')
        {
            return Err(ConfigError::Validation(format!(
                "followup.technician_phone `{}` must be E.164 (leading `+`)",
                self.followup.technician_phone
            )));
        }
        if self.followup.retry_after_minutes <= 0 || self.followup.persistence_after_minutes <= 0 {
            return Err(ConfigError::Validation(
                "followup retry/persistence windows must be positive".to_string(),
            ));
        }
        if self.crm.enabled {
            if self.crm.base_url.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "crm.base_url is required when crm.enabled".to_string(),
                ));
            }
            if self.crm.api_key.is_none() {
                return Err(ConfigError::Validation(
                    "crm.api_key is required when crm.enabled".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    twilio: Option<TwilioPatch>,
    crm: Option<CrmPatch>,
    followup: Option<FollowupPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
    busy_timeout_ms: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct TwilioPatch {
    account_sid: Option<String>,
    auth_token: Option<String>,
    from_number: Option<String>,
    send_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CrmPatch {
    enabled: Option<bool>,
    base_url: Option<String>,
    api_key: Option<String>,
    polling_interval_minutes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FollowupPatch {
    technician_name: Option<String>,
    technician_phone: Option<String>,
    initial_delay_hours: Option<i64>,
    retry_after_minutes: Option<i64>,
    persistence_after_minutes: Option<i64>,
    tick_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    let default = PathBuf::from("leadline.toml");
    default.exists().then_some(default)
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;
    toml::from_str(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
