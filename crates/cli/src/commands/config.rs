use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use leadline_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    let mut push = |key: &str, value: &str, env_key: Option<&str>| {
        lines.push(render_line(
            key,
            value,
            field_source(key, env_key, config_file_doc.as_ref(), config_file_path.as_deref()),
        ));
    };

    push("database.url", &config.database.url, Some("LEADLINE_DATABASE_URL"));
    push(
        "database.max_connections",
        &config.database.max_connections.to_string(),
        Some("LEADLINE_DATABASE_MAX_CONNECTIONS"),
    );
    push("database.timeout_secs", &config.database.timeout_secs.to_string(), None);
    push(
        "database.busy_timeout_ms",
        &config.database.busy_timeout_ms.to_string(),
        Some("LEADLINE_DATABASE_BUSY_TIMEOUT_MS"),
    );

    push(
        "twilio.account_sid",
        &redact_identifier(&config.twilio.account_sid),
        Some("LEADLINE_TWILIO_ACCOUNT_SID"),
    );
    let auth_token = if secrecy::ExposeSecret::expose_secret(&config.twilio.auth_token).is_empty()
    {
        "<unset>"
    } else {
        "<redacted>"
    };
    push("twilio.auth_token", auth_token, Some("LEADLINE_TWILIO_AUTH_TOKEN"));
    push("twilio.from_number", &config.twilio.from_number, Some("LEADLINE_TWILIO_FROM_NUMBER"));

    push("crm.enabled", &config.crm.enabled.to_string(), Some("LEADLINE_CRM_ENABLED"));
    push("crm.base_url", &config.crm.base_url, Some("LEADLINE_CRM_BASE_URL"));
    let api_key = if config.crm.api_key.is_some() { "<redacted>" } else { "<unset>" };
    push("crm.api_key", api_key, Some("LEADLINE_CRM_API_KEY"));
    push("crm.polling_interval_minutes", &config.crm.polling_interval_minutes.to_string(), None);

    push(
        "followup.technician_name",
        &config.followup.technician_name,
        Some("LEADLINE_TECHNICIAN_NAME"),
    );
    push(
        "followup.technician_phone",
        &config.followup.technician_phone,
        Some("LEADLINE_TECHNICIAN_PHONE"),
    );
    push("followup.initial_delay_hours", &config.followup.initial_delay_hours.to_string(), None);
    push("followup.retry_after_minutes", &config.followup.retry_after_minutes.to_string(), None);
    push(
        "followup.persistence_after_minutes",
        &config.followup.persistence_after_minutes.to_string(),
        None,
    );
    push("followup.tick_interval_secs", &config.followup.tick_interval_secs.to_string(), None);

    push("server.bind_address", &config.server.bind_address, None);
    push("server.port", &config.server.port.to_string(), None);
    push("server.health_check_port", &config.server.health_check_port.to_string(), None);

    push("logging.level", &config.logging.level, Some("LEADLINE_LOG_LEVEL"));
    push("logging.format", &format!("{:?}", config.logging.format), Some("LEADLINE_LOG_FORMAT"));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("leadline.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/leadline.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Shows the prefix of an account identifier and hides the rest.
fn redact_identifier(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    if trimmed.len() <= 4 {
        return "***".to_string();
    }
    format!("{}***", &trimmed[..4])
}
