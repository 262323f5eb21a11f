use std::env;
use std::sync::{Mutex, OnceLock};

use leadline_cli::commands::{migrate, simulate};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("LEADLINE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("sqlite::memory:"), "message names the migrated database");
    });
}

#[test]
fn migrate_returns_config_failure_with_invalid_phone() {
    with_env(&[("LEADLINE_TECHNICIAN_PHONE", "5550001111")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn simulate_walks_the_full_appointment_path() {
    with_env(&[], || {
        let replies: Vec<String> =
            ["YES", "1", "2", "1", "1", "no", "6"].into_iter().map(String::from).collect();
        let result = simulate::run(&replies);
        assert_eq!(result.exit_code, 0, "expected successful simulation");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "simulate");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("(state: awaiting_outcome)"));
        assert!(message.contains("final status: completed"));
        assert!(message.contains("outcome: appointment_set"));
        assert!(message.contains("project creation: pending"));
    });
}

#[test]
fn simulate_is_deterministic_for_the_same_replies() {
    with_env(&[], || {
        let replies: Vec<String> = ["YES", "2"].into_iter().map(String::from).collect();
        let first = parse_payload(&simulate::run(&replies).output);
        let second = parse_payload(&simulate::run(&replies).output);
        assert_eq!(first["message"], second["message"]);
    });
}

#[test]
fn simulate_handles_an_unanswered_followup() {
    with_env(&[], || {
        let result = simulate::run(&[]);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("sms> Hi"));
        assert!(message.contains("final status: follow_up_sent"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "LEADLINE_DATABASE_URL",
        "LEADLINE_DATABASE_MAX_CONNECTIONS",
        "LEADLINE_DATABASE_BUSY_TIMEOUT_MS",
        "LEADLINE_TWILIO_ACCOUNT_SID",
        "LEADLINE_TWILIO_AUTH_TOKEN",
        "LEADLINE_TWILIO_FROM_NUMBER",
        "LEADLINE_CRM_ENABLED",
        "LEADLINE_CRM_BASE_URL",
        "LEADLINE_CRM_API_KEY",
        "LEADLINE_TECHNICIAN_PHONE",
        "LEADLINE_TECHNICIAN_NAME",
        "LEADLINE_LOG_LEVEL",
        "LEADLINE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
