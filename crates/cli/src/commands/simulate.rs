use std::sync::Arc;

use chrono::{Duration, Utc};

use leadline_agent::{ConversationService, InboundDisposition, ServiceSettings};
use leadline_core::config::{AppConfig, LoadOptions};
use leadline_core::domain::contact::{Contact, ContactStatus};
use leadline_core::followup::FollowupPolicy;
use leadline_db::repositories::{
    ContactRepository, ConversationRepository, InMemoryStore, MessageRepository,
};
use leadline_sms::RecordingGateway;

use crate::commands::CommandResult;

const SIMULATED_PHONE: &str = "+15550001111";

/// Runs the dialogue against an in-memory store and a recording gateway, so
/// operators can preview message copy and state transitions without touching
/// the database or the provider.
pub fn run(replies: &[String]) -> CommandResult {
    let technician_name = AppConfig::load(LoadOptions::default())
        .map(|config| config.followup.technician_name)
        .unwrap_or_else(|_| "Rudy".to_string());

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "simulate",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(simulate(&technician_name, replies)) {
        Ok(transcript) => CommandResult::success("simulate", transcript),
        Err(error) => CommandResult::failure("simulate", "simulation", error, 4),
    }
}

async fn simulate(technician_name: &str, replies: &[String]) -> Result<String, String> {
    let store = Arc::new(InMemoryStore::new());
    let gateway = Arc::new(RecordingGateway::new());
    let service = ConversationService::new(
        Arc::clone(&store) as Arc<dyn ContactRepository>,
        Arc::clone(&store) as Arc<dyn ConversationRepository>,
        Arc::clone(&store) as Arc<dyn MessageRepository>,
        Arc::clone(&gateway) as Arc<_>,
        ServiceSettings {
            technician_name: technician_name.to_string(),
            technician_phone: SIMULATED_PHONE.to_string(),
            from_number: "+15550002222".to_string(),
        },
        FollowupPolicy::default(),
    );

    let mut now = Utc::now();
    let mut contact = Contact::new(1001, "Dana Whitfield", now);
    contact.status = ContactStatus::FollowUpScheduled;
    contact.address = Some("12 Oak Ln, Springfield, IL".to_string());
    ContactRepository::save(store.as_ref(), &contact).await.map_err(|error| error.to_string())?;

    let mut lines = vec![format!("simulated follow-up for {}", contact.full_name)];

    service.start_followup(&mut contact, now).await.map_err(|error| error.to_string())?;
    if let Some(body) = gateway.last_body().await {
        push_outbound(&mut lines, &body);
    }

    for (index, reply) in replies.iter().enumerate() {
        now += Duration::seconds(30);
        lines.push(format!("tech> {reply}"));
        let disposition = service
            .handle_inbound_sms(SIMULATED_PHONE, reply, &format!("SIM{index:04}"), now)
            .await
            .map_err(|error| error.to_string())?;
        if let Some(body) = gateway.last_body().await {
            push_outbound(&mut lines, &body);
        }
        if let InboundDisposition::Replied { state } = disposition {
            lines.push(format!("  (state: {})", state.as_str()));
        }
    }

    let contact = store
        .find_by_external_id(1001)
        .await
        .map_err(|error| error.to_string())?
        .ok_or_else(|| "simulated contact disappeared from the store".to_string())?;

    lines.push(String::new());
    lines.push(format!("final status: {}", contact.status.as_str()));
    lines.push(format!("outcome: {}", contact.outcome.as_str()));
    if let Some(project_type) = contact.project_type {
        lines.push(format!("project type: {project_type:?}"));
    }
    if contact.project_creation_needed {
        lines.push("project creation: pending".to_string());
    }

    Ok(lines.join("\n"))
}

fn push_outbound(lines: &mut Vec<String>, body: &str) {
    for (index, line) in body.lines().enumerate() {
        if index == 0 {
            lines.push(format!("sms> {line}"));
        } else {
            lines.push(format!("     {line}"));
        }
    }
}
