use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{info, warn};

use leadline_core::followup::FollowupPolicy;
use leadline_db::repositories::ContactRepository;

use crate::errors::AgentError;
use crate::service::{ConversationService, FollowupDisposition};

/// What one scheduler tick actually sent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub followups_sent: usize,
    pub retries_sent: usize,
    pub persistence_sent: usize,
}

impl TickReport {
    pub fn total(&self) -> usize {
        self.followups_sent + self.retries_sent + self.persistence_sent
    }
}

/// Periodic driver for everything time-based: initial follow-ups, 2-hour
/// retries, and 10-minute persistence reminders. Queries pre-filter, the
/// service re-checks each candidate under its lock, so a tick racing a
/// webhook is harmless.
pub struct FollowupScheduler {
    contacts: Arc<dyn ContactRepository>,
    service: Arc<ConversationService>,
    policy: FollowupPolicy,
    last_tick: RwLock<Option<DateTime<Utc>>>,
}

impl FollowupScheduler {
    pub fn new(
        contacts: Arc<dyn ContactRepository>,
        service: Arc<ConversationService>,
        policy: FollowupPolicy,
    ) -> Self {
        Self { contacts, service, policy, last_tick: RwLock::new(None) }
    }

    /// When the last tick started, for readiness reporting.
    pub async fn last_tick_at(&self) -> Option<DateTime<Utc>> {
        *self.last_tick.read().await
    }

    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickReport, AgentError> {
        *self.last_tick.write().await = Some(now);
        let mut report = TickReport::default();

        for mut contact in self.contacts.due_for_followup(now).await? {
            match self.service.start_followup(&mut contact, now).await? {
                FollowupDisposition::Started => report.followups_sent += 1,
                FollowupDisposition::AlreadyActive => {
                    warn!(contact_id = %contact.id.0, "due contact already has an open conversation");
                }
                FollowupDisposition::SendFailed => {}
            }
        }

        let retry_cutoff = now - self.policy.retry_after;
        for contact in self.contacts.due_for_retry(retry_cutoff).await? {
            if self.service.send_retry_checkin(contact, now).await? {
                report.retries_sent += 1;
            }
        }

        let persistence_cutoff = now - self.policy.persistence_after;
        for contact in self.contacts.due_for_persistence(persistence_cutoff).await? {
            if self.service.send_persistence_reminder(contact, now).await? {
                report.persistence_sent += 1;
            }
        }

        if report.total() > 0 {
            info!(
                followups = report.followups_sent,
                retries = report.retries_sent,
                persistence = report.persistence_sent,
                "scheduler tick sent messages"
            );
        }
        Ok(report)
    }
}
