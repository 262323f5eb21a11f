//! Retry and persistence timing decisions.
//!
//! Two independent timers layer on the dialogue:
//! - the 2-hour retry, armed by an explicit NO (`last_retry_at` set);
//! - the 10-minute persistence loop, armed by total silence.
//!
//! They are mutually exclusive: a contact with a pending retry cycle never
//! receives persistence messages. The repository queries pre-filter
//! candidates; these checks are the authoritative guard re-applied per
//! contact under the per-contact lock.

use chrono::{DateTime, Duration, Utc};

use crate::domain::contact::Contact;
use crate::domain::conversation::Conversation;
use crate::dialogue::DialogueState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FollowupPolicy {
    /// Delay between 2-hour retry check-ins.
    pub retry_after: Duration,
    /// Silence threshold before persistence mode engages, and the cadence of
    /// its reminders.
    pub persistence_after: Duration,
}

impl Default for FollowupPolicy {
    fn default() -> Self {
        Self { retry_after: Duration::hours(2), persistence_after: Duration::minutes(10) }
    }
}

impl FollowupPolicy {
    pub fn from_minutes(retry_minutes: i64, persistence_minutes: i64) -> Self {
        Self {
            retry_after: Duration::minutes(retry_minutes),
            persistence_after: Duration::minutes(persistence_minutes),
        }
    }

    /// A 2-hour retry is due when the technician said NO at least
    /// `retry_after` ago and the confirmation question is still open.
    pub fn retry_due(
        &self,
        contact: &Contact,
        conversation: &Conversation,
        now: DateTime<Utc>,
    ) -> bool {
        if conversation.state != DialogueState::AwaitingContactConfirmation
            || conversation.completed_at.is_some()
        {
            return false;
        }
        match contact.last_retry_at {
            Some(last_retry_at) => now - last_retry_at >= self.retry_after,
            None => false,
        }
    }

    /// Persistence fires only while no NO has ever been recorded: silence
    /// escalates, an explicit answer de-escalates.
    pub fn persistence_due(
        &self,
        contact: &Contact,
        conversation: &Conversation,
        now: DateTime<Utc>,
    ) -> bool {
        if conversation.state != DialogueState::AwaitingContactConfirmation
            || conversation.completed_at.is_some()
        {
            return false;
        }
        if contact.last_retry_at.is_some() {
            return false;
        }
        now - conversation.last_message_at >= self.persistence_after
    }
}
