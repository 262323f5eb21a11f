use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dialogue::DialogueState;
use crate::domain::contact::{ContactId, Outcome};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

/// One qualification dialogue thread between the system and a technician
/// about one contact.
///
/// At most one conversation per contact may be non-terminal at a time;
/// `last_message_at` is monotone and gates the retry and persistence timers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub contact_id: ContactId,
    pub state: DialogueState,
    pub technician_phone: String,
    pub contact_confirmed: bool,
    pub outcome: Option<Outcome>,
    pub outcome_details: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn start(
        contact_id: ContactId,
        technician_phone: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConversationId::new(),
            contact_id,
            state: DialogueState::AwaitingContactConfirmation,
            technician_phone: technician_phone.into(),
            contact_confirmed: false,
            outcome: None,
            outcome_details: None,
            started_at: now,
            last_message_at: now,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state == DialogueState::Completed
    }

    /// Advances `last_message_at` without ever moving it backwards.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_message_at {
            self.last_message_at = now;
        }
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.state = DialogueState::Completed;
        self.completed_at = Some(now);
        self.touch(now);
    }
}
