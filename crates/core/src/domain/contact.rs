use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::intake::{ProjectType, PropertyType, ReferralSource, ResidentialSubtype};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub Uuid);

impl ContactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContactId {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle tag for a lead as it moves through follow-up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    New,
    FollowUpScheduled,
    FollowUpSent,
    AwaitingResponse,
    ContactMade,
    NoContact,
    Completed,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::FollowUpScheduled => "follow_up_scheduled",
            Self::FollowUpSent => "follow_up_sent",
            Self::AwaitingResponse => "awaiting_response",
            Self::ContactMade => "contact_made",
            Self::NoContact => "no_contact",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for ContactStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "new" => Ok(Self::New),
            "follow_up_scheduled" => Ok(Self::FollowUpScheduled),
            "follow_up_sent" => Ok(Self::FollowUpSent),
            "awaiting_response" => Ok(Self::AwaitingResponse),
            "contact_made" => Ok(Self::ContactMade),
            "no_contact" => Ok(Self::NoContact),
            "completed" => Ok(Self::Completed),
            other => Err(DomainError::unknown("contact status", other)),
        }
    }
}

/// Qualification result reported by the technician.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    AppointmentSet,
    LookingForQuotes,
    WasteOfTime,
    SomethingElse,
    Pending,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppointmentSet => "appointment_set",
            Self::LookingForQuotes => "looking_for_quotes",
            Self::WasteOfTime => "waste_of_time",
            Self::SomethingElse => "something_else",
            Self::Pending => "pending",
        }
    }

    /// Only an appointment keeps the dialogue going to collect project details.
    pub fn requires_project(&self) -> bool {
        matches!(self, Self::AppointmentSet)
    }
}

impl std::str::FromStr for Outcome {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "appointment_set" => Ok(Self::AppointmentSet),
            "looking_for_quotes" => Ok(Self::LookingForQuotes),
            "waste_of_time" => Ok(Self::WasteOfTime),
            "something_else" => Ok(Self::SomethingElse),
            "pending" => Ok(Self::Pending),
            other => Err(DomainError::unknown("outcome", other)),
        }
    }
}

/// A lead tracked for follow-up.
///
/// Mutated only by the conversation state machine and the retry/persistence
/// scheduler; never deleted outside an administrative purge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    /// Identifier in the external field-service system.
    pub external_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,

    pub status: ContactStatus,
    pub outcome: Outcome,

    // Intake fields collected over SMS.
    pub project_type: Option<ProjectType>,
    pub property_type: Option<PropertyType>,
    pub residential_subtype: Option<ResidentialSubtype>,
    pub has_insurance: Option<bool>,
    pub insurance_company: Option<String>,
    pub referral_source: Option<ReferralSource>,

    // Project creation hand-off flags.
    pub project_creation_needed: bool,
    pub project_created: bool,
    pub external_project_id: Option<i64>,

    // Retry / persistence counters. `persistence_mode` and a pending 2-hour
    // retry are mutually exclusive: persistence only starts while
    // `last_retry_at` is unset.
    pub retry_count: u32,
    pub last_retry_at: Option<DateTime<Utc>>,
    pub persistence_mode: bool,
    pub persistence_count: u32,
    pub last_persistence_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub external_created_at: Option<DateTime<Utc>>,
    pub follow_up_scheduled_at: Option<DateTime<Utc>>,
    pub follow_up_sent_at: Option<DateTime<Utc>>,
    pub contact_made_at: Option<DateTime<Utc>>,
    pub outcome_received_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Contact {
    pub fn new(external_id: i64, full_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: ContactId::new(),
            external_id,
            first_name: None,
            last_name: None,
            full_name: full_name.into(),
            email: None,
            phone: None,
            address: None,
            status: ContactStatus::New,
            outcome: Outcome::Pending,
            project_type: None,
            property_type: None,
            residential_subtype: None,
            has_insurance: None,
            insurance_company: None,
            referral_source: None,
            project_creation_needed: false,
            project_created: false,
            external_project_id: None,
            retry_count: 0,
            last_retry_at: None,
            persistence_mode: false,
            persistence_count: 0,
            last_persistence_at: None,
            created_at: now,
            external_created_at: None,
            follow_up_scheduled_at: None,
            follow_up_sent_at: None,
            contact_made_at: None,
            outcome_received_at: None,
            completed_at: None,
        }
    }

    /// Name used inside SMS bodies; falls back when the sync had no name.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            "the contact"
        } else {
            &self.full_name
        }
    }

    pub fn record_no_contact(&mut self, now: DateTime<Utc>) {
        self.retry_count += 1;
        self.last_retry_at = Some(now);
    }

    pub fn record_persistence_send(&mut self, now: DateTime<Utc>) {
        self.persistence_mode = true;
        self.persistence_count += 1;
        self.last_persistence_at = Some(now);
    }

    pub fn clear_persistence(&mut self) {
        self.persistence_mode = false;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{Contact, ContactStatus, Outcome};

    #[test]
    fn new_contact_starts_pending_with_zeroed_counters() {
        let contact = Contact::new(42, "Jordan Fields", Utc::now());

        assert_eq!(contact.status, ContactStatus::New);
        assert_eq!(contact.outcome, Outcome::Pending);
        assert_eq!(contact.retry_count, 0);
        assert!(!contact.persistence_mode);
        assert!(contact.last_retry_at.is_none());
    }

    #[test]
    fn display_name_falls_back_when_blank() {
        let contact = Contact::new(7, "  ", Utc::now());
        assert_eq!(contact.display_name(), "the contact");
    }

    #[test]
    fn no_contact_bumps_retry_counters() {
        let now = Utc::now();
        let mut contact = Contact::new(1, "Sam Ortiz", now);

        contact.record_no_contact(now);
        assert_eq!(contact.retry_count, 1);
        assert_eq!(contact.last_retry_at, Some(now));
    }
}
