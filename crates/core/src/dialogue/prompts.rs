//! Outbound message catalog.
//!
//! Every SMS body the system can send is produced here so the dialogue and
//! the schedulers never format text inline. Raw internal errors must never
//! reach these bodies.

use crate::dialogue::states::Prompt;
use crate::domain::contact::Contact;

const OUTCOME_MENU: &str = "Reply with:\n\
     1 - Appointment set\n\
     2 - Looking for quotes\n\
     3 - Waste of time\n\
     4 - Something else";

const PROJECT_TYPE_MENU: &str = "1 - Emergency Mitigation Services\n\
     2 - Mold\n\
     3 - Reconstruction\n\
     4 - Sewage\n\
     5 - Biohazard\n\
     6 - Contents\n\
     7 - Vandalism";

const PROPERTY_TYPE_MENU: &str = "1 - Residential\n2 - Commercial";

const RESIDENTIAL_SUBTYPE_MENU: &str = "1 - Single Family Home\n\
     2 - Multi-Family Home\n\
     3 - Manufactured Home";

const REFERRAL_MENU: &str = "1 - Customer Referral\n\
     2 - Industry Partner\n\
     3 - Insurance Referral\n\
     4 - Lead Gen\n\
     5 - Online Marketing\n\
     6 - Plumber";

impl Prompt {
    /// Renders the prompt body for a contact.
    pub fn render(&self, contact: &Contact) -> String {
        let name = contact.display_name();
        match self {
            Self::OutcomeMenu => {
                format!("Great! What was the outcome with {name}?\n\n{OUTCOME_MENU}")
            }
            Self::ProjectTypeMenu => format!(
                "Great! I need a few details to create the project for {name}.\n\n\
                 What type of project?\n{PROJECT_TYPE_MENU}"
            ),
            Self::PropertyTypeMenu => {
                format!("What type of property?\n{PROPERTY_TYPE_MENU}")
            }
            Self::ResidentialSubtypeMenu => {
                format!("What type of residential property?\n{RESIDENTIAL_SUBTYPE_MENU}")
            }
            Self::InsuranceQuestion => "Do they have insurance? Reply YES or NO".to_string(),
            Self::InsuranceCompanyQuestion => "What insurance company?".to_string(),
            Self::ReferralMenu => format!("How did they hear about us?\n{REFERRAL_MENU}"),
            Self::CompletionSummary => completion_summary(contact),
            Self::OutcomeAcknowledgement => {
                format!("Got it, thanks for the update on {name}!")
            }
            Self::RetryAcknowledgement => {
                format!("Got it. I'll check back with you in 2 hours about {name}.")
            }
            Self::ConfirmationReprompt => {
                format!("Please reply YES or NO. Were you able to make contact with {name}?")
            }
            Self::OutcomeReprompt => format!("Please reply with:\n{OUTCOME_MENU}"),
            Self::ProjectTypeReprompt => format!("Please reply with:\n{PROJECT_TYPE_MENU}"),
            Self::PropertyTypeReprompt => format!("Please reply with:\n{PROPERTY_TYPE_MENU}"),
            Self::ResidentialSubtypeReprompt => {
                format!("Please reply with:\n{RESIDENTIAL_SUBTYPE_MENU}")
            }
            Self::InsuranceReprompt => "Please reply YES or NO. Do they have insurance?".to_string(),
            Self::InsuranceCompanyReprompt => "What insurance company?".to_string(),
            Self::ReferralReprompt => format!("Please reply with:\n{REFERRAL_MENU}"),
        }
    }
}

fn completion_summary(contact: &Contact) -> String {
    let project = contact.project_type.map(|value| value.as_str()).unwrap_or("Unknown");
    let property = contact.property_type.map(|value| value.as_str()).unwrap_or("Unknown");
    let insurance = match (contact.has_insurance, contact.insurance_company.as_deref()) {
        (Some(true), Some(company)) => format!("Yes - {company}"),
        (Some(true), None) => "Yes".to_string(),
        _ => "No".to_string(),
    };
    let source = contact.referral_source.map(|value| value.as_str()).unwrap_or("Unknown");

    format!(
        "Perfect! I have all the details for {name}:\n\
         \u{2022} Project: {project}\n\
         \u{2022} Property: {property}\n\
         \u{2022} Insurance: {insurance}\n\
         \u{2022} Source: {source}\n\n\
         I'll create the project now. You'll get a confirmation once it's done!",
        name = contact.display_name(),
    )
}

/// First message of a follow-up thread.
pub fn initial_confirmation(technician_name: &str, contact: &Contact) -> String {
    format!(
        "Hi {technician_name}, were you able to make contact with {name} yet? Reply YES or NO.",
        name = contact.display_name(),
    )
}

/// 2-hour check-in after an explicit NO.
pub fn retry_checkin(technician_name: &str, contact: &Contact) -> String {
    format!(
        "Hi {technician_name}, checking in again - were you able to make contact with {name}? \
         Reply YES or NO.",
        name = contact.display_name(),
    )
}

/// Persistence-mode message; the banner fires once, reminders carry an
/// incrementing counter. `sends_so_far` is the number already delivered.
pub fn persistence_reminder(technician_name: &str, contact: &Contact, sends_so_far: u32) -> String {
    let name = contact.display_name();
    if sends_so_far == 0 {
        format!(
            "PERSISTENCE MODE ACTIVATED\n\n\
             Hi {technician_name}, I still need to know: were you able to make contact with \
             {name}? Reply YES or NO.\n\n\
             (You'll receive this message every 10 minutes until you respond)"
        )
    } else {
        format!(
            "Reminder #{number}: Were you able to make contact with {name}? Reply YES or NO.",
            number = sends_so_far + 1,
        )
    }
}

/// Notice for an inbound SMS with no open dialogue.
pub fn no_active_conversation() -> String {
    "No active conversation found. Please wait for a follow-up question.".to_string()
}
