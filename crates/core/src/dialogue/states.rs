use serde::{Deserialize, Serialize};

use crate::domain::contact::Outcome;
use crate::domain::intake::{ProjectType, PropertyType, ReferralSource, ResidentialSubtype};
use crate::errors::DomainError;

/// Position in the qualification dialogue. `Completed` is the only terminal
/// state. `Initial` is never written by this code but may exist in stored
/// rows; it takes the same replies as `AwaitingContactConfirmation`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    Initial,
    AwaitingContactConfirmation,
    AwaitingOutcome,
    AwaitingProjectType,
    AwaitingPropertyType,
    AwaitingResidentialSubtype,
    AwaitingInsurance,
    AwaitingInsuranceCompany,
    AwaitingReferralSource,
    Completed,
}

impl DialogueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::AwaitingContactConfirmation => "awaiting_contact_confirmation",
            Self::AwaitingOutcome => "awaiting_outcome",
            Self::AwaitingProjectType => "awaiting_project_type",
            Self::AwaitingPropertyType => "awaiting_property_type",
            Self::AwaitingResidentialSubtype => "awaiting_residential_subtype",
            Self::AwaitingInsurance => "awaiting_insurance",
            Self::AwaitingInsuranceCompany => "awaiting_insurance_company",
            Self::AwaitingReferralSource => "awaiting_referral_source",
            Self::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::str::FromStr for DialogueState {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "initial" => Ok(Self::Initial),
            "awaiting_contact_confirmation" => Ok(Self::AwaitingContactConfirmation),
            "awaiting_outcome" => Ok(Self::AwaitingOutcome),
            "awaiting_project_type" => Ok(Self::AwaitingProjectType),
            "awaiting_property_type" => Ok(Self::AwaitingPropertyType),
            "awaiting_residential_subtype" => Ok(Self::AwaitingResidentialSubtype),
            "awaiting_insurance" => Ok(Self::AwaitingInsurance),
            "awaiting_insurance_company" => Ok(Self::AwaitingInsuranceCompany),
            "awaiting_referral_source" => Ok(Self::AwaitingReferralSource),
            "completed" => Ok(Self::Completed),
            other => Err(DomainError::unknown("dialogue state", other)),
        }
    }
}

/// Result of classifying one inbound reply against the current state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialogueEvent {
    Yes,
    No,
    Outcome(Outcome),
    Project(ProjectType),
    Property(PropertyType),
    Subtype(ResidentialSubtype),
    Referral(ReferralSource),
    /// Any non-empty text, for states that accept free text verbatim.
    FreeText(String),
    Unrecognized,
}

impl DialogueEvent {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized)
    }
}

/// Business field updates a transition demands. Applied by the caller to the
/// contact and conversation before the turn is committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    ConfirmContact,
    RecordNoContact,
    ClearPersistence,
    SetOutcome(Outcome),
    RequireProjectCreation,
    SetProjectType(ProjectType),
    SetPropertyType(PropertyType),
    SetResidentialSubtype(ResidentialSubtype),
    SetInsurance(bool),
    SetInsuranceCompany(String),
    SetReferralSource(ReferralSource),
    CompleteContact,
}

/// The next outbound message a transition calls for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Prompt {
    OutcomeMenu,
    ProjectTypeMenu,
    PropertyTypeMenu,
    ResidentialSubtypeMenu,
    InsuranceQuestion,
    InsuranceCompanyQuestion,
    ReferralMenu,
    /// Recap of all collected fields, sent on completion.
    CompletionSummary,
    /// Ack for a non-appointment outcome that closes the dialogue.
    OutcomeAcknowledgement,
    /// Ack for an explicit NO; the 2-hour retry takes over from here.
    RetryAcknowledgement,
    ConfirmationReprompt,
    OutcomeReprompt,
    ProjectTypeReprompt,
    PropertyTypeReprompt,
    ResidentialSubtypeReprompt,
    InsuranceReprompt,
    InsuranceCompanyReprompt,
    ReferralReprompt,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: DialogueState,
    pub to: DialogueState,
    pub effects: Vec<Effect>,
    pub reply: Prompt,
}

impl TransitionOutcome {
    pub fn advanced(&self) -> bool {
        self.from != self.to
    }
}
