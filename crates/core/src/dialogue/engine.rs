use thiserror::Error;

use crate::dialogue::states::{DialogueEvent, DialogueState, Effect, Prompt, TransitionOutcome};
use crate::domain::intake::PropertyType;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DialogueTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: DialogueState, event: DialogueEvent },
    #[error("conversation is terminal in state {state:?}")]
    Terminal { state: DialogueState },
}

/// Applies the per-state transition table.
///
/// Unrecognized input is not an error: it yields an outcome whose `to` equals
/// `from`, with no effects and the same question re-asked. Events that the
/// classifier cannot produce for the given state are rejected.
pub fn transition(
    current: &DialogueState,
    event: &DialogueEvent,
) -> Result<TransitionOutcome, DialogueTransitionError> {
    use DialogueState::{
        AwaitingContactConfirmation, AwaitingInsurance, AwaitingInsuranceCompany, AwaitingOutcome,
        AwaitingProjectType, AwaitingPropertyType, AwaitingReferralSource,
        AwaitingResidentialSubtype, Completed, Initial,
    };

    if matches!(current, Completed) {
        return Err(DialogueTransitionError::Terminal { state: *current });
    }

    if let DialogueEvent::Unrecognized = event {
        return Ok(TransitionOutcome {
            from: *current,
            to: *current,
            effects: Vec::new(),
            reply: reprompt_for(current),
        });
    }

    // Stored `initial` rows predate the first prompt; the pending question
    // is still the confirmation one.
    let (to, effects, reply) = match (current, event) {
        (Initial | AwaitingContactConfirmation, DialogueEvent::Yes) => (
            AwaitingOutcome,
            vec![Effect::ConfirmContact, Effect::ClearPersistence],
            Prompt::OutcomeMenu,
        ),
        // An explicit NO keeps the state: the 2-hour retry cycle owns the
        // next touch, and persistence must stand down.
        (Initial | AwaitingContactConfirmation, DialogueEvent::No) => (
            AwaitingContactConfirmation,
            vec![Effect::RecordNoContact, Effect::ClearPersistence],
            Prompt::RetryAcknowledgement,
        ),
        (AwaitingOutcome, DialogueEvent::Outcome(outcome)) => {
            if outcome.requires_project() {
                (
                    AwaitingProjectType,
                    vec![Effect::SetOutcome(*outcome), Effect::RequireProjectCreation],
                    Prompt::ProjectTypeMenu,
                )
            } else {
                (
                    Completed,
                    vec![Effect::SetOutcome(*outcome), Effect::CompleteContact],
                    Prompt::OutcomeAcknowledgement,
                )
            }
        }
        (AwaitingProjectType, DialogueEvent::Project(project)) => (
            AwaitingPropertyType,
            vec![Effect::SetProjectType(*project)],
            Prompt::PropertyTypeMenu,
        ),
        (AwaitingPropertyType, DialogueEvent::Property(property)) => match property {
            PropertyType::Residential => (
                AwaitingResidentialSubtype,
                vec![Effect::SetPropertyType(*property)],
                Prompt::ResidentialSubtypeMenu,
            ),
            PropertyType::Commercial => (
                AwaitingInsurance,
                vec![Effect::SetPropertyType(*property)],
                Prompt::InsuranceQuestion,
            ),
        },
        (AwaitingResidentialSubtype, DialogueEvent::Subtype(subtype)) => (
            AwaitingInsurance,
            vec![Effect::SetResidentialSubtype(*subtype)],
            Prompt::InsuranceQuestion,
        ),
        (AwaitingInsurance, DialogueEvent::Yes) => (
            AwaitingInsuranceCompany,
            vec![Effect::SetInsurance(true)],
            Prompt::InsuranceCompanyQuestion,
        ),
        (AwaitingInsurance, DialogueEvent::No) => {
            (AwaitingReferralSource, vec![Effect::SetInsurance(false)], Prompt::ReferralMenu)
        }
        (AwaitingInsuranceCompany, DialogueEvent::FreeText(company)) => (
            AwaitingReferralSource,
            vec![Effect::SetInsuranceCompany(company.clone())],
            Prompt::ReferralMenu,
        ),
        (AwaitingReferralSource, DialogueEvent::Referral(source)) => (
            Completed,
            vec![Effect::SetReferralSource(*source), Effect::CompleteContact],
            Prompt::CompletionSummary,
        ),
        _ => {
            return Err(DialogueTransitionError::InvalidTransition {
                state: *current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, effects, reply })
}

fn reprompt_for(state: &DialogueState) -> Prompt {
    match state {
        DialogueState::Initial | DialogueState::AwaitingContactConfirmation => {
            Prompt::ConfirmationReprompt
        }
        DialogueState::AwaitingOutcome => Prompt::OutcomeReprompt,
        DialogueState::AwaitingProjectType => Prompt::ProjectTypeReprompt,
        DialogueState::AwaitingPropertyType => Prompt::PropertyTypeReprompt,
        DialogueState::AwaitingResidentialSubtype => Prompt::ResidentialSubtypeReprompt,
        DialogueState::AwaitingInsurance => Prompt::InsuranceReprompt,
        DialogueState::AwaitingInsuranceCompany => Prompt::InsuranceCompanyReprompt,
        DialogueState::AwaitingReferralSource => Prompt::ReferralReprompt,
        // Unreachable through `transition`; kept total for callers.
        DialogueState::Completed => Prompt::ConfirmationReprompt,
    }
}
