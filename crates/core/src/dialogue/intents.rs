//! Reply classification.
//!
//! Matching policy, in priority order:
//! 1. a reply that is exactly a menu digit picks that menu entry;
//! 2. otherwise ordered keyword rules are scanned and the first match wins,
//!    with no scoring;
//! 3. multi-character patterns match as case-insensitive substrings,
//!    single-character patterns (`y`, `n`, bare digits) must match the whole
//!    trimmed reply so they cannot fire inside unrelated words.
//!
//! Anything that falls through maps to [`DialogueEvent::Unrecognized`], which
//! the engine answers with a re-prompt and no transition.

use crate::dialogue::states::{DialogueEvent, DialogueState};
use crate::domain::contact::Outcome;
use crate::domain::intake::{ProjectType, PropertyType, ReferralSource, ResidentialSubtype};

const YES_PATTERNS: &[&str] = &["yes", "y", "yeah", "yep", "yup", "sure", "correct", "affirmative"];
const NO_PATTERNS: &[&str] = &["no", "n", "nope", "nah", "not yet", "negative"];

const OUTCOME_RULES: &[(&[&str], Outcome)] = &[
    (&["appointment", "appt", "set", "scheduled"], Outcome::AppointmentSet),
    (&["quote", "quotes", "estimate", "pricing"], Outcome::LookingForQuotes),
    (&["waste", "no interest", "not interested"], Outcome::WasteOfTime),
    (&["else", "other", "different"], Outcome::SomethingElse),
];

const PROJECT_RULES: &[(&[&str], ProjectType)] = &[
    (&["emergency", "mitigation", "ems"], ProjectType::EmergencyMitigation),
    (&["mold"], ProjectType::Mold),
    (&["reconstruction", "recon"], ProjectType::Reconstruction),
    (&["sewage"], ProjectType::Sewage),
    (&["biohazard", "bio"], ProjectType::Biohazard),
    (&["contents", "content"], ProjectType::Contents),
    (&["vandalism"], ProjectType::Vandalism),
];

const PROPERTY_RULES: &[(&[&str], PropertyType)] = &[
    (&["residential", "home", "house"], PropertyType::Residential),
    (&["commercial", "business"], PropertyType::Commercial),
];

const SUBTYPE_RULES: &[(&[&str], ResidentialSubtype)] = &[
    (&["single family", "single"], ResidentialSubtype::SingleFamily),
    (&["multi-family", "multi"], ResidentialSubtype::MultiFamily),
    (&["manufactured", "mobile", "trailer"], ResidentialSubtype::Manufactured),
];

const REFERRAL_RULES: &[(&[&str], ReferralSource)] = &[
    (&["customer", "referral"], ReferralSource::CustomerReferral),
    (&["industry", "partner"], ReferralSource::IndustryPartner),
    (&["insurance"], ReferralSource::InsuranceReferral),
    (&["lead"], ReferralSource::LeadGen),
    (&["online", "marketing"], ReferralSource::OnlineMarketing),
    (&["plumber"], ReferralSource::Plumber),
];

/// Classifies `text` for the given dialogue state.
pub fn classify(state: &DialogueState, text: &str) -> DialogueEvent {
    let trimmed = text.trim();
    let response = trimmed.to_lowercase();

    match state {
        // `Initial` rows answer the same confirmation question.
        DialogueState::Initial
        | DialogueState::AwaitingContactConfirmation
        | DialogueState::AwaitingInsurance => classify_yes_no(&response),
        DialogueState::AwaitingOutcome => menu_digit(&response)
            .and_then(|digit| outcome_from_digit(digit))
            .or_else(|| match_ordered(&response, OUTCOME_RULES))
            .map(DialogueEvent::Outcome)
            .unwrap_or(DialogueEvent::Unrecognized),
        DialogueState::AwaitingProjectType => menu_digit(&response)
            .and_then(ProjectType::from_menu_digit)
            .or_else(|| match_ordered(&response, PROJECT_RULES))
            .map(DialogueEvent::Project)
            .unwrap_or(DialogueEvent::Unrecognized),
        DialogueState::AwaitingPropertyType => menu_digit(&response)
            .and_then(|digit| match digit {
                1 => Some(PropertyType::Residential),
                2 => Some(PropertyType::Commercial),
                _ => None,
            })
            .or_else(|| match_ordered(&response, PROPERTY_RULES))
            .map(DialogueEvent::Property)
            .unwrap_or(DialogueEvent::Unrecognized),
        DialogueState::AwaitingResidentialSubtype => menu_digit(&response)
            .and_then(ResidentialSubtype::from_menu_digit)
            .or_else(|| match_ordered(&response, SUBTYPE_RULES))
            .map(DialogueEvent::Subtype)
            .unwrap_or(DialogueEvent::Unrecognized),
        DialogueState::AwaitingInsuranceCompany => {
            if trimmed.is_empty() {
                DialogueEvent::Unrecognized
            } else {
                DialogueEvent::FreeText(trimmed.to_string())
            }
        }
        DialogueState::AwaitingReferralSource => menu_digit(&response)
            .and_then(ReferralSource::from_menu_digit)
            .or_else(|| match_ordered(&response, REFERRAL_RULES))
            .map(DialogueEvent::Referral)
            .unwrap_or(DialogueEvent::Unrecognized),
        DialogueState::Completed => DialogueEvent::Unrecognized,
    }
}

fn classify_yes_no(response: &str) -> DialogueEvent {
    // YES is scanned before NO; the order is part of the contract.
    if matches_any(response, YES_PATTERNS) {
        DialogueEvent::Yes
    } else if matches_any(response, NO_PATTERNS) {
        DialogueEvent::No
    } else {
        DialogueEvent::Unrecognized
    }
}

fn menu_digit(response: &str) -> Option<u8> {
    if response.len() == 1 {
        response.chars().next().and_then(|ch| ch.to_digit(10)).map(|digit| digit as u8)
    } else {
        None
    }
}

fn outcome_from_digit(digit: u8) -> Option<Outcome> {
    match digit {
        1 => Some(Outcome::AppointmentSet),
        2 => Some(Outcome::LookingForQuotes),
        3 => Some(Outcome::WasteOfTime),
        4 => Some(Outcome::SomethingElse),
        _ => None,
    }
}

fn match_ordered<T: Copy>(response: &str, rules: &[(&[&str], T)]) -> Option<T> {
    rules
        .iter()
        .find(|(patterns, _)| matches_any(response, patterns))
        .map(|(_, value)| *value)
}

fn matches_any(response: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| {
        if pattern.chars().count() == 1 {
            response == *pattern
        } else {
            response.contains(pattern)
        }
    })
}
