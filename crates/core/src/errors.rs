use thiserror::Error;

use crate::dialogue::DialogueTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown {kind} value `{value}`")]
    UnknownEnumValue { kind: &'static str, value: String },
    #[error(transparent)]
    Transition(#[from] DialogueTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn unknown(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnknownEnumValue { kind, value: value.into() }
    }
}
