use thiserror::Error;

use leadline_core::dialogue::DialogueTransitionError;
use leadline_db::repositories::RepositoryError;
use leadline_sms::GatewayError;

/// Failures surfaced by the orchestration layer.
///
/// `Repository` and `Transition` are fatal for the current turn and
/// propagate; gateway errors are handled inline (logged, state preserved)
/// and only appear here when a caller chose to escalate one.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Transition(#[from] DialogueTransitionError),
    #[error("contact {0} missing for an active conversation")]
    MissingContact(String),
}
