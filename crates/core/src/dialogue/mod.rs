//! SMS qualification dialogue.
//!
//! The dialogue is a strict finite-state machine over free-text replies:
//! `intents` classifies a reply for the current state, `engine` applies the
//! transition table, and `prompts` renders the next message. Unrecognized
//! input never transitions; it re-asks the question that elicited it.

pub mod engine;
pub mod intents;
pub mod prompts;
pub mod states;

pub use engine::{transition, DialogueTransitionError};
pub use intents::classify;
pub use states::{DialogueEvent, DialogueState, Effect, Prompt, TransitionOutcome};
