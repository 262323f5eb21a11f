pub mod config;
pub mod dialogue;
pub mod domain;
pub mod errors;
pub mod followup;

pub use dialogue::{
    classify, transition, DialogueEvent, DialogueState, DialogueTransitionError, Effect, Prompt,
    TransitionOutcome,
};
pub use domain::contact::{Contact, ContactId, ContactStatus, Outcome};
pub use domain::conversation::{Conversation, ConversationId};
pub use domain::intake::{ProjectType, PropertyType, ReferralSource, ResidentialSubtype};
pub use domain::message::{DeliveryStatus, Direction, Message, MessageId};
pub use errors::DomainError;
pub use followup::FollowupPolicy;
