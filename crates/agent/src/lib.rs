//! Follow-up orchestration for leadline.
//!
//! This crate wires the pure dialogue core to the repositories and the SMS
//! gateway:
//! - **Conversation service** (`service`) - inbound reply handling and
//!   follow-up kick-off, one transactional turn at a time
//! - **Scheduler** (`scheduler`) - the periodic tick driving initial
//!   follow-ups, 2-hour retries, and 10-minute persistence reminders
//! - **Intake** (`intake`) - CRM polling sync that seeds new contacts
//! - **Projects** (`projects`) - hand-off seam for external project creation
//!
//! # Ordering principle
//!
//! Every turn sends before it persists. A gateway failure leaves contact and
//! conversation untouched, so the provider's redelivery (or the next tick)
//! repeats the turn instead of losing it. Per-technician-phone locks keep a
//! webhook and a scheduler tick from interleaving on one conversation.

pub mod errors;
pub mod intake;
pub mod locks;
pub mod projects;
pub mod scheduler;
pub mod service;

pub use errors::AgentError;
pub use intake::{ContactIntake, CrmClient, CrmContact, IntakeError, IntakeReport};
pub use projects::{
    LoggingProjectCreator, ProjectCreator, ProjectError, ProjectPass, ProjectPassReport,
};
pub use scheduler::{FollowupScheduler, TickReport};
pub use service::{ConversationService, FollowupDisposition, InboundDisposition, ServiceSettings};
