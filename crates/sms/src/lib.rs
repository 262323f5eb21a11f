//! SMS channel for leadline.
//!
//! This crate owns everything that touches the message provider:
//! - **Gateway** (`gateway`) - outbound send abstraction the agent talks to
//! - **Twilio** (`twilio`) - REST client for the Twilio Messages API
//! - **Webhooks** (`webhook`) - inbound message and delivery receipt payloads
//!
//! The agent never constructs provider requests itself; it hands an
//! [`gateway::OutboundSms`] to a [`gateway::MessageGateway`] and receives a
//! [`gateway::OutboundReceipt`] carrying the provider message id used for
//! idempotent logging.

pub mod gateway;
pub mod twilio;
pub mod webhook;

pub use gateway::{GatewayError, MessageGateway, OutboundReceipt, OutboundSms, RecordingGateway};
pub use twilio::TwilioGateway;
pub use webhook::{empty_twiml, DeliveryStatusPayload, InboundSmsPayload};
