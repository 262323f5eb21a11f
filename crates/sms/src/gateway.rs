use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use leadline_core::domain::message::DeliveryStatus;

/// A message ready to hand to the provider. Numbers are E.164.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundSms {
    pub to: String,
    pub body: String,
}

impl OutboundSms {
    pub fn new(to: impl Into<String>, body: impl Into<String>) -> Self {
        Self { to: to.into(), body: body.into() }
    }
}

/// Provider acknowledgement of an accepted send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundReceipt {
    pub provider_sid: String,
    pub status: DeliveryStatus,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("provider rejected the send ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("gateway misconfigured: {0}")]
    Configuration(String),
}

/// Seam between the conversation agent and the SMS provider. A send that
/// returns an error must leave no trace in conversation state, so callers
/// send first and persist after.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send(&self, sms: &OutboundSms) -> Result<OutboundReceipt, GatewayError>;
}

/// Captures outbound traffic instead of sending it. Used by tests and by the
/// CLI conversation simulator.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<OutboundSms>>,
    counter: AtomicU64,
    fail_next: AtomicBool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<OutboundSms> {
        self.sent.lock().await.clone()
    }

    pub async fn last_body(&self) -> Option<String> {
        self.sent.lock().await.last().map(|sms| sms.body.clone())
    }

    /// Makes the next `send` fail with a transport error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageGateway for RecordingGateway {
    async fn send(&self, sms: &OutboundSms) -> Result<OutboundReceipt, GatewayError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(GatewayError::Transport("simulated send failure".to_owned()));
        }

        let sequence = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.sent.lock().await.push(sms.clone());
        Ok(OutboundReceipt {
            provider_sid: format!("SMrec{sequence:06}"),
            status: DeliveryStatus::Queued,
        })
    }
}
