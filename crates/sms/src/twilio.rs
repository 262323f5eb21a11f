use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

use leadline_core::config::TwilioConfig;
use leadline_core::domain::message::DeliveryStatus;

use crate::gateway::{GatewayError, MessageGateway, OutboundReceipt, OutboundSms};

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// REST client for the Twilio Messages API.
pub struct TwilioGateway {
    http: Client,
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    base_url: String,
}

impl TwilioGateway {
    pub fn from_config(config: &TwilioConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.send_timeout_secs.max(1)))
            .build()
            .map_err(|error| GatewayError::Configuration(error.to_string()))?;

        Ok(Self {
            http,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
            base_url: TWILIO_API_BASE.to_owned(),
        })
    }

    /// Points the client at a different API host. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.base_url, self.account_sid)
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<i64>,
}

#[async_trait]
impl MessageGateway for TwilioGateway {
    async fn send(&self, sms: &OutboundSms) -> Result<OutboundReceipt, GatewayError> {
        let params =
            [("To", sms.to.as_str()), ("From", self.from_number.as_str()), ("Body", &sms.body)];

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&params)
            .send()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail: ErrorResponse = response.json().await.unwrap_or(ErrorResponse {
                message: None,
                code: None,
            });
            let message = match (detail.message, detail.code) {
                (Some(message), Some(code)) => format!("{message} (code {code})"),
                (Some(message), None) => message,
                _ => "no error detail returned".to_owned(),
            };
            warn!(to = %sms.to, http_status = status.as_u16(), %message, "sms send rejected");
            return Err(GatewayError::Rejected { status: status.as_u16(), message });
        }

        let body: MessageResponse = response
            .json()
            .await
            .map_err(|error| GatewayError::Transport(error.to_string()))?;
        let delivery = body
            .status
            .as_deref()
            .and_then(|value| value.parse().ok())
            .unwrap_or(DeliveryStatus::Queued);

        debug!(to = %sms.to, sid = %body.sid, "sms accepted by provider");
        Ok(OutboundReceipt { provider_sid: body.sid, status: delivery })
    }
}
