//! HTTP client for the field-service CRM contact feed.
//!
//! The CRM exposes `GET /Integrations/Contacts` with `apikey` header auth,
//! page-numbered pagination, and a `{"data": [...]}` envelope. Only the read
//! side is wired here; project creation stays a manual step for now.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{debug, warn};

use leadline_agent::{CrmClient, CrmContact, IntakeError};
use leadline_core::config::CrmConfig;

const PAGE_SIZE: u32 = 100;
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct HttpCrmClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ContactPage {
    #[serde(default)]
    data: Vec<ContactRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContactRecord {
    id: i64,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    address1: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    zip_code: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl ContactRecord {
    fn into_crm_contact(self) -> CrmContact {
        let address = join_address(&[&self.address1, &self.city, &self.state, &self.zip_code]);
        let created_at = self.created_at.as_deref().and_then(parse_timestamp);
        CrmContact {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone: self.phone_number,
            address,
            created_at,
        }
    }
}

impl HttpCrmClient {
    pub fn from_config(config: &CrmConfig) -> Result<Self, IntakeError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            let mut value = HeaderValue::from_str(api_key.expose_secret())
                .map_err(|_| IntakeError::Crm("api key is not a valid header value".into()))?;
            value.set_sensitive(true);
            headers.insert("apikey", value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|error| IntakeError::Crm(error.to_string()))?;

        Ok(Self { http, base_url: config.base_url.trim_end_matches('/').to_owned() })
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<ContactRecord>, IntakeError> {
        let url = format!("{}/Integrations/Contacts", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("page", page), ("pageSize", PAGE_SIZE)])
            .send()
            .await
            .map_err(|error| IntakeError::Crm(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(http_status = status.as_u16(), page, "crm contact listing rejected");
            return Err(IntakeError::Crm(format!("contact listing returned HTTP {status}")));
        }

        let body: ContactPage =
            response.json().await.map_err(|error| IntakeError::Crm(error.to_string()))?;
        Ok(body.data)
    }
}

#[async_trait]
impl CrmClient for HttpCrmClient {
    async fn list_recent_contacts(&self) -> Result<Vec<CrmContact>, IntakeError> {
        let mut contacts = Vec::new();
        let mut page = 1;
        loop {
            let records = self.fetch_page(page).await?;
            let full_page = records.len() as u32 == PAGE_SIZE;
            contacts.extend(records.into_iter().map(ContactRecord::into_crm_contact));
            if !full_page {
                break;
            }
            page += 1;
        }
        debug!(count = contacts.len(), "crm contacts listed");
        Ok(contacts)
    }
}

fn join_address(parts: &[&Option<String>]) -> Option<String> {
    let joined = parts
        .iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value).map(|parsed| parsed.with_timezone(&Utc)).ok()
}
