use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info};

use leadline_core::domain::contact::{Contact, ContactStatus};
use leadline_db::repositories::{ContactRepository, RepositoryError};

/// A lead as the field-service CRM reports it.
#[derive(Clone, Debug, PartialEq)]
pub struct CrmContact {
    pub id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl CrmContact {
    pub fn full_name(&self) -> String {
        let mut name = String::new();
        for part in [&self.first_name, &self.last_name].into_iter().flatten() {
            if !part.trim().is_empty() {
                if !name.is_empty() {
                    name.push(' ');
                }
                name.push_str(part.trim());
            }
        }
        name
    }
}

#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("crm request failed: {0}")]
    Crm(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Read side of the CRM: the server crate implements this over HTTP, tests
/// supply a canned list.
#[async_trait]
pub trait CrmClient: Send + Sync {
    async fn list_recent_contacts(&self) -> Result<Vec<CrmContact>, IntakeError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntakeReport {
    pub seen: usize,
    pub scheduled: usize,
}

/// Polls the CRM and seeds follow-ups for leads not seen before.
///
/// The follow-up lands `initial_delay` after the lead was created in the CRM,
/// not after we first saw it, so a poll gap does not push the schedule out.
pub struct ContactIntake {
    crm: Arc<dyn CrmClient>,
    contacts: Arc<dyn ContactRepository>,
    initial_delay: Duration,
}

impl ContactIntake {
    pub fn new(crm: Arc<dyn CrmClient>, contacts: Arc<dyn ContactRepository>) -> Self {
        Self::with_delay(crm, contacts, Duration::hours(24))
    }

    pub fn with_delay(
        crm: Arc<dyn CrmClient>,
        contacts: Arc<dyn ContactRepository>,
        initial_delay: Duration,
    ) -> Self {
        Self { crm, contacts, initial_delay }
    }

    pub async fn sync(&self, now: DateTime<Utc>) -> Result<IntakeReport, IntakeError> {
        let mut report = IntakeReport::default();

        for lead in self.crm.list_recent_contacts().await? {
            report.seen += 1;
            if self.contacts.find_by_external_id(lead.id).await?.is_some() {
                debug!(external_id = lead.id, "lead already tracked");
                continue;
            }

            let mut contact = Contact::new(lead.id, lead.full_name(), now);
            contact.first_name = lead.first_name.clone();
            contact.last_name = lead.last_name.clone();
            contact.email = lead.email.clone();
            contact.phone = lead.phone.clone();
            contact.address = lead.address.clone();
            contact.external_created_at = lead.created_at;

            let anchor = lead.created_at.unwrap_or(now);
            contact.status = ContactStatus::FollowUpScheduled;
            contact.follow_up_scheduled_at = Some(anchor + self.initial_delay);

            self.contacts.save(&contact).await?;
            report.scheduled += 1;
            info!(
                external_id = lead.id,
                follow_up_at = %contact.follow_up_scheduled_at.unwrap_or(now),
                "scheduled follow-up for new lead"
            );
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use leadline_core::domain::contact::ContactStatus;
    use leadline_db::repositories::{ContactRepository, InMemoryStore};

    use super::{ContactIntake, CrmClient, CrmContact, IntakeError};

    struct FixedCrm(Vec<CrmContact>);

    #[async_trait]
    impl CrmClient for FixedCrm {
        async fn list_recent_contacts(&self) -> Result<Vec<CrmContact>, IntakeError> {
            Ok(self.0.clone())
        }
    }

    fn lead(id: i64, first: &str, last: &str) -> CrmContact {
        CrmContact {
            id,
            first_name: Some(first.to_owned()),
            last_name: Some(last.to_owned()),
            email: None,
            phone: Some("+15553334444".to_owned()),
            address: Some("12 Oak Ln".to_owned()),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn sync_schedules_new_leads_a_day_out() {
        let store = Arc::new(InMemoryStore::new());
        let created = Utc::now() - Duration::hours(3);
        let mut new_lead = lead(700, "Priya", "Raman");
        new_lead.created_at = Some(created);
        let crm = Arc::new(FixedCrm(vec![new_lead]));
        let intake =
            ContactIntake::new(crm, Arc::clone(&store) as Arc<dyn ContactRepository>);

        let report = intake.sync(Utc::now()).await.unwrap();
        assert_eq!((report.seen, report.scheduled), (1, 1));

        let contact = store.find_by_external_id(700).await.unwrap().unwrap();
        assert_eq!(contact.full_name, "Priya Raman");
        assert_eq!(contact.status, ContactStatus::FollowUpScheduled);
        // Anchored to the CRM creation time, not the poll time.
        assert_eq!(contact.follow_up_scheduled_at, Some(created + Duration::hours(24)));
    }

    #[tokio::test]
    async fn sync_skips_leads_already_tracked() {
        let store = Arc::new(InMemoryStore::new());
        let crm = Arc::new(FixedCrm(vec![lead(701, "Ben", "Okafor")]));
        let intake =
            ContactIntake::new(crm, Arc::clone(&store) as Arc<dyn ContactRepository>);

        intake.sync(Utc::now()).await.unwrap();
        let second = intake.sync(Utc::now()).await.unwrap();

        assert_eq!((second.seen, second.scheduled), (1, 0));
        let contact = store.find_by_external_id(701).await.unwrap().unwrap();
        assert_eq!(contact.status, ContactStatus::FollowUpScheduled);
    }

    #[tokio::test]
    async fn missing_crm_timestamp_anchors_to_poll_time() {
        let store = Arc::new(InMemoryStore::new());
        let crm = Arc::new(FixedCrm(vec![lead(702, "Ana", "Silva")]));
        let intake = ContactIntake::with_delay(
            crm,
            Arc::clone(&store) as Arc<dyn ContactRepository>,
            Duration::minutes(5),
        );
        let now = Utc::now();

        intake.sync(now).await.unwrap();

        let contact = store.find_by_external_id(702).await.unwrap().unwrap();
        assert_eq!(contact.follow_up_scheduled_at, Some(now + Duration::minutes(5)));
    }
}
