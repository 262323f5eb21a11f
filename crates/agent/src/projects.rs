use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use leadline_core::domain::contact::Contact;
use leadline_db::repositories::{ContactRepository, RepositoryError};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project creation failed: {0}")]
    Creation(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Hand-off seam for creating a project in the field-service system once an
/// appointment is set. `Ok(None)` means the creator declined (for example it
/// is not configured yet); the contact stays pending for a later pass.
#[async_trait]
pub trait ProjectCreator: Send + Sync {
    async fn create_project(&self, contact: &Contact) -> Result<Option<i64>, ProjectError>;
}

/// Default creator until the CRM write side is wired up: records what would
/// have been created and leaves the contact pending.
#[derive(Default)]
pub struct LoggingProjectCreator;

#[async_trait]
impl ProjectCreator for LoggingProjectCreator {
    async fn create_project(&self, contact: &Contact) -> Result<Option<i64>, ProjectError> {
        info!(
            contact_id = %contact.id.0,
            external_id = contact.external_id,
            project_type = ?contact.project_type,
            property_type = ?contact.property_type,
            "project creation pending manual entry"
        );
        Ok(None)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProjectPassReport {
    pub pending: usize,
    pub created: usize,
}

/// Sweeps contacts flagged `project_creation_needed` and tries to create
/// their projects. One creator failure is logged and skipped so the rest of
/// the batch still runs.
pub struct ProjectPass {
    contacts: Arc<dyn ContactRepository>,
    creator: Arc<dyn ProjectCreator>,
}

impl ProjectPass {
    pub fn new(contacts: Arc<dyn ContactRepository>, creator: Arc<dyn ProjectCreator>) -> Self {
        Self { contacts, creator }
    }

    pub async fn run(&self, _now: DateTime<Utc>) -> Result<ProjectPassReport, ProjectError> {
        let mut report = ProjectPassReport::default();

        for mut contact in self.contacts.pending_project_creation().await? {
            report.pending += 1;
            match self.creator.create_project(&contact).await {
                Ok(Some(project_id)) => {
                    contact.project_created = true;
                    contact.external_project_id = Some(project_id);
                    self.contacts.save(&contact).await?;
                    report.created += 1;
                    info!(
                        contact_id = %contact.id.0,
                        project_id,
                        "project created for appointment"
                    );
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(contact_id = %contact.id.0, error = %error, "project creation failed");
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;

    use leadline_core::domain::contact::Contact;
    use leadline_db::repositories::{ContactRepository, InMemoryStore};

    use super::{ProjectCreator, ProjectError, ProjectPass};

    struct SequenceCreator(AtomicI64);

    #[async_trait]
    impl ProjectCreator for SequenceCreator {
        async fn create_project(&self, _contact: &Contact) -> Result<Option<i64>, ProjectError> {
            Ok(Some(self.0.fetch_add(1, Ordering::SeqCst)))
        }
    }

    struct FailingCreator;

    #[async_trait]
    impl ProjectCreator for FailingCreator {
        async fn create_project(&self, _contact: &Contact) -> Result<Option<i64>, ProjectError> {
            Err(ProjectError::Creation("crm offline".to_owned()))
        }
    }

    async fn seed_pending(store: &Arc<InMemoryStore>, external_id: i64) -> Contact {
        let mut contact = Contact::new(external_id, "Appointment Lead", Utc::now());
        contact.project_creation_needed = true;
        store.save(&contact).await.unwrap();
        contact
    }

    #[tokio::test]
    async fn pass_marks_created_projects_and_stores_the_id() {
        let store = Arc::new(InMemoryStore::new());
        seed_pending(&store, 900).await;
        let pass = ProjectPass::new(
            Arc::clone(&store) as Arc<dyn ContactRepository>,
            Arc::new(SequenceCreator(AtomicI64::new(5000))),
        );

        let report = pass.run(Utc::now()).await.unwrap();
        assert_eq!((report.pending, report.created), (1, 1));

        let contact = store.find_by_external_id(900).await.unwrap().unwrap();
        assert!(contact.project_created);
        assert_eq!(contact.external_project_id, Some(5000));

        // Done contacts drop out of the next pass.
        let quiet = pass.run(Utc::now()).await.unwrap();
        assert_eq!(quiet.pending, 0);
    }

    #[tokio::test]
    async fn creator_failure_leaves_the_contact_pending() {
        let store = Arc::new(InMemoryStore::new());
        seed_pending(&store, 901).await;
        let pass = ProjectPass::new(
            Arc::clone(&store) as Arc<dyn ContactRepository>,
            Arc::new(FailingCreator),
        );

        let report = pass.run(Utc::now()).await.unwrap();
        assert_eq!((report.pending, report.created), (1, 0));

        let contact = store.find_by_external_id(901).await.unwrap().unwrap();
        assert!(!contact.project_created);
        assert!(contact.project_creation_needed);
    }
}
