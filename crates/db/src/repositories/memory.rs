use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use leadline_core::dialogue::DialogueState;
use leadline_core::domain::contact::{Contact, ContactId, ContactStatus};
use leadline_core::domain::conversation::{Conversation, ConversationId};
use leadline_core::domain::message::{DeliveryStatus, Message};

use super::{
    ContactRepository, ConversationRepository, MessageRepository, RepositoryError,
};

/// In-process store backing tests and the conversation simulator.
///
/// Holds all three aggregates behind one lock pair so `commit_turn` observes
/// the same consistency the transactional store gives, including the
/// one-active-conversation-per-contact rule.
#[derive(Default)]
pub struct InMemoryStore {
    contacts: RwLock<HashMap<Uuid, Contact>>,
    conversations: RwLock<HashMap<Uuid, Conversation>>,
    messages: RwLock<Vec<Message>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn last_message(&self) -> Option<Message> {
        self.messages.read().await.last().cloned()
    }

    fn check_single_active(
        conversations: &HashMap<Uuid, Conversation>,
        candidate: &Conversation,
    ) -> Result<(), RepositoryError> {
        let clash = conversations.values().any(|existing| {
            existing.id != candidate.id
                && existing.contact_id == candidate.contact_id
                && existing.state != DialogueState::Completed
        });
        if clash && candidate.state != DialogueState::Completed {
            return Err(RepositoryError::Conflict(format!(
                "contact {} already has an active conversation",
                candidate.contact_id.0
            )));
        }
        Ok(())
    }

    fn check_new_sid(messages: &[Message], candidate: &Message) -> Result<(), RepositoryError> {
        if let Some(sid) = candidate.provider_sid.as_deref() {
            if messages.iter().any(|existing| existing.provider_sid.as_deref() == Some(sid)) {
                return Err(RepositoryError::Conflict(format!(
                    "message with provider sid {sid:?} already logged"
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ContactRepository for InMemoryStore {
    async fn find_by_id(&self, id: &ContactId) -> Result<Option<Contact>, RepositoryError> {
        Ok(self.contacts.read().await.get(&id.0).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_id: i64,
    ) -> Result<Option<Contact>, RepositoryError> {
        Ok(self
            .contacts
            .read()
            .await
            .values()
            .find(|contact| contact.external_id == external_id)
            .cloned())
    }

    async fn save(&self, contact: &Contact) -> Result<(), RepositoryError> {
        self.contacts.write().await.insert(contact.id.0, contact.clone());
        Ok(())
    }

    async fn due_for_followup(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Contact>, RepositoryError> {
        let contacts = self.contacts.read().await;
        let mut due: Vec<Contact> = contacts
            .values()
            .filter(|contact| {
                contact.status == ContactStatus::FollowUpScheduled
                    && contact
                        .follow_up_scheduled_at
                        .is_some_and(|scheduled| scheduled <= now)
            })
            .cloned()
            .collect();
        due.sort_by_key(|contact| contact.follow_up_scheduled_at);
        Ok(due)
    }

    async fn due_for_retry(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Contact>, RepositoryError> {
        self.due_awaiting_confirmation(|contact| {
            contact.last_retry_at.is_some_and(|at| at <= cutoff)
        })
        .await
    }

    async fn due_for_persistence(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Contact>, RepositoryError> {
        let conversations = self.conversations.read().await;
        let contacts = self.contacts.read().await;
        let mut due = Vec::new();
        for conversation in conversations.values() {
            if conversation.state != DialogueState::AwaitingContactConfirmation
                || conversation.completed_at.is_some()
                || conversation.last_message_at > cutoff
            {
                continue;
            }
            if let Some(contact) = contacts.get(&conversation.contact_id.0) {
                if contact.last_retry_at.is_none() {
                    due.push(contact.clone());
                }
            }
        }
        Ok(due)
    }

    async fn pending_project_creation(&self) -> Result<Vec<Contact>, RepositoryError> {
        Ok(self
            .contacts
            .read()
            .await
            .values()
            .filter(|contact| contact.project_creation_needed && !contact.project_created)
            .cloned()
            .collect())
    }
}

impl InMemoryStore {
    async fn due_awaiting_confirmation<F>(
        &self,
        predicate: F,
    ) -> Result<Vec<Contact>, RepositoryError>
    where
        F: Fn(&Contact) -> bool,
    {
        let conversations = self.conversations.read().await;
        let contacts = self.contacts.read().await;
        let mut due = Vec::new();
        for conversation in conversations.values() {
            if conversation.state != DialogueState::AwaitingContactConfirmation
                || conversation.completed_at.is_some()
            {
                continue;
            }
            if let Some(contact) = contacts.get(&conversation.contact_id.0) {
                if predicate(contact) {
                    due.push(contact.clone());
                }
            }
        }
        Ok(due)
    }
}

#[async_trait]
impl ConversationRepository for InMemoryStore {
    async fn find_by_id(
        &self,
        id: &ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self.conversations.read().await.get(&id.0).cloned())
    }

    async fn find_active_by_phone(
        &self,
        technician_phone: &str,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let conversations = self.conversations.read().await;
        let mut active: Vec<&Conversation> = conversations
            .values()
            .filter(|conversation| {
                conversation.technician_phone == technician_phone
                    && conversation.state != DialogueState::Completed
            })
            .collect();
        active.sort_by_key(|conversation| std::cmp::Reverse(conversation.last_message_at));
        Ok(active.first().map(|conversation| (*conversation).clone()))
    }

    async fn find_active_for_contact(
        &self,
        contact_id: &ContactId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        Ok(self
            .conversations
            .read()
            .await
            .values()
            .find(|conversation| {
                conversation.contact_id == *contact_id
                    && conversation.state != DialogueState::Completed
            })
            .cloned())
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        let mut conversations = self.conversations.write().await;
        Self::check_single_active(&conversations, conversation)?;
        conversations.insert(conversation.id.0, conversation.clone());
        Ok(())
    }

    async fn commit_turn(
        &self,
        contact: &Contact,
        conversation: &Conversation,
        turn_messages: &[Message],
    ) -> Result<(), RepositoryError> {
        let mut contacts = self.contacts.write().await;
        let mut conversations = self.conversations.write().await;
        let mut messages = self.messages.write().await;

        Self::check_single_active(&conversations, conversation)?;
        // Nothing may land before every sid in the turn clears the unique
        // check, or a failed turn would leave partial state behind.
        for (index, message) in turn_messages.iter().enumerate() {
            Self::check_new_sid(&messages, message)?;
            Self::check_new_sid(&turn_messages[..index], message)?;
        }

        contacts.insert(contact.id.0, contact.clone());
        conversations.insert(conversation.id.0, conversation.clone());
        messages.extend(turn_messages.iter().cloned());
        Ok(())
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn append(&self, message: &Message) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        Self::check_new_sid(&messages, message)?;
        messages.push(message.clone());
        Ok(())
    }

    async fn find_by_provider_sid(
        &self,
        provider_sid: &str,
    ) -> Result<Option<Message>, RepositoryError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .find(|message| message.provider_sid.as_deref() == Some(provider_sid))
            .cloned())
    }

    async fn update_delivery_status(
        &self,
        provider_sid: &str,
        status: DeliveryStatus,
        delivered_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let mut messages = self.messages.write().await;
        if let Some(message) = messages
            .iter_mut()
            .find(|message| message.provider_sid.as_deref() == Some(provider_sid))
        {
            message.provider_status = Some(status);
            message.delivered_at = delivered_at;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use leadline_core::domain::contact::Contact;
    use leadline_core::domain::conversation::Conversation;
    use leadline_core::domain::message::Message;

    use super::InMemoryStore;
    use crate::repositories::{
        ContactRepository, ConversationRepository, MessageRepository, RepositoryError,
    };

    #[tokio::test]
    async fn second_active_conversation_for_contact_is_rejected() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let contact = Contact::new(1, "Sam Ortiz", now);
        ContactRepository::save(&store, &contact).await.unwrap();

        let first = Conversation::start(contact.id.clone(), "+15550001111", now);
        ConversationRepository::save(&store, &first).await.unwrap();

        let second = Conversation::start(contact.id.clone(), "+15550001111", now);
        let error = ConversationRepository::save(&store, &second).await.unwrap_err();
        assert!(matches!(error, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn duplicate_provider_sid_is_rejected() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let contact = Contact::new(2, "Jordan Fields", now);
        let conversation = Conversation::start(contact.id.clone(), "+15550001111", now);

        let inbound = Message::inbound(
            conversation.id.clone(),
            contact.id.clone(),
            "+15550001111",
            "+15550002222",
            "YES",
            "SM100",
            now,
        );
        store.append(&inbound).await.unwrap();

        let replay = Message::inbound(
            conversation.id.clone(),
            contact.id.clone(),
            "+15550001111",
            "+15550002222",
            "YES",
            "SM100",
            now,
        );
        let error = store.append(&replay).await.unwrap_err();
        assert!(matches!(error, RepositoryError::Conflict(_)));

        let found = store.find_by_provider_sid("SM100").await.unwrap();
        assert_eq!(found.map(|message| message.id), Some(inbound.id));
    }

    #[tokio::test]
    async fn retry_and_persistence_queues_are_disjoint() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let mut retrying = Contact::new(3, "Retry Lead", now);
        retrying.record_no_contact(now - Duration::hours(3));
        ContactRepository::save(&store, &retrying).await.unwrap();
        let conversation =
            Conversation::start(retrying.id.clone(), "+15550001111", now - Duration::hours(3));
        ConversationRepository::save(&store, &conversation).await.unwrap();

        let silent = Contact::new(4, "Silent Lead", now);
        ContactRepository::save(&store, &silent).await.unwrap();
        let mut quiet =
            Conversation::start(silent.id.clone(), "+15550003333", now - Duration::minutes(20));
        quiet.last_message_at = now - Duration::minutes(20);
        ConversationRepository::save(&store, &quiet).await.unwrap();

        let retry_cutoff = now - Duration::hours(2);
        let due_retry = store.due_for_retry(retry_cutoff).await.unwrap();
        assert_eq!(due_retry.len(), 1);
        assert_eq!(due_retry[0].external_id, 3);

        let persistence_cutoff = now - Duration::minutes(10);
        let due_persistence = store.due_for_persistence(persistence_cutoff).await.unwrap();
        assert_eq!(due_persistence.len(), 1);
        assert_eq!(due_persistence[0].external_id, 4);
    }

    #[tokio::test]
    async fn commit_turn_writes_all_three_records() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let mut contact = Contact::new(5, "Casey Moore", now);
        let mut conversation = Conversation::start(contact.id.clone(), "+15550001111", now);

        contact.contact_made_at = Some(now);
        conversation.contact_confirmed = true;
        let outbound = Message::outbound(
            Some(conversation.id.clone()),
            Some(contact.id.clone()),
            "+15550002222",
            "+15550001111",
            "How did it go?",
            now,
        );

        store
            .commit_turn(&contact, &conversation, std::slice::from_ref(&outbound))
            .await
            .unwrap();

        let stored = ContactRepository::find_by_id(&store, &contact.id).await.unwrap();
        assert_eq!(stored, Some(contact));
        assert_eq!(store.message_count().await, 1);
    }

    #[tokio::test]
    async fn commit_turn_rejects_replayed_provider_sids_atomically() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let contact = Contact::new(6, "Robin Vega", now);
        let conversation = Conversation::start(contact.id.clone(), "+15550001111", now);

        let logged = Message::inbound(
            conversation.id.clone(),
            contact.id.clone(),
            "+15550001111",
            "+15550002222",
            "YES",
            "SM200",
            now,
        );
        store.append(&logged).await.unwrap();

        let replay = Message::inbound(
            conversation.id.clone(),
            contact.id.clone(),
            "+15550001111",
            "+15550002222",
            "YES",
            "SM200",
            now,
        );
        let error = store
            .commit_turn(&contact, &conversation, std::slice::from_ref(&replay))
            .await
            .unwrap_err();
        assert!(matches!(error, RepositoryError::Conflict(_)));

        // The failed turn stored neither the contact nor the conversation.
        let stored = ContactRepository::find_by_id(&store, &contact.id).await.unwrap();
        assert!(stored.is_none());
        assert!(ConversationRepository::find_by_id(&store, &conversation.id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.message_count().await, 1);
    }
}
