use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use leadline_core::dialogue::{classify, prompts, transition, DialogueState, Effect};
use leadline_core::domain::contact::{Contact, ContactStatus};
use leadline_core::domain::conversation::Conversation;
use leadline_core::domain::message::Message;
use leadline_core::followup::FollowupPolicy;
use leadline_db::repositories::{ContactRepository, ConversationRepository, MessageRepository};
use leadline_sms::{MessageGateway, OutboundSms};

use crate::errors::AgentError;
use crate::locks::PhoneLocks;

/// Identity the service speaks with: who it addresses and which number it
/// sends from.
#[derive(Clone, Debug)]
pub struct ServiceSettings {
    pub technician_name: String,
    pub technician_phone: String,
    pub from_number: String,
}

/// What became of an inbound SMS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundDisposition {
    /// Provider redelivered a sid already in the log; nothing done.
    DuplicateDelivery,
    /// No open conversation for the sender; a notice went out, nothing stored.
    NoActiveConversation,
    /// Gateway send failed; conversation state untouched, inbound not logged
    /// so a redelivery will repeat the turn.
    SendFailed,
    Replied { state: DialogueState },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FollowupDisposition {
    Started,
    AlreadyActive,
    SendFailed,
}

/// Drives one conversation turn at a time: read state, classify, transition,
/// send, commit. All entry points take the per-phone lock first.
pub struct ConversationService {
    contacts: Arc<dyn ContactRepository>,
    conversations: Arc<dyn ConversationRepository>,
    messages: Arc<dyn MessageRepository>,
    gateway: Arc<dyn MessageGateway>,
    settings: ServiceSettings,
    policy: FollowupPolicy,
    locks: PhoneLocks,
}

impl ConversationService {
    pub fn new(
        contacts: Arc<dyn ContactRepository>,
        conversations: Arc<dyn ConversationRepository>,
        messages: Arc<dyn MessageRepository>,
        gateway: Arc<dyn MessageGateway>,
        settings: ServiceSettings,
        policy: FollowupPolicy,
    ) -> Self {
        Self {
            contacts,
            conversations,
            messages,
            gateway,
            settings,
            policy,
            locks: PhoneLocks::new(),
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Processes one inbound SMS end to end.
    pub async fn handle_inbound_sms(
        &self,
        from_phone: &str,
        body: &str,
        provider_sid: &str,
        now: DateTime<Utc>,
    ) -> Result<InboundDisposition, AgentError> {
        let _guard = self.locks.acquire(from_phone).await;

        if self.messages.find_by_provider_sid(provider_sid).await?.is_some() {
            debug!(provider_sid, "redelivered inbound sid, skipping");
            return Ok(InboundDisposition::DuplicateDelivery);
        }

        let Some(mut conversation) = self.conversations.find_active_by_phone(from_phone).await?
        else {
            info!(from = from_phone, "inbound sms without an open conversation");
            let notice = OutboundSms::new(from_phone, prompts::no_active_conversation());
            if let Err(error) = self.gateway.send(&notice).await {
                warn!(error = %error, "could not deliver no-conversation notice");
            }
            return Ok(InboundDisposition::NoActiveConversation);
        };

        let mut contact = self
            .contacts
            .find_by_id(&conversation.contact_id)
            .await?
            .ok_or_else(|| AgentError::MissingContact(conversation.contact_id.0.to_string()))?;

        let event = classify(&conversation.state, body);
        let outcome = transition(&conversation.state, &event)?;
        apply_effects(&outcome.effects, &mut contact, &mut conversation, now);
        conversation.state = outcome.to;
        conversation.touch(now);

        let reply_body = outcome.reply.render(&contact);
        let receipt = match self.gateway.send(&OutboundSms::new(from_phone, &reply_body)).await {
            Ok(receipt) => receipt,
            Err(error) => {
                warn!(
                    error = %error,
                    contact_id = %contact.id.0,
                    conversation_id = %conversation.id.0,
                    "gateway send failed, leaving turn unapplied"
                );
                return Ok(InboundDisposition::SendFailed);
            }
        };

        let inbound = Message::inbound(
            conversation.id.clone(),
            contact.id.clone(),
            from_phone,
            &self.settings.from_number,
            body,
            provider_sid,
            now,
        );
        let outbound = Message::outbound(
            Some(conversation.id.clone()),
            Some(contact.id.clone()),
            &self.settings.from_number,
            from_phone,
            reply_body,
            now,
        )
        .with_receipt(receipt.provider_sid, receipt.status);

        self.conversations.commit_turn(&contact, &conversation, &[inbound, outbound]).await?;

        info!(
            contact_id = %contact.id.0,
            conversation_id = %conversation.id.0,
            from_state = conversation_state_label(&outcome.from),
            to_state = conversation_state_label(&conversation.state),
            recognized = event.is_recognized(),
            "inbound turn committed"
        );
        Ok(InboundDisposition::Replied { state: conversation.state })
    }

    /// Opens a conversation for a contact and sends the initial confirmation
    /// question. The contact is marked `follow_up_sent` only when the send
    /// succeeded and the turn committed.
    pub async fn start_followup(
        &self,
        contact: &mut Contact,
        now: DateTime<Utc>,
    ) -> Result<FollowupDisposition, AgentError> {
        let _guard = self.locks.acquire(&self.settings.technician_phone).await;

        if self.conversations.find_active_for_contact(&contact.id).await?.is_some() {
            warn!(contact_id = %contact.id.0, "follow-up requested with a conversation already open");
            return Ok(FollowupDisposition::AlreadyActive);
        }

        let conversation =
            Conversation::start(contact.id.clone(), &self.settings.technician_phone, now);
        let body = prompts::initial_confirmation(&self.settings.technician_name, contact);

        let receipt = match self
            .gateway
            .send(&OutboundSms::new(&self.settings.technician_phone, &body))
            .await
        {
            Ok(receipt) => receipt,
            Err(error) => {
                warn!(error = %error, contact_id = %contact.id.0, "initial follow-up send failed");
                return Ok(FollowupDisposition::SendFailed);
            }
        };

        contact.status = ContactStatus::FollowUpSent;
        contact.follow_up_sent_at = Some(now);

        let outbound = Message::outbound(
            Some(conversation.id.clone()),
            Some(contact.id.clone()),
            &self.settings.from_number,
            &self.settings.technician_phone,
            body,
            now,
        )
        .with_receipt(receipt.provider_sid, receipt.status);

        self.conversations.commit_turn(contact, &conversation, &[outbound]).await?;
        info!(contact_id = %contact.id.0, conversation_id = %conversation.id.0, "follow-up started");
        Ok(FollowupDisposition::Started)
    }

    /// Sends the 2-hour check-in and re-arms the retry window. Returns false
    /// when the guard no longer holds or the send failed.
    pub async fn send_retry_checkin(
        &self,
        mut contact: Contact,
        now: DateTime<Utc>,
    ) -> Result<bool, AgentError> {
        let _guard = self.locks.acquire(&self.settings.technician_phone).await;

        let Some(mut conversation) =
            self.conversations.find_active_for_contact(&contact.id).await?
        else {
            return Ok(false);
        };
        if !self.policy.retry_due(&contact, &conversation, now) {
            return Ok(false);
        }

        let body = prompts::retry_checkin(&self.settings.technician_name, &contact);
        let receipt = match self
            .gateway
            .send(&OutboundSms::new(&self.settings.technician_phone, &body))
            .await
        {
            Ok(receipt) => receipt,
            Err(error) => {
                warn!(error = %error, contact_id = %contact.id.0, "retry check-in send failed");
                return Ok(false);
            }
        };

        contact.retry_count += 1;
        contact.last_retry_at = Some(now);
        conversation.touch(now);

        let outbound = self
            .scheduler_message(&contact, &conversation, body, now)
            .with_receipt(receipt.provider_sid, receipt.status);
        self.conversations.commit_turn(&contact, &conversation, &[outbound]).await?;
        info!(contact_id = %contact.id.0, retry_count = contact.retry_count, "retry check-in sent");
        Ok(true)
    }

    /// Sends one persistence reminder. Touching `last_message_at` restarts
    /// the silence window, which is what gives the 10-minute cadence.
    pub async fn send_persistence_reminder(
        &self,
        mut contact: Contact,
        now: DateTime<Utc>,
    ) -> Result<bool, AgentError> {
        let _guard = self.locks.acquire(&self.settings.technician_phone).await;

        let Some(mut conversation) =
            self.conversations.find_active_for_contact(&contact.id).await?
        else {
            return Ok(false);
        };
        if !self.policy.persistence_due(&contact, &conversation, now) {
            return Ok(false);
        }

        let body = prompts::persistence_reminder(
            &self.settings.technician_name,
            &contact,
            contact.persistence_count,
        );
        let receipt = match self
            .gateway
            .send(&OutboundSms::new(&self.settings.technician_phone, &body))
            .await
        {
            Ok(receipt) => receipt,
            Err(error) => {
                warn!(error = %error, contact_id = %contact.id.0, "persistence reminder send failed");
                return Ok(false);
            }
        };

        contact.record_persistence_send(now);
        conversation.touch(now);

        let outbound = self
            .scheduler_message(&contact, &conversation, body, now)
            .with_receipt(receipt.provider_sid, receipt.status);
        self.conversations.commit_turn(&contact, &conversation, &[outbound]).await?;
        info!(
            contact_id = %contact.id.0,
            persistence_count = contact.persistence_count,
            "persistence reminder sent"
        );
        Ok(true)
    }

    fn scheduler_message(
        &self,
        contact: &Contact,
        conversation: &Conversation,
        body: String,
        now: DateTime<Utc>,
    ) -> Message {
        Message::outbound(
            Some(conversation.id.clone()),
            Some(contact.id.clone()),
            &self.settings.from_number,
            &self.settings.technician_phone,
            body,
            now,
        )
    }
}

fn conversation_state_label(state: &DialogueState) -> &'static str {
    state.as_str()
}

fn apply_effects(
    effects: &[Effect],
    contact: &mut Contact,
    conversation: &mut Conversation,
    now: DateTime<Utc>,
) {
    for effect in effects {
        match effect {
            Effect::ConfirmContact => {
                conversation.contact_confirmed = true;
                contact.status = ContactStatus::ContactMade;
                contact.contact_made_at = Some(now);
            }
            Effect::RecordNoContact => {
                contact.record_no_contact(now);
                contact.status = ContactStatus::NoContact;
            }
            Effect::ClearPersistence => contact.clear_persistence(),
            Effect::SetOutcome(outcome) => {
                contact.outcome = *outcome;
                conversation.outcome = Some(*outcome);
                contact.outcome_received_at = Some(now);
            }
            Effect::RequireProjectCreation => contact.project_creation_needed = true,
            Effect::SetProjectType(value) => contact.project_type = Some(*value),
            Effect::SetPropertyType(value) => contact.property_type = Some(*value),
            Effect::SetResidentialSubtype(value) => contact.residential_subtype = Some(*value),
            Effect::SetInsurance(value) => contact.has_insurance = Some(*value),
            Effect::SetInsuranceCompany(company) => {
                contact.insurance_company = Some(company.clone());
            }
            Effect::SetReferralSource(value) => contact.referral_source = Some(*value),
            Effect::CompleteContact => {
                contact.status = ContactStatus::Completed;
                contact.completed_at = Some(now);
                conversation.complete(now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use leadline_core::dialogue::DialogueState;
    use leadline_core::domain::contact::{Contact, ContactStatus, Outcome};
    use leadline_core::domain::conversation::Conversation;
    use leadline_core::domain::intake::{ProjectType, PropertyType, ResidentialSubtype};
    use leadline_core::followup::FollowupPolicy;
    use leadline_db::repositories::{
        ContactRepository, ConversationRepository, InMemoryStore, MessageRepository,
    };
    use leadline_sms::RecordingGateway;

    use super::{ConversationService, FollowupDisposition, InboundDisposition, ServiceSettings};

    const TECH: &str = "+15550001111";

    fn settings() -> ServiceSettings {
        ServiceSettings {
            technician_name: "Rudy".to_owned(),
            technician_phone: TECH.to_owned(),
            from_number: "+15550002222".to_owned(),
        }
    }

    fn service(
        store: &Arc<InMemoryStore>,
        gateway: &Arc<RecordingGateway>,
    ) -> ConversationService {
        ConversationService::new(
            Arc::clone(store) as Arc<dyn ContactRepository>,
            Arc::clone(store) as Arc<dyn ConversationRepository>,
            Arc::clone(store) as Arc<dyn MessageRepository>,
            Arc::clone(gateway) as Arc<_>,
            settings(),
            FollowupPolicy::default(),
        )
    }

    async fn seeded_contact(store: &Arc<InMemoryStore>) -> Contact {
        let mut contact = Contact::new(4120, "Dana Whitfield", Utc::now());
        contact.status = ContactStatus::FollowUpScheduled;
        ContactRepository::save(store.as_ref(), &contact).await.unwrap();
        contact
    }

    #[tokio::test]
    async fn start_followup_opens_conversation_and_marks_contact() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let mut contact = seeded_contact(&store).await;
        let now = Utc::now();

        let disposition = service.start_followup(&mut contact, now).await.unwrap();
        assert_eq!(disposition, FollowupDisposition::Started);

        let open = store.find_active_by_phone(TECH).await.unwrap().expect("conversation open");
        assert_eq!(open.state, DialogueState::AwaitingContactConfirmation);

        let stored = ContactRepository::find_by_id(store.as_ref(), &contact.id)
            .await
            .unwrap()
            .expect("contact");
        assert_eq!(stored.status, ContactStatus::FollowUpSent);
        assert!(gateway.last_body().await.unwrap().starts_with("Hi Rudy,"));
    }

    #[tokio::test]
    async fn start_followup_skips_when_conversation_already_open() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let mut contact = seeded_contact(&store).await;
        let now = Utc::now();

        service.start_followup(&mut contact, now).await.unwrap();
        let second = service.start_followup(&mut contact, now).await.unwrap();

        assert_eq!(second, FollowupDisposition::AlreadyActive);
        assert_eq!(gateway.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn yes_reply_advances_to_outcome_menu() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let mut contact = seeded_contact(&store).await;
        let now = Utc::now();
        service.start_followup(&mut contact, now).await.unwrap();

        let disposition =
            service.handle_inbound_sms(TECH, "YES", "SM-yes-1", now).await.unwrap();

        assert_eq!(disposition, InboundDisposition::Replied { state: DialogueState::AwaitingOutcome });
        let stored = ContactRepository::find_by_id(store.as_ref(), &contact.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ContactStatus::ContactMade);
        assert!(stored.contact_made_at.is_some());
        assert!(gateway.last_body().await.unwrap().contains("What was the outcome"));
    }

    #[tokio::test]
    async fn duplicate_sid_is_ignored() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let mut contact = seeded_contact(&store).await;
        let now = Utc::now();
        service.start_followup(&mut contact, now).await.unwrap();

        service.handle_inbound_sms(TECH, "YES", "SM-dup", now).await.unwrap();
        let sent_before = gateway.sent().await.len();

        let replay = service.handle_inbound_sms(TECH, "YES", "SM-dup", now).await.unwrap();
        assert_eq!(replay, InboundDisposition::DuplicateDelivery);
        assert_eq!(gateway.sent().await.len(), sent_before);

        let open = store.find_active_by_phone(TECH).await.unwrap().unwrap();
        assert_eq!(open.state, DialogueState::AwaitingOutcome);
    }

    #[tokio::test]
    async fn unknown_sender_gets_notice_and_nothing_is_stored() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let now = Utc::now();

        let disposition = service
            .handle_inbound_sms("+15559998888", "hello?", "SM-stray", now)
            .await
            .unwrap();

        assert_eq!(disposition, InboundDisposition::NoActiveConversation);
        assert!(gateway.last_body().await.unwrap().contains("No active conversation"));
        assert_eq!(store.message_count().await, 0);
    }

    #[tokio::test]
    async fn unrecognized_reply_reprompts_without_moving_state() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let mut contact = seeded_contact(&store).await;
        let now = Utc::now();
        service.start_followup(&mut contact, now).await.unwrap();

        let disposition =
            service.handle_inbound_sms(TECH, "banana", "SM-weird", now).await.unwrap();

        assert_eq!(
            disposition,
            InboundDisposition::Replied { state: DialogueState::AwaitingContactConfirmation }
        );
        assert!(gateway.last_body().await.unwrap().contains("Please reply YES or NO"));
    }

    #[tokio::test]
    async fn gateway_failure_leaves_the_turn_unapplied() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let mut contact = seeded_contact(&store).await;
        let now = Utc::now();
        service.start_followup(&mut contact, now).await.unwrap();
        let messages_before = store.message_count().await;

        gateway.fail_next();
        let disposition =
            service.handle_inbound_sms(TECH, "YES", "SM-lost", now).await.unwrap();
        assert_eq!(disposition, InboundDisposition::SendFailed);

        // State untouched and the inbound sid not burned.
        let open = store.find_active_by_phone(TECH).await.unwrap().unwrap();
        assert_eq!(open.state, DialogueState::AwaitingContactConfirmation);
        assert_eq!(store.message_count().await, messages_before);

        let retried = service.handle_inbound_sms(TECH, "YES", "SM-lost", now).await.unwrap();
        assert_eq!(retried, InboundDisposition::Replied { state: DialogueState::AwaitingOutcome });
    }

    #[tokio::test]
    async fn full_appointment_path_collects_every_field() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let mut contact = seeded_contact(&store).await;
        let mut now = Utc::now();
        service.start_followup(&mut contact, now).await.unwrap();

        let replies = [
            ("YES", DialogueState::AwaitingOutcome),
            ("1", DialogueState::AwaitingProjectType),
            ("2", DialogueState::AwaitingPropertyType),
            ("1", DialogueState::AwaitingResidentialSubtype),
            ("1", DialogueState::AwaitingInsurance),
            ("yes", DialogueState::AwaitingInsuranceCompany),
            ("State Farm", DialogueState::AwaitingReferralSource),
            ("6", DialogueState::Completed),
        ];
        for (index, (reply, expected)) in replies.into_iter().enumerate() {
            now += Duration::seconds(30);
            let disposition = service
                .handle_inbound_sms(TECH, reply, &format!("SM-hp-{index}"), now)
                .await
                .unwrap();
            assert_eq!(
                disposition,
                InboundDisposition::Replied { state: expected },
                "reply `{reply}`"
            );
        }

        let stored = ContactRepository::find_by_id(store.as_ref(), &contact.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ContactStatus::Completed);
        assert_eq!(stored.outcome, Outcome::AppointmentSet);
        assert_eq!(stored.project_type, Some(ProjectType::Mold));
        assert_eq!(stored.property_type, Some(PropertyType::Residential));
        assert_eq!(stored.residential_subtype, Some(ResidentialSubtype::SingleFamily));
        assert_eq!(stored.has_insurance, Some(true));
        assert_eq!(stored.insurance_company.as_deref(), Some("State Farm"));
        assert!(stored.project_creation_needed);

        // Initial prompt + 7 questions + completion summary.
        assert_eq!(gateway.sent().await.len(), 9);
        let summary = gateway.last_body().await.unwrap();
        assert!(summary.contains("Project: Mold"));
        assert!(summary.contains("Insurance: Yes - State Farm"));

        assert!(store.find_active_by_phone(TECH).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_initial_conversation_accepts_a_confirmation_reply() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let contact = seeded_contact(&store).await;
        let now = Utc::now();

        // A row written before the first prompt went out.
        let mut conversation = Conversation::start(contact.id.clone(), TECH, now);
        conversation.state = DialogueState::Initial;
        ConversationRepository::save(store.as_ref(), &conversation).await.unwrap();

        let disposition =
            service.handle_inbound_sms(TECH, "YES", "SM-init", now).await.unwrap();

        assert_eq!(
            disposition,
            InboundDisposition::Replied { state: DialogueState::AwaitingOutcome }
        );
        assert!(gateway.last_body().await.unwrap().contains("What was the outcome"));
    }

    #[tokio::test]
    async fn no_reply_arms_the_retry_cycle() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let mut contact = seeded_contact(&store).await;
        let now = Utc::now();
        service.start_followup(&mut contact, now).await.unwrap();

        let disposition =
            service.handle_inbound_sms(TECH, "no", "SM-no", now).await.unwrap();
        assert_eq!(
            disposition,
            InboundDisposition::Replied { state: DialogueState::AwaitingContactConfirmation }
        );

        let stored = ContactRepository::find_by_id(store.as_ref(), &contact.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ContactStatus::NoContact);
        assert_eq!(stored.retry_count, 1);
        assert!(stored.last_retry_at.is_some());
        assert!(!stored.persistence_mode);
        assert!(gateway.last_body().await.unwrap().contains("2 hours"));
    }

    #[tokio::test]
    async fn retry_checkin_respects_the_two_hour_window() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let mut contact = seeded_contact(&store).await;
        let start = Utc::now();
        service.start_followup(&mut contact, start).await.unwrap();
        service.handle_inbound_sms(TECH, "no", "SM-no-1", start).await.unwrap();

        let contact = ContactRepository::find_by_id(store.as_ref(), &contact.id)
            .await
            .unwrap()
            .unwrap();

        let early = start + Duration::minutes(119);
        assert!(!service.send_retry_checkin(contact.clone(), early).await.unwrap());

        let due = start + Duration::hours(2);
        assert!(service.send_retry_checkin(contact, due).await.unwrap());
        assert!(gateway.last_body().await.unwrap().contains("checking in again"));

        let stored = ContactRepository::find_by_external_id(store.as_ref(), 4120)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.retry_count, 2);
        assert_eq!(stored.last_retry_at, Some(due));
    }

    #[tokio::test]
    async fn persistence_reminders_carry_an_incrementing_counter() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let mut contact = seeded_contact(&store).await;
        let start = Utc::now();
        service.start_followup(&mut contact, start).await.unwrap();

        let silent = start + Duration::minutes(10);
        let contact = ContactRepository::find_by_id(store.as_ref(), &contact.id)
            .await
            .unwrap()
            .unwrap();
        assert!(service.send_persistence_reminder(contact, silent).await.unwrap());
        assert!(gateway.last_body().await.unwrap().contains("PERSISTENCE MODE ACTIVATED"));

        let contact = ContactRepository::find_by_external_id(store.as_ref(), 4120)
            .await
            .unwrap()
            .unwrap();
        assert!(contact.persistence_mode);
        assert_eq!(contact.persistence_count, 1);

        let again = silent + Duration::minutes(10);
        assert!(service.send_persistence_reminder(contact, again).await.unwrap());
        assert!(gateway.last_body().await.unwrap().starts_with("Reminder #2:"));
    }

    #[tokio::test]
    async fn no_reply_blocks_persistence() {
        let store = Arc::new(InMemoryStore::new());
        let gateway = Arc::new(RecordingGateway::new());
        let service = service(&store, &gateway);
        let mut contact = seeded_contact(&store).await;
        let start = Utc::now();
        service.start_followup(&mut contact, start).await.unwrap();
        service.handle_inbound_sms(TECH, "no", "SM-no-2", start).await.unwrap();

        let contact = ContactRepository::find_by_id(store.as_ref(), &contact.id)
            .await
            .unwrap()
            .unwrap();
        let later = start + Duration::minutes(30);
        assert!(!service.send_persistence_reminder(contact, later).await.unwrap());
    }
}
