use chrono::{Duration, Utc};

use leadline_core::dialogue::DialogueState;
use leadline_core::domain::contact::{Contact, ContactStatus, Outcome};
use leadline_core::domain::conversation::Conversation;
use leadline_core::domain::intake::{ProjectType, PropertyType, ReferralSource};
use leadline_core::domain::message::{DeliveryStatus, Message};
use leadline_db::migrations::run_pending;
use leadline_db::repositories::{
    ContactRepository, ConversationRepository, MessageRepository, RepositoryError,
    SqlContactRepository, SqlConversationRepository, SqlMessageRepository,
};
use leadline_db::{connect_with_settings, DbPool, PoolSettings};

async fn fresh_pool() -> DbPool {
    let settings = PoolSettings { max_connections: 1, ..PoolSettings::default() };
    let pool = connect_with_settings("sqlite::memory:", settings).await.expect("connect");
    run_pending(&pool).await.expect("migrate");
    pool
}

#[tokio::test]
async fn contact_roundtrips_with_intake_fields() {
    let pool = fresh_pool().await;
    let repo = SqlContactRepository::new(pool);
    let now = Utc::now();

    let mut contact = Contact::new(8841, "Dana Whitfield", now);
    contact.phone = Some("+15550001111".into());
    contact.status = ContactStatus::ContactMade;
    contact.outcome = Outcome::AppointmentSet;
    contact.project_type = Some(ProjectType::EmergencyMitigation);
    contact.property_type = Some(PropertyType::Residential);
    contact.has_insurance = Some(true);
    contact.insurance_company = Some("State Farm".into());
    contact.referral_source = Some(ReferralSource::Plumber);
    contact.project_creation_needed = true;
    contact.outcome_received_at = Some(now);

    repo.save(&contact).await.expect("save");

    let loaded = repo
        .find_by_external_id(8841)
        .await
        .expect("query")
        .expect("contact present");
    assert_eq!(loaded.id, contact.id);
    assert_eq!(loaded.project_type, Some(ProjectType::EmergencyMitigation));
    assert_eq!(loaded.insurance_company.as_deref(), Some("State Farm"));

    let pending = repo.pending_project_creation().await.expect("pending");
    assert_eq!(pending.len(), 1);
}

#[tokio::test]
async fn save_is_an_upsert() {
    let pool = fresh_pool().await;
    let repo = SqlContactRepository::new(pool);
    let now = Utc::now();

    let mut contact = Contact::new(12, "Lee Varga", now);
    repo.save(&contact).await.expect("insert");

    contact.record_no_contact(now);
    repo.save(&contact).await.expect("update");

    let loaded = repo
        .find_by_id(&contact.id)
        .await
        .expect("query")
        .expect("contact present");
    assert_eq!(loaded.retry_count, 1);
    assert!(loaded.last_retry_at.is_some());
}

#[tokio::test]
async fn retry_and_persistence_queues_respect_mutual_exclusion() {
    let pool = fresh_pool().await;
    let contacts = SqlContactRepository::new(pool.clone());
    let conversations = SqlConversationRepository::new(pool);
    let now = Utc::now();

    // Got a NO three hours ago; belongs in the retry queue only.
    let mut retrying = Contact::new(1, "Retry Lead", now);
    retrying.record_no_contact(now - Duration::hours(3));
    contacts.save(&retrying).await.expect("save retrying");
    let mut stale = Conversation::start(
        retrying.id.clone(),
        "+15550001111",
        now - Duration::hours(3),
    );
    stale.last_message_at = now - Duration::hours(3);
    conversations.save(&stale).await.expect("save stale");

    // Never answered; belongs in the persistence queue only.
    let silent = Contact::new(2, "Silent Lead", now);
    contacts.save(&silent).await.expect("save silent");
    let mut quiet = Conversation::start(
        silent.id.clone(),
        "+15550003333",
        now - Duration::minutes(25),
    );
    quiet.last_message_at = now - Duration::minutes(25);
    conversations.save(&quiet).await.expect("save quiet");

    let due_retry = contacts
        .due_for_retry(now - Duration::hours(2))
        .await
        .expect("retry query");
    assert_eq!(due_retry.len(), 1);
    assert_eq!(due_retry[0].external_id, 1);

    let due_persistence = contacts
        .due_for_persistence(now - Duration::minutes(10))
        .await
        .expect("persistence query");
    assert_eq!(due_persistence.len(), 1);
    assert_eq!(due_persistence[0].external_id, 2);
}

#[tokio::test]
async fn followup_queue_orders_by_scheduled_time() {
    let pool = fresh_pool().await;
    let repo = SqlContactRepository::new(pool);
    let now = Utc::now();

    for (external_id, hours_ago) in [(10i64, 1i64), (11, 5), (12, 3)] {
        let mut contact = Contact::new(external_id, format!("Lead {external_id}"), now);
        contact.status = ContactStatus::FollowUpScheduled;
        contact.follow_up_scheduled_at = Some(now - Duration::hours(hours_ago));
        repo.save(&contact).await.expect("save");
    }

    // Not yet due.
    let mut future = Contact::new(13, "Future Lead", now);
    future.status = ContactStatus::FollowUpScheduled;
    future.follow_up_scheduled_at = Some(now + Duration::hours(4));
    repo.save(&future).await.expect("save future");

    let due = repo.due_for_followup(now).await.expect("query");
    let order: Vec<i64> = due.iter().map(|contact| contact.external_id).collect();
    assert_eq!(order, vec![11, 12, 10]);
}

#[tokio::test]
async fn commit_turn_rolls_back_on_conflict() {
    let pool = fresh_pool().await;
    let contacts = SqlContactRepository::new(pool.clone());
    let conversations = SqlConversationRepository::new(pool);
    let now = Utc::now();

    let mut contact = Contact::new(77, "Casey Moore", now);
    contacts.save(&contact).await.expect("save contact");
    let open = Conversation::start(contact.id.clone(), "+15550001111", now);
    conversations.save(&open).await.expect("save conversation");

    // A second active conversation violates the partial unique index, and the
    // contact mutation in the same turn must not survive the rollback.
    contact.contact_made_at = Some(now);
    let duplicate = Conversation::start(contact.id.clone(), "+15550001111", now);
    let outbound = Message::outbound(
        Some(duplicate.id.clone()),
        Some(contact.id.clone()),
        "+15550002222",
        "+15550001111",
        "How did it go?",
        now,
    );

    let error = conversations
        .commit_turn(&contact, &duplicate, std::slice::from_ref(&outbound))
        .await
        .expect_err("duplicate active conversation");
    assert!(matches!(error, RepositoryError::Conflict(_)));

    let stored = contacts
        .find_by_id(&contact.id)
        .await
        .expect("query")
        .expect("contact present");
    assert!(stored.contact_made_at.is_none());
}

#[tokio::test]
async fn commit_turn_persists_the_whole_dialogue_step() {
    let pool = fresh_pool().await;
    let contacts = SqlContactRepository::new(pool.clone());
    let conversations = SqlConversationRepository::new(pool.clone());
    let messages = SqlMessageRepository::new(pool);
    let now = Utc::now();

    let mut contact = Contact::new(78, "Dev Okafor", now);
    contacts.save(&contact).await.expect("save contact");
    let mut conversation = Conversation::start(contact.id.clone(), "+15550001111", now);

    contact.contact_made_at = Some(now);
    conversation.contact_confirmed = true;
    conversation.state = DialogueState::AwaitingOutcome;
    let outbound = Message::outbound(
        Some(conversation.id.clone()),
        Some(contact.id.clone()),
        "+15550002222",
        "+15550001111",
        "How did it go?",
        now,
    )
    .with_receipt("SM900", DeliveryStatus::Queued);

    conversations
        .commit_turn(&contact, &conversation, std::slice::from_ref(&outbound))
        .await
        .expect("commit turn");

    let active = conversations
        .find_active_by_phone("+15550001111")
        .await
        .expect("query")
        .expect("conversation present");
    assert_eq!(active.state, DialogueState::AwaitingOutcome);
    assert!(active.contact_confirmed);

    let logged = messages
        .find_by_provider_sid("SM900")
        .await
        .expect("query")
        .expect("message present");
    assert_eq!(logged.body, "How did it go?");

    messages
        .update_delivery_status("SM900", DeliveryStatus::Delivered, Some(now))
        .await
        .expect("status update");
    let updated = messages
        .find_by_provider_sid("SM900")
        .await
        .expect("query")
        .expect("message present");
    assert_eq!(updated.provider_status, Some(DeliveryStatus::Delivered));
    assert_eq!(updated.delivered_at.map(|at| at.timestamp()), Some(now.timestamp()));
}

#[tokio::test]
async fn inbound_replay_with_same_sid_conflicts() {
    let pool = fresh_pool().await;
    let contacts = SqlContactRepository::new(pool.clone());
    let conversations = SqlConversationRepository::new(pool.clone());
    let messages = SqlMessageRepository::new(pool);
    let now = Utc::now();

    let contact = Contact::new(79, "Robin Tate", now);
    contacts.save(&contact).await.expect("save contact");
    let conversation = Conversation::start(contact.id.clone(), "+15550001111", now);
    conversations.save(&conversation).await.expect("save conversation");

    let inbound = Message::inbound(
        conversation.id.clone(),
        contact.id.clone(),
        "+15550001111",
        "+15550002222",
        "YES",
        "SM500",
        now,
    );
    messages.append(&inbound).await.expect("first append");

    let replay = Message::inbound(
        conversation.id.clone(),
        contact.id.clone(),
        "+15550001111",
        "+15550002222",
        "YES",
        "SM500",
        now,
    );
    let error = messages.append(&replay).await.expect_err("replayed sid");
    assert!(matches!(error, RepositoryError::Conflict(_)));
}
