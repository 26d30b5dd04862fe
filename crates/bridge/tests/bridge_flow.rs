//! End-to-end tests for the bridge core against mock collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use bridge::{
    AuthorRole, BridgeError, ChatMessage, ChatPipeline, DeliveryConfig, DeliveryOutcome,
    DeliveryPipeline, InboundListener, InboundOutcome, LinkConfig, LinkManager, LinkState,
    ListenerConfig, MessageCategory, SignalGateway,
};
use bridge_store::{audit, banner, connection, Database, DeliveryStatus, PhoneCipher};
use signal_gateway::{
    DataMessage, Envelope, GatewayError, LinkStatus, SendReceipt, TextStyleParam,
};

#[derive(Default)]
struct MockState {
    /// Sends to fail before succeeding.
    fail_sends: u32,
    /// (recipient, text) pairs actually sent.
    sent: Vec<(String, String)>,
    link_complete: bool,
    link_number: Option<String>,
}

/// Scriptable gateway double.
#[derive(Clone, Default)]
struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    fn fail_next_sends(&self, n: u32) {
        self.state.lock().unwrap().fail_sends = n;
    }

    fn set_link_complete(&self, number: &str) {
        let mut state = self.state.lock().unwrap();
        state.link_complete = true;
        state.link_number = Some(number.to_string());
    }

    fn sent(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().sent.clone()
    }
}

#[async_trait]
impl SignalGateway for MockGateway {
    async fn send_styled(
        &self,
        recipient: &str,
        text: &str,
        _styles: Vec<TextStyleParam>,
    ) -> Result<SendReceipt, GatewayError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_sends > 0 {
            state.fail_sends -= 1;
            return Err(GatewayError::Connection("simulated outage".to_string()));
        }
        state.sent.push((recipient.to_string(), text.to_string()));
        Ok(SendReceipt {
            timestamp: 1_700_000_000_000,
            results: Vec::new(),
        })
    }

    async fn request_link_qr_code(&self) -> Result<Vec<u8>, GatewayError> {
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn link_status(&self) -> Result<LinkStatus, GatewayError> {
        let state = self.state.lock().unwrap();
        Ok(LinkStatus {
            complete: state.link_complete,
            number: state.link_number.clone(),
        })
    }
}

/// Chat pipeline double that records deposited messages.
#[derive(Clone, Default)]
struct MockChat {
    messages: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl MockChat {
    fn messages(&self) -> Vec<(String, String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatPipeline for MockChat {
    async fn add_message(
        &self,
        user_id: &str,
        project_id: &str,
        body: &str,
        _author: AuthorRole,
    ) -> Result<String, BridgeError> {
        let mut messages = self.messages.lock().unwrap();
        messages.push((
            user_id.to_string(),
            project_id.to_string(),
            body.to_string(),
        ));
        Ok(format!("chat-{}", messages.len()))
    }
}

async fn test_db() -> Database {
    let db = Database::connect_with_pool_size("sqlite::memory:", 1)
        .await
        .unwrap();
    db.migrate().await.unwrap();
    db
}

fn test_cipher() -> PhoneCipher {
    PhoneCipher::from_key_str(&"ab".repeat(32)).unwrap()
}

fn fast_delivery_config() -> DeliveryConfig {
    DeliveryConfig {
        max_retries: 3,
        initial_backoff: Duration::from_millis(5),
        max_backoff: Duration::from_millis(20),
        app_base_url: "https://app.example.com".to_string(),
    }
}

fn chat_message(category: MessageCategory, body: &str) -> ChatMessage {
    ChatMessage {
        id: "msg-1".to_string(),
        user_id: "user-a".to_string(),
        project_id: "project-alpha".to_string(),
        body: body.to_string(),
        category,
    }
}

fn envelope_from(sender: &str, text: Option<&str>) -> Envelope {
    Envelope {
        source: sender.to_string(),
        source_number: sender.to_string(),
        timestamp: 1_700_000_000_000,
        data_message: Some(DataMessage {
            message: text.map(str::to_string),
            ..Default::default()
        }),
        ..Default::default()
    }
}

async fn link_user(db: &Database, cipher: &PhoneCipher, user_id: &str, number: &str) -> i64 {
    connection::create_pending_link(db.pool(), user_id)
        .await
        .unwrap();
    let (row, _) = connection::complete_link(db.pool(), cipher, user_id, number)
        .await
        .unwrap();
    row.id
}

// ============================================================================
// Linking
// ============================================================================

#[tokio::test]
async fn link_flow_pending_then_connected() {
    let db = test_db().await;
    let gateway = MockGateway::default();
    let manager = LinkManager::new(gateway.clone(), db.clone(), test_cipher(), LinkConfig::default());

    let qr = manager.start_link("user-a").await.unwrap();
    assert!(!qr.is_empty());
    assert_eq!(manager.poll_link_status("user-a").await.unwrap(), LinkState::Pending);

    gateway.set_link_complete("+15550001234");
    let state = manager.poll_link_status("user-a").await.unwrap();
    assert_eq!(
        state,
        LinkState::Connected {
            phone_masked: "+1••••••••34".to_string()
        }
    );
}

#[tokio::test]
async fn second_user_displaces_first() {
    let db = test_db().await;
    let cipher = test_cipher();
    let gateway = MockGateway::default();
    let manager = LinkManager::new(gateway.clone(), db.clone(), cipher.clone(), LinkConfig::default());

    manager.start_link("user-a").await.unwrap();
    gateway.set_link_complete("+15550001234");
    manager.poll_link_status("user-a").await.unwrap();

    // User B claims the same number.
    manager.start_link("user-b").await.unwrap();
    let state = manager.poll_link_status("user-b").await.unwrap();
    assert!(matches!(state, LinkState::Connected { .. }));

    // A's row is purged and bannered; B resolves for the hash.
    let row_a = connection::get_by_user(db.pool(), "user-a")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row_a.status, "disconnected");
    assert!(row_a.phone_enc.is_none());
    assert!(row_a.phone_hash.is_none());

    let banners = banner::list_active(db.pool(), "user-a").await.unwrap();
    assert_eq!(banners.len(), 1);

    assert!(manager.connection_info("user-a").await.unwrap().is_none());
    let info_b = manager.connection_info("user-b").await.unwrap().unwrap();
    assert_eq!(info_b.phone_masked.as_deref(), Some("+1••••••••34"));
}

#[tokio::test]
async fn start_link_rejects_connected_and_disconnect_is_idempotent() {
    let db = test_db().await;
    let gateway = MockGateway::default();
    let manager = LinkManager::new(gateway.clone(), db.clone(), test_cipher(), LinkConfig::default());

    manager.start_link("user-a").await.unwrap();
    gateway.set_link_complete("+15550001234");
    manager.poll_link_status("user-a").await.unwrap();

    assert!(matches!(
        manager.start_link("user-a").await,
        Err(BridgeError::AlreadyLinked(_))
    ));

    manager.disconnect("user-a").await.unwrap();
    assert_eq!(manager.poll_link_status("user-a").await.unwrap(), LinkState::NotLinked);
    // Disconnecting again (or an unknown user) still succeeds.
    manager.disconnect("user-a").await.unwrap();
    manager.disconnect("stranger").await.unwrap();
}

#[tokio::test]
async fn stale_pending_link_times_out() {
    let db = test_db().await;
    let gateway = MockGateway::default();
    let manager = LinkManager::new(gateway.clone(), db.clone(), test_cipher(), LinkConfig::default());

    manager.start_link("user-a").await.unwrap();

    // Age the pending row past the timeout window.
    sqlx::query("UPDATE connections SET updated_at = datetime('now', '-10 minutes') WHERE user_id = ?")
        .bind("user-a")
        .execute(db.pool())
        .await
        .unwrap();

    assert_eq!(manager.poll_link_status("user-a").await.unwrap(), LinkState::Error);

    // The user retries: the errored row resets to pending with a fresh code.
    manager.start_link("user-a").await.unwrap();
    assert_eq!(manager.poll_link_status("user-a").await.unwrap(), LinkState::Pending);
}

// ============================================================================
// Outbound delivery
// ============================================================================

#[tokio::test]
async fn delivers_when_connected_and_mode_all() {
    let db = test_db().await;
    let cipher = test_cipher();
    let connection_id = link_user(&db, &cipher, "user-a", "+15550001234").await;

    let gateway = MockGateway::default();
    let pipeline = DeliveryPipeline::new(gateway.clone(), db.clone(), cipher, fast_delivery_config());

    let outcome = pipeline
        .deliver_now(&chat_message(MessageCategory::AssistantReply, "hi there"))
        .await
        .unwrap();
    let DeliveryOutcome::Delivered { audit_id } = outcome else {
        panic!("expected delivery, got {:?}", outcome);
    };

    let row = audit::get(db.pool(), audit_id).await.unwrap();
    assert_eq!(row.status(), Some(DeliveryStatus::Delivered));
    assert_eq!(row.connection_id, Some(connection_id));
    assert!(row.delivered_at.is_some());

    let sent = gateway.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "+15550001234");
    assert!(sent[0].1.contains("hi there"));
    assert!(sent[0].1.contains("https://app.example.com/projects/project-alpha"));
}

#[tokio::test]
async fn transient_failure_retries_then_delivers() {
    let db = test_db().await;
    let cipher = test_cipher();
    link_user(&db, &cipher, "user-a", "+15550001234").await;

    let gateway = MockGateway::default();
    gateway.fail_next_sends(2);
    let pipeline = DeliveryPipeline::new(gateway.clone(), db.clone(), cipher, fast_delivery_config());

    let outcome = pipeline
        .deliver_now(&chat_message(MessageCategory::AssistantReply, "eventually"))
        .await
        .unwrap();
    let DeliveryOutcome::Delivered { audit_id } = outcome else {
        panic!("expected delivery, got {:?}", outcome);
    };

    let row = audit::get(db.pool(), audit_id).await.unwrap();
    assert_eq!(row.status(), Some(DeliveryStatus::Delivered));
    assert_eq!(row.retry_count, 2);
    assert_eq!(gateway.sent().len(), 1);
}

#[tokio::test]
async fn four_consecutive_failures_exhaust_retries() {
    let db = test_db().await;
    let cipher = test_cipher();
    link_user(&db, &cipher, "user-a", "+15550001234").await;

    let gateway = MockGateway::default();
    gateway.fail_next_sends(4);
    let pipeline = DeliveryPipeline::new(gateway.clone(), db.clone(), cipher, fast_delivery_config());

    let outcome = pipeline
        .deliver_now(&chat_message(MessageCategory::AssistantReply, "doomed"))
        .await
        .unwrap();
    let DeliveryOutcome::Failed { audit_id, retries } = outcome else {
        panic!("expected failure, got {:?}", outcome);
    };
    assert_eq!(retries, 3);

    let row = audit::get(db.pool(), audit_id).await.unwrap();
    assert_eq!(row.status(), Some(DeliveryStatus::Failed));
    assert_eq!(row.retry_count, 3);
    assert!(row.last_error.as_deref().unwrap().contains("simulated outage"));
    assert!(gateway.sent().is_empty());
}

#[tokio::test]
async fn preference_filtering_applies() {
    let db = test_db().await;
    let cipher = test_cipher();
    link_user(&db, &cipher, "user-a", "+15550001234").await;
    connection::update_notification_mode(db.pool(), "user-a", "actions_only")
        .await
        .unwrap();

    let gateway = MockGateway::default();
    let pipeline = DeliveryPipeline::new(gateway.clone(), db.clone(), cipher, fast_delivery_config());

    let outcome = pipeline
        .deliver_now(&chat_message(MessageCategory::AssistantReply, "chit chat"))
        .await
        .unwrap();
    assert!(matches!(outcome, DeliveryOutcome::Skipped { reason: "filtered" }));
    assert!(gateway.sent().is_empty());

    let outcome = pipeline
        .deliver_now(&chat_message(MessageCategory::ActionProposal, "deploy?"))
        .await
        .unwrap();
    assert!(matches!(outcome, DeliveryOutcome::Delivered { .. }));
    assert_eq!(gateway.sent().len(), 1);
}

#[tokio::test]
async fn unlinked_user_is_silently_skipped() {
    let db = test_db().await;
    let gateway = MockGateway::default();
    let pipeline =
        DeliveryPipeline::new(gateway.clone(), db.clone(), test_cipher(), fast_delivery_config());

    let outcome = pipeline
        .deliver_now(&chat_message(MessageCategory::AssistantReply, "to nobody"))
        .await
        .unwrap();
    assert!(matches!(outcome, DeliveryOutcome::Skipped { reason: "not linked" }));
    assert!(gateway.sent().is_empty());

    // No audit row was created either.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM message_audit")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(count, 0);
}

// ============================================================================
// Inbound routing
// ============================================================================

fn listener(
    gateway: &MockGateway,
    chat: &MockChat,
    db: &Database,
) -> InboundListener<MockGateway, MockChat> {
    InboundListener::new(gateway.clone(), chat.clone(), db.clone(), ListenerConfig::default())
}

#[tokio::test]
async fn unknown_sender_gets_exactly_one_auto_reply() {
    let db = test_db().await;
    let gateway = MockGateway::default();
    let chat = MockChat::default();
    let listener = listener(&gateway, &chat, &db);

    let outcome = listener
        .process_envelope(&envelope_from("+19998887777", Some("hello?")))
        .await;
    assert!(matches!(outcome, InboundOutcome::AutoReplied { reason: "unlinked" }));

    let sent = gateway.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "+19998887777");
    assert!(sent[0].1.contains("Settings"));
    assert!(chat.messages().is_empty());

    // Only a redacted audit record exists.
    let rows: Vec<(Option<i64>, String)> =
        sqlx::query_as("SELECT connection_id, preview FROM message_audit")
            .fetch_all(db.pool())
            .await
            .unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].0.is_none());
    assert_eq!(rows[0].1, "[unlinked sender]");
}

#[tokio::test]
async fn non_text_content_gets_auto_reply() {
    let db = test_db().await;
    let cipher = test_cipher();
    link_user(&db, &cipher, "user-a", "+15550001234").await;

    let gateway = MockGateway::default();
    let chat = MockChat::default();
    let listener = listener(&gateway, &chat, &db);

    let mut envelope = envelope_from("+15550001234", None);
    envelope
        .data_message
        .as_mut()
        .unwrap()
        .attachments
        .push(signal_gateway::Attachment {
            content_type: "image/jpeg".to_string(),
            ..Default::default()
        });

    let outcome = listener.process_envelope(&envelope).await;
    assert!(matches!(outcome, InboundOutcome::AutoReplied { reason: "non-text" }));
    assert_eq!(gateway.sent()[0].1, bridge::listener::NON_TEXT_REPLY);
    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn resolved_text_forwards_to_last_active_project() {
    let db = test_db().await;
    let cipher = test_cipher();
    let connection_id = link_user(&db, &cipher, "user-a", "+15550001234").await;
    connection::update_last_active_project(db.pool(), "user-a", "project-alpha")
        .await
        .unwrap();

    let gateway = MockGateway::default();
    let chat = MockChat::default();
    let listener = listener(&gateway, &chat, &db);

    let outcome = listener
        .process_envelope(&envelope_from("+1 (555) 000-1234", Some("ship it")))
        .await;
    let InboundOutcome::Forwarded {
        user_id,
        project_id,
        chat_message_id,
    } = outcome
    else {
        panic!("expected forward, got {:?}", outcome);
    };
    assert_eq!(user_id, "user-a");
    assert_eq!(project_id, "project-alpha");

    assert_eq!(
        chat.messages(),
        vec![("user-a".to_string(), "project-alpha".to_string(), "ship it".to_string())]
    );

    let rows = audit::list_for_connection(db.pool(), connection_id, None)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].direction, "inbound");
    assert_eq!(rows[0].chat_message_id.as_deref(), Some(chat_message_id.as_str()));
    // No auto-reply for a clean forward.
    assert!(gateway.sent().is_empty());
}

#[tokio::test]
async fn project_selector_switches_and_strips_marker() {
    let db = test_db().await;
    let cipher = test_cipher();
    link_user(&db, &cipher, "user-a", "+15550001234").await;
    connection::update_last_active_project(db.pool(), "user-a", "alpha")
        .await
        .unwrap();

    let gateway = MockGateway::default();
    let chat = MockChat::default();
    let listener = listener(&gateway, &chat, &db);

    let outcome = listener
        .process_envelope(&envelope_from(
            "+15550001234",
            Some("#project-beta fix the login bug"),
        ))
        .await;
    let InboundOutcome::Forwarded { project_id, .. } = outcome else {
        panic!("expected forward, got {:?}", outcome);
    };
    assert_eq!(project_id, "project-beta");

    let messages = chat.messages();
    assert_eq!(messages[0].1, "project-beta");
    assert_eq!(messages[0].2, "fix the login bug");

    let row = connection::get_by_user(db.pool(), "user-a")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.last_active_project.as_deref(), Some("project-beta"));
}

#[tokio::test]
async fn no_project_resolvable_asks_for_selector() {
    let db = test_db().await;
    let cipher = test_cipher();
    link_user(&db, &cipher, "user-a", "+15550001234").await;

    let gateway = MockGateway::default();
    let chat = MockChat::default();
    let listener = listener(&gateway, &chat, &db);

    let outcome = listener
        .process_envelope(&envelope_from("+15550001234", Some("where does this go")))
        .await;
    assert!(matches!(outcome, InboundOutcome::AutoReplied { reason: "no project" }));
    assert_eq!(gateway.sent()[0].1, bridge::listener::NO_PROJECT_REPLY);
    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn self_and_group_envelopes_are_skipped() {
    let db = test_db().await;
    let gateway = MockGateway::default();
    let chat = MockChat::default();
    let listener = InboundListener::new(
        gateway.clone(),
        chat.clone(),
        db.clone(),
        ListenerConfig {
            own_number: Some("+15551112222".to_string()),
            ..Default::default()
        },
    );

    let outcome = listener
        .process_envelope(&envelope_from("+15551112222", Some("echo")))
        .await;
    assert!(matches!(outcome, InboundOutcome::Skipped { reason: "message from self" }));

    let mut group = envelope_from("+15550001234", Some("group chatter"));
    group.data_message.as_mut().unwrap().group_info = Some(signal_gateway::GroupInfo {
        group_id: "abc123".to_string(),
    });
    let outcome = listener.process_envelope(&group).await;
    assert!(matches!(outcome, InboundOutcome::Skipped { reason: "group message" }));

    assert!(gateway.sent().is_empty());
    assert!(chat.messages().is_empty());
}

#[tokio::test]
async fn listener_stops_on_shutdown_signal() {
    let db = test_db().await;
    let gateway = MockGateway::default();
    let chat = MockChat::default();
    let listener = listener(&gateway, &chat, &db);

    // A pending-forever stream: the shutdown arm must win.
    let stream = futures::stream::pending::<Envelope>();
    let shutdown = async {};

    tokio::time::timeout(Duration::from_secs(1), listener.run_with_shutdown(stream, shutdown))
        .await
        .expect("listener did not honor shutdown");
}
