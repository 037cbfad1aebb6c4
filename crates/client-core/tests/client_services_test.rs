//! Contact resolution, registration, network and messaging through the client

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use common::{GatedDirectory, Harness, drain, incoming, init_tracing, wait_until};
use voipbridge_client_core::{
    ClientEvent, Contact, MessageEventHandler, NetworkStatus, NotificationAction,
    NotificationCategory, TunnelPolicy,
};
use voipbridge_engine_core::mock::EngineCommand;
use voipbridge_engine_core::{
    AccountSnapshot, ChatMessage, ChatRoom, EngineNotification, Reason, RegistrationState,
};

fn alice() -> Contact {
    Contact {
        display_name: "Alice".into(),
        address: "alice@example.com".into(),
    }
}

async fn with_directory(directory: Arc<GatedDirectory>) -> Harness {
    let (builder, host, notifier, settings) = Harness::builder();
    let harness = Harness::from_builder(
        builder.contact_directory(directory),
        host,
        notifier,
        settings,
    );
    harness.client.start().await.unwrap();
    harness.engine.clear_commands();
    harness
}

fn display_name_updates(harness: &Harness) -> Vec<EngineCommand> {
    harness.commands_matching(|c| matches!(c, EngineCommand::SetRemoteDisplayName { .. }))
}

#[tokio::test]
async fn test_contact_lookup_names_current_call_once() {
    init_tracing();
    let directory = Arc::new(GatedDirectory::new(vec![alice()]));
    let harness = with_directory(directory.clone()).await;

    let call = incoming("alice");
    harness.engine.set_current_call(Some(call.id));
    harness.report(&call).await;

    assert!(wait_until(&harness.client, || directory.lookups().len() == 1).await);
    assert_eq!(directory.lookups(), vec!["alice@example.com".to_string()]);
    assert!(display_name_updates(&harness).is_empty());

    directory.open();
    assert!(wait_until(&harness.client, || !display_name_updates(&harness).is_empty()).await);
    harness.client.flush().await.unwrap();

    assert_eq!(
        display_name_updates(&harness),
        vec![EngineCommand::SetRemoteDisplayName {
            call_id: call.id,
            display_name: "Alice".into(),
        }]
    );
    let session = harness.client.session(call.id).await.unwrap().unwrap();
    assert_eq!(session.label(), "Alice");
}

#[tokio::test]
async fn test_newer_call_supersedes_pending_lookup() {
    let directory = Arc::new(GatedDirectory::new(vec![alice()]));
    let harness = with_directory(directory.clone()).await;

    let first = incoming("alice");
    harness.report(&first).await;
    assert!(wait_until(&harness.client, || directory.lookups().len() == 1).await);

    let second = incoming("bob");
    harness.engine.set_current_call(Some(second.id));
    harness.report(&second).await;
    assert!(wait_until(&harness.client, || directory.lookups().len() == 2).await);

    // Only the lookup for bob is still waiting, and bob is unknown
    directory.open();
    for _ in 0..5 {
        harness.client.flush().await.unwrap();
        tokio::task::yield_now().await;
    }
    assert!(display_name_updates(&harness).is_empty());
}

#[tokio::test]
async fn test_forbidden_registration_notifies() {
    let harness = Harness::started().await;
    let mut events = harness.client.subscribe_events();

    let account = AccountSnapshot {
        identity: "sip:me@example.com".into(),
        state: RegistrationState::Failed,
        error: Reason::Forbidden,
    };
    harness.engine.emit(EngineNotification::RegistrationState {
        account: Some(account),
        state: RegistrationState::Failed,
        message: "Forbidden".into(),
    });
    harness.client.flush().await.unwrap();

    let shown = harness.notifier.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].category, NotificationCategory::RegistrationError);
    assert!(drain(&mut events).iter().any(|e| matches!(
        e,
        ClientEvent::RegistrationStateChanged { state: RegistrationState::Failed, .. }
    )));

    let records = harness.client.registration_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].last_error, Some(Reason::Forbidden));
}

#[tokio::test]
async fn test_other_registration_failure_is_silent() {
    let harness = Harness::started().await;
    harness.engine.emit(EngineNotification::RegistrationState {
        account: Some(AccountSnapshot {
            identity: "sip:me@example.com".into(),
            state: RegistrationState::Failed,
            error: Reason::NoResponse,
        }),
        state: RegistrationState::Failed,
        message: "Timeout".into(),
    });
    harness.client.flush().await.unwrap();

    assert!(harness.notifier.shown().is_empty());
    assert_eq!(
        harness.client.last_known_registration_state().await.unwrap(),
        Some(RegistrationState::Failed)
    );

    harness.engine.set_default_account(Some(AccountSnapshot {
        identity: "sip:me@example.com".into(),
        state: RegistrationState::Ok,
        error: Reason::None,
    }));
    assert_eq!(
        harness.client.last_known_registration_state().await.unwrap(),
        Some(RegistrationState::Ok)
    );
}

#[tokio::test]
async fn test_network_changes_are_debounced() {
    let harness = Harness::started().await;
    let mut events = harness.client.subscribe_events();
    let reachability = |h: &Harness| {
        h.commands_matching(|c| matches!(c, EngineCommand::SetNetworkReachable(_)))
    };

    // Same reachability as at start
    harness.client.network_changed(NetworkStatus::cellular()).unwrap();
    harness.client.flush().await.unwrap();
    assert!(reachability(&harness).is_empty());

    harness.client.network_changed(NetworkStatus::offline()).unwrap();
    harness.client.network_changed(NetworkStatus::offline()).unwrap();
    harness.client.flush().await.unwrap();
    assert_eq!(reachability(&harness), vec![EngineCommand::SetNetworkReachable(false)]);
    assert!(!harness.client.is_network_reachable().await.unwrap());

    let changes: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, ClientEvent::NetworkReachabilityChanged { .. }))
        .collect();
    assert_eq!(changes.len(), 1);
}

#[tokio::test]
async fn test_tunnel_policy_applied_when_network_returns() {
    let harness = Harness::started().await;
    harness.engine.set_tunnel_available(true);
    harness.settings.set_tunnel_policy(TunnelPolicy::Always);

    harness.client.network_changed(NetworkStatus::offline()).unwrap();
    harness.client.network_changed(NetworkStatus::wifi()).unwrap();
    harness.client.flush().await.unwrap();

    assert_eq!(
        harness.engine.commands(),
        vec![
            EngineCommand::SetNetworkReachable(false),
            EngineCommand::TunnelEnable(true),
            EngineCommand::SetNetworkReachable(true),
        ]
    );
}

#[derive(Default)]
struct ConversationScreen {
    received: Mutex<Vec<String>>,
}

#[async_trait]
impl MessageEventHandler for ConversationScreen {
    fn displayed_conversation(&self) -> Option<String> {
        Some("alice@example.com".into())
    }

    async fn on_message_received(&self, sender: &str, _message: &ChatMessage) {
        self.received.lock().push(sender.to_string());
    }
}

fn message_from(uri: &str) -> EngineNotification {
    EngineNotification::MessageReceived {
        room: ChatRoom {
            peer_uri: uri.to_string(),
        },
        message: ChatMessage {
            from_uri: uri.to_string(),
            text: Some("hello".into()),
            external_body_url: None,
            time: Utc::now(),
        },
    }
}

#[tokio::test]
async fn test_messages_route_to_screen_or_notification() {
    let harness = Harness::started().await;
    let screen = Arc::new(ConversationScreen::default());
    harness
        .client
        .events()
        .set_message_handler(Some(screen.clone()));

    harness.engine.emit(message_from("sip:alice@example.com"));
    harness.engine.emit(message_from("sip:bob@example.com"));
    harness.client.flush().await.unwrap();

    assert_eq!(*screen.received.lock(), vec!["alice@example.com".to_string()]);

    let shown = harness.notifier.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].category, NotificationCategory::MessageReceived);
    assert_eq!(shown[0].message, "hello");
    assert_eq!(
        shown[0].action,
        Some(NotificationAction::OpenConversation {
            sip_address: "bob@example.com".into()
        })
    );
}
