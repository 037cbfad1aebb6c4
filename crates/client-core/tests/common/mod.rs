//! Shared fixtures for client-core integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, broadcast};
use voipbridge_client_core::{
    ClientBuilder, ClientEvent, ClientManager, Contact, ContactDirectory, MemorySettings,
    NotificationId, UserNotification, UserNotifier,
};
use voipbridge_engine_core::mock::{EngineCommand, MockEngine, MockEngineHost, ReadyBehavior};
use voipbridge_engine_core::{CallDirection, CallSnapshot, CallState, RemoteAddress};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("voipbridge_client_core=debug,voipbridge_engine_core=debug")
        .with_test_writer()
        .try_init();
}

/// Notifier that keeps everything it was asked to show
#[derive(Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<UserNotification>>,
    dismissed: Mutex<Vec<NotificationId>>,
}

impl RecordingNotifier {
    pub fn shown(&self) -> Vec<UserNotification> {
        self.shown.lock().clone()
    }

    pub fn dismissed(&self) -> Vec<NotificationId> {
        self.dismissed.lock().clone()
    }
}

impl UserNotifier for RecordingNotifier {
    fn show(&self, notification: &UserNotification) -> NotificationId {
        let mut shown = self.shown.lock();
        shown.push(notification.clone());
        shown.len() as NotificationId
    }

    fn dismiss(&self, id: NotificationId) {
        self.dismissed.lock().push(id);
    }
}

/// Directory that answers only once the test opens the gate
pub struct GatedDirectory {
    contacts: Vec<Contact>,
    gate: Notify,
    lookups: Mutex<Vec<String>>,
}

impl GatedDirectory {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self {
            contacts,
            gate: Notify::new(),
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Let one pending or future lookup through
    pub fn open(&self) {
        self.gate.notify_one();
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().clone()
    }
}

#[async_trait]
impl ContactDirectory for GatedDirectory {
    async fn find_contact(&self, address: &str) -> Option<Contact> {
        self.lookups.lock().push(address.to_string());
        self.gate.notified().await;
        self.contacts.iter().find(|c| c.address == address).cloned()
    }
}

pub struct Harness {
    pub client: Arc<ClientManager>,
    pub host: Arc<MockEngineHost>,
    pub engine: Arc<MockEngine>,
    pub notifier: Arc<RecordingNotifier>,
    pub settings: Arc<MemorySettings>,
}

impl Harness {
    pub fn builder() -> (ClientBuilder, Arc<MockEngineHost>, Arc<RecordingNotifier>, Arc<MemorySettings>) {
        let host = Arc::new(MockEngineHost::new(ReadyBehavior::Immediate));
        let notifier = Arc::new(RecordingNotifier::default());
        let settings = Arc::new(MemorySettings::new());
        let builder = ClientBuilder::new()
            .engine_host(host.clone())
            .notifier(notifier.clone())
            .settings(settings.clone())
            .handshake_timeout(Duration::from_millis(500));
        (builder, host, notifier, settings)
    }

    pub fn from_builder(
        builder: ClientBuilder,
        host: Arc<MockEngineHost>,
        notifier: Arc<RecordingNotifier>,
        settings: Arc<MemorySettings>,
    ) -> Self {
        let client = builder.build().expect("client builds");
        Self {
            engine: host.engine(),
            client,
            host,
            notifier,
            settings,
        }
    }

    /// A client that is not started yet
    pub fn new() -> Self {
        let (builder, host, notifier, settings) = Self::builder();
        Self::from_builder(builder, host, notifier, settings)
    }

    /// A started client with an empty command log
    pub async fn started() -> Self {
        let harness = Self::new();
        harness.client.start().await.expect("client starts");
        harness.engine.clear_commands();
        harness
    }

    /// Report `call` from the engine and wait until the client processed it
    pub async fn report(&self, call: &CallSnapshot) {
        assert!(self.engine.report_call(call.clone()), "listener attached");
        self.client.flush().await.expect("flush");
    }

    /// Walk `call` through `states`, returning the last snapshot
    pub async fn walk(&self, call: &CallSnapshot, states: &[CallState]) -> CallSnapshot {
        let mut current = call.clone();
        for state in states {
            current = current.with_state(*state);
            self.report(&current).await;
        }
        current
    }

    /// An outgoing call, already reported as established and current
    pub async fn established_call(&self, username: &str) -> CallSnapshot {
        let call = outgoing(username);
        self.report(&call).await;
        self.engine.set_current_call(Some(call.id));
        self.walk(&call, &[CallState::Connected, CallState::StreamsRunning])
            .await
    }

    pub fn commands_matching(&self, predicate: impl Fn(&EngineCommand) -> bool) -> Vec<EngineCommand> {
        self.engine
            .commands()
            .into_iter()
            .filter(|c| predicate(c))
            .collect()
    }
}

pub fn outgoing(username: &str) -> CallSnapshot {
    CallSnapshot::new(
        CallDirection::Outgoing,
        RemoteAddress::new(format!("sip:{username}@example.com"), username),
        CallState::OutgoingProgress,
    )
}

pub fn incoming(username: &str) -> CallSnapshot {
    CallSnapshot::new(
        CallDirection::Incoming,
        RemoteAddress::new(format!("sip:{username}@example.com"), username),
        CallState::IncomingReceived,
    )
}

/// Poll `condition` between flushes until it holds or two seconds pass
pub async fn wait_until(client: &ClientManager, mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        client.flush().await.expect("flush");
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

/// Everything broadcast so far
pub fn drain(events: &mut broadcast::Receiver<ClientEvent>) -> Vec<ClientEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}
