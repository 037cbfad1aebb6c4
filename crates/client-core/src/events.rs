//! Event delivery to the application
//!
//! Events reach the application two ways:
//!
//! - **Handlers**: one optional handler per concern ([`CallEventHandler`],
//!   [`RegistrationEventHandler`], [`MessageEventHandler`],
//!   [`DiagnosticsEventHandler`]). Every method has a no-op default, so a
//!   handler only overrides what it cares about.
//! - **Broadcast**: every [`ClientEvent`] is also published on a
//!   `tokio::sync::broadcast` channel obtained from [`EventHub::subscribe`].
//!
//! Handlers are invoked on the UI context, one event at a time, in the order
//! the engine reported them.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use voipbridge_client_core::events::CallEventHandler;
//! use voipbridge_client_core::CallSession;
//!
//! struct CallScreen;
//!
//! #[async_trait]
//! impl CallEventHandler for CallScreen {
//!     async fn on_call_state_changed(&self, session: &CallSession) {
//!         println!("{} is now {}", session.remote_address.uri, session.state);
//!     }
//!
//!     async fn on_mute_state_changed(&self, muted: bool) {
//!         println!("microphone muted: {}", muted);
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use voipbridge_engine_core::{
    CallId, ChatMessage, ChatRoom, EcCalibratorStatus, LogUploadState, RegistrationState,
};

use crate::call::CallSession;
use crate::config::DEFAULT_EVENT_CHANNEL_CAPACITY;

/// Everything the client reports to the application
#[derive(Debug, Clone)]
pub enum ClientEvent {
    CallStateChanged {
        session: CallSession,
        message: String,
    },
    NewCallStarted {
        call_id: CallId,
        remote_uri: String,
    },
    CallEnded {
        session: CallSession,
    },
    PauseStateChanged {
        call_id: CallId,
        paused_locally: bool,
        paused_by_remote: bool,
    },
    CallUpdatedByRemote {
        call_id: CallId,
        video_addition_pending: bool,
    },
    MuteStateChanged {
        muted: bool,
    },
    RegistrationStateChanged {
        identity: String,
        state: RegistrationState,
        message: String,
    },
    NetworkReachabilityChanged {
        reachable: bool,
    },
    MessageReceived {
        sender: String,
        message: ChatMessage,
    },
    ComposingReceived {
        room: ChatRoom,
    },
    EchoCalibration {
        status: EcCalibratorStatus,
        delay_ms: i32,
    },
    LogUploadStatus {
        state: LogUploadState,
        info: String,
    },
    LogUploadProgress {
        percent: u8,
    },
}

impl ClientEvent {
    /// The call this event is about, if any
    pub fn call_id(&self) -> Option<CallId> {
        match self {
            ClientEvent::CallStateChanged { session, .. } | ClientEvent::CallEnded { session } => {
                Some(session.id)
            }
            ClientEvent::NewCallStarted { call_id, .. }
            | ClientEvent::PauseStateChanged { call_id, .. }
            | ClientEvent::CallUpdatedByRemote { call_id, .. } => Some(*call_id),
            _ => None,
        }
    }
}

/// Call lifecycle callbacks
#[async_trait]
pub trait CallEventHandler: Send + Sync {
    async fn on_call_state_changed(&self, _session: &CallSession) {}

    /// An outgoing call started ringing or any call got answered
    async fn on_new_call_started(&self, _call_id: CallId, _remote_uri: &str) {}

    async fn on_call_ended(&self, _session: &CallSession) {}

    async fn on_pause_state_changed(&self, _call_id: CallId, _paused_locally: bool, _paused_by_remote: bool) {}

    /// `video_addition_pending` is true when the remote party wants to add
    /// video and the update was deferred for the user to decide
    async fn on_call_updated_by_remote(&self, _call_id: CallId, _video_addition_pending: bool) {}

    async fn on_mute_state_changed(&self, _muted: bool) {}
}

#[async_trait]
pub trait RegistrationEventHandler: Send + Sync {
    async fn on_registration_state_changed(&self, _identity: &str, _state: RegistrationState, _message: &str) {}
}

/// Chat callbacks for the conversation currently on screen
#[async_trait]
pub trait MessageEventHandler: Send + Sync {
    /// SIP address (without `sip:`) of the conversation being displayed
    fn displayed_conversation(&self) -> Option<String> {
        None
    }

    async fn on_message_received(&self, _sender: &str, _message: &ChatMessage) {}

    async fn on_composing_received(&self, _room: &ChatRoom) {}
}

#[async_trait]
pub trait DiagnosticsEventHandler: Send + Sync {
    async fn on_echo_calibration_status(&self, _status: EcCalibratorStatus, _delay_ms: i32) {}

    async fn on_log_upload_status(&self, _state: LogUploadState, _info: &str) {}

    async fn on_log_upload_progress(&self, _percent: u8) {}
}

/// Handler slots plus the broadcast channel
pub struct EventHub {
    call_handler: RwLock<Option<Arc<dyn CallEventHandler>>>,
    registration_handler: RwLock<Option<Arc<dyn RegistrationEventHandler>>>,
    message_handler: RwLock<Option<Arc<dyn MessageEventHandler>>>,
    diagnostics_handler: RwLock<Option<Arc<dyn DiagnosticsEventHandler>>>,
    event_tx: broadcast::Sender<ClientEvent>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(capacity);
        Self {
            call_handler: RwLock::new(None),
            registration_handler: RwLock::new(None),
            message_handler: RwLock::new(None),
            diagnostics_handler: RwLock::new(None),
            event_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.event_tx.subscribe()
    }

    pub fn set_call_handler(&self, handler: Option<Arc<dyn CallEventHandler>>) {
        *self.call_handler.write() = handler;
    }

    pub fn set_registration_handler(&self, handler: Option<Arc<dyn RegistrationEventHandler>>) {
        *self.registration_handler.write() = handler;
    }

    pub fn set_message_handler(&self, handler: Option<Arc<dyn MessageEventHandler>>) {
        *self.message_handler.write() = handler;
    }

    pub fn set_diagnostics_handler(&self, handler: Option<Arc<dyn DiagnosticsEventHandler>>) {
        *self.diagnostics_handler.write() = handler;
    }

    /// Conversation shown by the message handler, if any
    pub fn displayed_conversation(&self) -> Option<String> {
        let handler = self.message_handler.read().clone();
        handler.and_then(|h| h.displayed_conversation())
    }

    /// Invoke the matching handler, then broadcast
    pub(crate) async fn emit(&self, event: ClientEvent) {
        match &event {
            ClientEvent::CallStateChanged { session, .. } => {
                if let Some(h) = self.call_handler() {
                    h.on_call_state_changed(session).await;
                }
            }
            ClientEvent::NewCallStarted { call_id, remote_uri } => {
                if let Some(h) = self.call_handler() {
                    h.on_new_call_started(*call_id, remote_uri).await;
                }
            }
            ClientEvent::CallEnded { session } => {
                if let Some(h) = self.call_handler() {
                    h.on_call_ended(session).await;
                }
            }
            ClientEvent::PauseStateChanged { call_id, paused_locally, paused_by_remote } => {
                if let Some(h) = self.call_handler() {
                    h.on_pause_state_changed(*call_id, *paused_locally, *paused_by_remote).await;
                }
            }
            ClientEvent::CallUpdatedByRemote { call_id, video_addition_pending } => {
                if let Some(h) = self.call_handler() {
                    h.on_call_updated_by_remote(*call_id, *video_addition_pending).await;
                }
            }
            ClientEvent::MuteStateChanged { muted } => {
                if let Some(h) = self.call_handler() {
                    h.on_mute_state_changed(*muted).await;
                }
            }
            ClientEvent::RegistrationStateChanged { identity, state, message } => {
                let handler = self.registration_handler.read().clone();
                if let Some(h) = handler {
                    h.on_registration_state_changed(identity, *state, message).await;
                }
            }
            ClientEvent::NetworkReachabilityChanged { .. } => {}
            ClientEvent::MessageReceived { sender, message } => {
                let handler = self.message_handler.read().clone();
                if let Some(h) = handler {
                    h.on_message_received(sender, message).await;
                }
            }
            ClientEvent::ComposingReceived { room } => {
                let handler = self.message_handler.read().clone();
                if let Some(h) = handler {
                    h.on_composing_received(room).await;
                }
            }
            ClientEvent::EchoCalibration { status, delay_ms } => {
                if let Some(h) = self.diagnostics_handler() {
                    h.on_echo_calibration_status(*status, *delay_ms).await;
                }
            }
            ClientEvent::LogUploadStatus { state, info } => {
                if let Some(h) = self.diagnostics_handler() {
                    h.on_log_upload_status(*state, info).await;
                }
            }
            ClientEvent::LogUploadProgress { percent } => {
                if let Some(h) = self.diagnostics_handler() {
                    h.on_log_upload_progress(*percent).await;
                }
            }
        }

        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn call_handler(&self) -> Option<Arc<dyn CallEventHandler>> {
        self.call_handler.read().clone()
    }

    fn diagnostics_handler(&self) -> Option<Arc<dyn DiagnosticsEventHandler>> {
        self.diagnostics_handler.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct MuteWatcher {
        muted: AtomicBool,
    }

    #[async_trait]
    impl CallEventHandler for MuteWatcher {
        async fn on_mute_state_changed(&self, muted: bool) {
            self.muted.store(muted, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_handler_and_subscribers() {
        let hub = EventHub::default();
        let watcher = Arc::new(MuteWatcher::default());
        hub.set_call_handler(Some(watcher.clone()));
        let mut rx = hub.subscribe();

        hub.emit(ClientEvent::MuteStateChanged { muted: true }).await;

        assert!(watcher.muted.load(Ordering::SeqCst));
        match rx.recv().await.unwrap() {
            ClientEvent::MuteStateChanged { muted } => assert!(muted),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_emit_without_handlers_or_subscribers() {
        let hub = EventHub::new(4);
        hub.emit(ClientEvent::NetworkReachabilityChanged { reachable: false }).await;
        assert_eq!(hub.displayed_conversation(), None);
    }
}
