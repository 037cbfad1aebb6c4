//! Data carried across the engine host boundary
//!
//! These are plain snapshots: the engine owns the live objects, the UI side
//! only ever sees copies taken at notification or query time.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a call inside the engine
pub type CallId = Uuid;

/// Identifier of a launched engine host process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostId(pub u32);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallDirection {
    Incoming,
    Outgoing,
}

/// Call states as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    /// Outgoing call is in progress (INVITE sent)
    OutgoingProgress,
    /// Incoming call is ringing
    IncomingReceived,
    /// Call was answered
    Connected,
    /// Media streams are flowing
    StreamsRunning,
    /// Call was paused locally
    Paused,
    /// Call was paused by the remote party
    PausedByRemote,
    /// Remote party asked to modify the session
    UpdatedByRemote,
    /// Call ended normally
    CallEnd,
    /// Call ended with an error
    Error,
    /// Call object released by the engine
    Released,
}

impl CallState {
    /// States a new call is first reported in
    pub fn is_start(&self) -> bool {
        matches!(self, CallState::OutgoingProgress | CallState::IncomingReceived)
    }

    /// States where the call has been answered and not yet ended
    pub fn is_established(&self) -> bool {
        matches!(
            self,
            CallState::Connected
                | CallState::StreamsRunning
                | CallState::Paused
                | CallState::PausedByRemote
                | CallState::UpdatedByRemote
        )
    }

    /// CallEnd, Error or Released
    pub fn is_terminated(&self) -> bool {
        matches!(self, CallState::CallEnd | CallState::Error | CallState::Released)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Reason attached to a call termination or registration failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    None,
    NoResponse,
    Forbidden,
    Declined,
    NotFound,
    NotAnswered,
    Busy,
    NotAcceptable,
    Media,
    IoError,
    Unknown,
}

/// Registration state of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrationState {
    None,
    Progress,
    Ok,
    Cleared,
    Failed,
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RegistrationState::None => "None",
            RegistrationState::Progress => "In progress",
            RegistrationState::Ok => "Registered",
            RegistrationState::Cleared => "Cleared",
            RegistrationState::Failed => "Failed",
        };
        write!(f, "{}", text)
    }
}

/// Remote party of a call or call log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAddress {
    /// Full URI, e.g. `sip:bob@example.com`
    pub uri: String,
    /// User part of the URI
    pub username: String,
    /// Display name, if the engine knows one
    pub display_name: Option<String>,
}

impl RemoteAddress {
    pub fn new(uri: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            username: username.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Display name if present and non-empty
    pub fn known_display_name(&self) -> Option<&str> {
        self.display_name.as_deref().filter(|name| !name.is_empty())
    }
}

/// Negotiable parameters of a call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallParams {
    pub video_enabled: bool,
}

/// Copy of an engine call at notification or query time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSnapshot {
    pub id: CallId,
    pub direction: CallDirection,
    pub remote: RemoteAddress,
    pub state: CallState,
    pub reason: Reason,
    pub camera_enabled: bool,
    pub current_params: CallParams,
    /// Parameters proposed by the remote party, when known
    pub remote_params: Option<CallParams>,
}

impl CallSnapshot {
    pub fn new(direction: CallDirection, remote: RemoteAddress, state: CallState) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            remote,
            state,
            reason: Reason::None,
            camera_enabled: false,
            current_params: CallParams::default(),
            remote_params: None,
        }
    }

    /// Same call, moved to another state
    pub fn with_state(&self, state: CallState) -> Self {
        Self { state, ..self.clone() }
    }

    pub fn with_reason(mut self, reason: Reason) -> Self {
        self.reason = reason;
        self
    }
}

/// Engine-side video automation policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoPolicy {
    pub automatically_initiate: bool,
    pub automatically_accept: bool,
}

/// The engine's default account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub identity: String,
    pub state: RegistrationState,
    pub error: Reason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlobalState {
    Off,
    Startup,
    On,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EcCalibratorStatus {
    InProgress,
    Done,
    Failed,
    DoneNoEcho,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogUploadState {
    InProgress,
    Delivered,
    NotDelivered,
}

/// A chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRoom {
    pub peer_uri: String,
}

/// A received chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from_uri: String,
    pub text: Option<String>,
    /// Set for file transfers (images)
    pub external_body_url: Option<String>,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallLogStatus {
    Success,
    Aborted,
    Missed,
    Declined,
}

/// One entry of the engine's call history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallLogRecord {
    pub id: Uuid,
    pub direction: CallDirection,
    pub from: RemoteAddress,
    pub to: RemoteAddress,
    pub status: CallLogStatus,
    pub start_date: DateTime<Utc>,
}

/// Verbosity of the engine's own logger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineLogLevel {
    Error,
    Warning,
    #[default]
    Message,
    Debug,
}

/// Everything the engine needs to create its core
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreSetup {
    pub config_path: PathBuf,
    pub factory_config_path: PathBuf,
    pub chat_database_path: PathBuf,
    pub root_ca_path: PathBuf,
    pub log_level: EngineLogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_state_groups() {
        assert!(CallState::OutgoingProgress.is_start());
        assert!(CallState::IncomingReceived.is_start());
        assert!(!CallState::Connected.is_start());

        assert!(CallState::UpdatedByRemote.is_established());
        assert!(!CallState::OutgoingProgress.is_established());

        assert!(CallState::Released.is_terminated());
        assert!(!CallState::Paused.is_terminated());
    }

    #[test]
    fn test_known_display_name_ignores_empty() {
        let address = RemoteAddress::new("sip:bob@example.com", "bob");
        assert_eq!(address.known_display_name(), None);

        let address = address.with_display_name("");
        assert_eq!(address.known_display_name(), None);

        let address = address.with_display_name("Bob");
        assert_eq!(address.known_display_name(), Some("Bob"));
    }
}
