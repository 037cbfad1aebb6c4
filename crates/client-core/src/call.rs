//! Call sessions and the call state machine
//!
//! A [`CallSession`] is the UI-side view of one engine call. It is created
//! from the first notification in a start state and removed once the engine
//! reports `Released`.
//!
//! ```text
//!  OutgoingProgress ─┐
//!                    ├─> Connected ─> StreamsRunning <─┬─> Paused
//!  IncomingReceived ─┘                 │   ^           └─> PausedByRemote
//!                                      v   │
//!                                  UpdatedByRemote
//!
//!  any non-terminal ─> CallEnd | Error ─> Released
//! ```
//!
//! `UpdatedByRemote` is reachable from every established state and returns
//! to `StreamsRunning`, `Paused` or `PausedByRemote`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use voipbridge_engine_core::{CallDirection, CallId, CallSnapshot, CallState, Reason, RemoteAddress};

/// UI-side state of one call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSession {
    pub id: CallId,
    pub direction: CallDirection,
    pub remote_address: RemoteAddress,
    /// Resolved display name (engine-supplied or from the contact directory)
    pub display_name: Option<String>,
    pub state: CallState,
    pub video_enabled: bool,
    pub paused_locally: bool,
    pub paused_remotely: bool,
    pub termination_reason: Option<Reason>,
    pub created_at: DateTime<Utc>,
    /// Ordering of local pauses, used to find the most recently held call
    pub(crate) pause_sequence: u64,
}

impl CallSession {
    pub fn from_snapshot(snapshot: &CallSnapshot) -> Self {
        Self {
            id: snapshot.id,
            direction: snapshot.direction,
            remote_address: snapshot.remote.clone(),
            display_name: snapshot.remote.known_display_name().map(str::to_string),
            state: snapshot.state,
            video_enabled: snapshot.current_params.video_enabled,
            paused_locally: snapshot.state == CallState::Paused,
            paused_remotely: snapshot.state == CallState::PausedByRemote,
            termination_reason: None,
            created_at: Utc::now(),
            pause_sequence: 0,
        }
    }

    /// Display name, falling back to the user name
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .unwrap_or(&self.remote_address.username)
    }

    pub fn is_paused(&self) -> bool {
        self.paused_locally || self.paused_remotely
    }

    pub(crate) fn set_display_name(&mut self, display_name: &str) {
        self.display_name = Some(display_name.to_string());
        self.remote_address.display_name = Some(display_name.to_string());
    }
}

/// Whether the engine may move a call from `from` to `to`
pub fn is_valid_transition(from: CallState, to: CallState) -> bool {
    use CallState::*;

    match (from, to) {
        (Released, _) => false,
        (CallEnd | Error, Released) => true,
        (_, Released) => false,
        (CallEnd | Error, _) => false,
        (_, CallEnd | Error) => true,
        (OutgoingProgress | IncomingReceived, Connected) => true,
        (Connected, StreamsRunning) => true,
        (StreamsRunning, StreamsRunning | Paused | PausedByRemote) => true,
        (Paused | PausedByRemote, StreamsRunning) => true,
        (Connected | StreamsRunning | Paused | PausedByRemote, UpdatedByRemote) => true,
        (UpdatedByRemote, StreamsRunning | Paused | PausedByRemote) => true,
        _ => false,
    }
}
