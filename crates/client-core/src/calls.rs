//! Call session controller
//!
//! Applies engine call notifications to [`CallSession`]s and executes call
//! commands against the live engine. Runs exclusively on the UI context.
//!
//! Per-state side effects of an accepted notification:
//!
//! | State                    | Effect                                         |
//! |--------------------------|------------------------------------------------|
//! | OutgoingProgress         | contact lookup, `new-call-started`             |
//! | IncomingReceived         | contact lookup                                 |
//! | Connected                | `new-call-started`                             |
//! | Paused / PausedByRemote  | `pause-state-changed`                          |
//! | StreamsRunning           | `pause-state-changed(false, false)`            |
//! | UpdatedByRemote          | video deferral, `call-updated-by-remote`       |
//! | CallEnd / Error          | `call-ended`, termination message              |
//! | Released                 | session removed                                |
//!
//! Every accepted notification ends with `call-state-changed`. Notifications
//! that break the transition table are dropped with a warning.

use std::collections::HashMap;

use futures::future::try_join_all;
use tracing::{debug, info, warn};
use voipbridge_engine_core::{
    CallDirection, CallId, CallParams, CallSnapshot, CallState, EngineHandle, Reason,
};

use crate::call::{CallSession, is_valid_transition};
use crate::contacts::ContactResolutionBridge;
use crate::dispatcher::Services;
use crate::error::{ClientError, ClientResult};
use crate::events::ClientEvent;
use crate::messages::{MessageCatalog, MessageKey, with_address};
use crate::notifications::{NotificationCategory, UserNotification};

/// Suffix of the front-facing capture device name
pub const FRONT_CAMERA_SUFFIX: &str = "Front";
/// Suffix of the back-facing capture device name
pub const BACK_CAMERA_SUFFIX: &str = "Back";

/// Commands accepted by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallCommand {
    /// Place a call; the session appears with the engine's first notification
    Invite(String),
    /// End the current call, or every locally paused call if there is none
    Terminate,
    SetMicMuted(bool),
    /// Pause the current call, or resume the most recently paused one
    SetHold(bool),
    /// Switch to the other capture device
    ToggleCamera,
    SetVideoEnabled(bool),
    /// Answer a deferred remote video addition
    AcceptVideoUpdate { call_id: CallId, accept: bool },
}

/// Message shown to the user when a call ends for `reason`
///
/// `None` for normal endings and unanswered calls. Declined calls are only
/// reported to the caller.
pub fn termination_message(
    catalog: &dyn MessageCatalog,
    reason: Reason,
    direction: CallDirection,
    username: &str,
) -> Option<String> {
    let key = match reason {
        Reason::None | Reason::NotAnswered => return None,
        Reason::Declined if direction == CallDirection::Incoming => return None,
        Reason::Declined => MessageKey::CallDeclined,
        Reason::NotFound => MessageKey::CallNotFound,
        Reason::Busy => MessageKey::CallBusy,
        Reason::NotAcceptable => MessageKey::CallNotAcceptable,
        Reason::Forbidden => MessageKey::CallForbidden,
        Reason::NoResponse | Reason::Media | Reason::IoError | Reason::Unknown => {
            MessageKey::CallUnknownError
        }
    };
    Some(with_address(&catalog.get(key), username))
}

fn find_camera<'a>(devices: &'a [String], suffix: &str) -> Option<&'a str> {
    devices
        .iter()
        .map(String::as_str)
        .find(|device| device.ends_with(suffix))
}

/// The device to switch to from `current`
///
/// Swaps front and back when both exist, otherwise cycles through the list.
pub fn next_camera(devices: &[String], current: Option<&str>) -> Option<String> {
    if devices.len() < 2 {
        return None;
    }
    match (
        find_camera(devices, FRONT_CAMERA_SUFFIX),
        find_camera(devices, BACK_CAMERA_SUFFIX),
    ) {
        (Some(front), Some(back)) => {
            let target = if current == Some(front) { back } else { front };
            Some(target.to_string())
        }
        _ => {
            let next = current
                .and_then(|current| devices.iter().position(|device| device == current))
                .map(|index| (index + 1) % devices.len())
                .unwrap_or(0);
            Some(devices[next].clone())
        }
    }
}

/// Owns every [`CallSession`]
#[derive(Debug, Default)]
pub struct CallSessionController {
    sessions: HashMap<CallId, CallSession>,
    pause_counter: u64,
    mic_muted: bool,
}

impl CallSessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sessions(&self) -> Vec<CallSession> {
        let mut sessions: Vec<_> = self.sessions.values().cloned().collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }

    pub fn session(&self, call_id: CallId) -> Option<&CallSession> {
        self.sessions.get(&call_id)
    }

    pub fn is_mic_muted(&self) -> bool {
        self.mic_muted
    }

    /// Adopt the calls the engine already has, without emitting events
    pub(crate) async fn sync_from_engine(&mut self, engine: &EngineHandle) -> ClientResult<()> {
        self.sessions = engine
            .calls()
            .await?
            .iter()
            .map(|call| (call.id, CallSession::from_snapshot(call)))
            .collect();
        if !self.sessions.is_empty() {
            info!(count = self.sessions.len(), "Adopted existing calls");
        }
        Ok(())
    }

    pub(crate) fn apply_display_name(&mut self, call_id: CallId, display_name: &str) {
        if let Some(session) = self.sessions.get_mut(&call_id) {
            session.set_display_name(display_name);
        }
    }

    /// Apply one engine call-state notification
    pub(crate) async fn on_call_state(
        &mut self,
        engine: &EngineHandle,
        services: &Services,
        contacts: &mut ContactResolutionBridge,
        snapshot: CallSnapshot,
        message: String,
    ) -> ClientResult<()> {
        let call_id = snapshot.id;
        let state = snapshot.state;

        match self.sessions.get(&call_id) {
            Some(session) if !is_valid_transition(session.state, state) => {
                warn!(call_id = %call_id, from = %session.state, to = %state,
                    "Rejecting invalid call state transition");
                return Ok(());
            }
            None if !state.is_start() => {
                warn!(call_id = %call_id, state = %state, "Ignoring state of unknown call");
                return Ok(());
            }
            _ => {}
        }
        info!(call_id = %call_id, state = %state, "{}", message);

        let current = {
            let session = self
                .sessions
                .entry(call_id)
                .or_insert_with(|| CallSession::from_snapshot(&snapshot));
            session.state = state;
            session.video_enabled = snapshot.current_params.video_enabled;
            if let Some(name) = snapshot.remote.known_display_name() {
                session.set_display_name(name);
            }

            match state {
                CallState::Paused | CallState::PausedByRemote => {
                    let by_remote = state == CallState::PausedByRemote;
                    session.paused_locally = !by_remote;
                    session.paused_remotely = by_remote;
                    if !by_remote {
                        self.pause_counter += 1;
                        session.pause_sequence = self.pause_counter;
                    }
                }
                CallState::StreamsRunning => {
                    session.paused_locally = false;
                    session.paused_remotely = false;
                }
                CallState::CallEnd | CallState::Error => {
                    session.termination_reason = Some(snapshot.reason);
                }
                _ => {}
            }
            session.clone()
        };

        let hub = &services.hub;
        match state {
            CallState::OutgoingProgress => {
                contacts.request(&snapshot.remote);
                hub.emit(ClientEvent::NewCallStarted {
                    call_id,
                    remote_uri: snapshot.remote.uri.clone(),
                })
                .await;
            }
            CallState::IncomingReceived => {
                contacts.request(&snapshot.remote);
            }
            CallState::Connected => {
                hub.emit(ClientEvent::NewCallStarted {
                    call_id,
                    remote_uri: snapshot.remote.uri.clone(),
                })
                .await;
            }
            CallState::Paused | CallState::PausedByRemote | CallState::StreamsRunning => {
                hub.emit(ClientEvent::PauseStateChanged {
                    call_id,
                    paused_locally: current.paused_locally,
                    paused_by_remote: current.paused_remotely,
                })
                .await;
            }
            CallState::UpdatedByRemote => {
                let video_addition_pending = Self::defer_video_addition(engine, &snapshot)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(call_id = %call_id, error = %e, "Failed to defer remote video addition");
                        false
                    });
                hub.emit(ClientEvent::CallUpdatedByRemote {
                    call_id,
                    video_addition_pending,
                })
                .await;
            }
            CallState::CallEnd | CallState::Error => {
                hub.emit(ClientEvent::CallEnded {
                    session: current.clone(),
                })
                .await;
                Self::report_termination(services, &current);
            }
            CallState::Released => {
                self.sessions.remove(&call_id);
                debug!(call_id = %call_id, "Call session released");
            }
        }

        hub.emit(ClientEvent::CallStateChanged {
            session: current,
            message,
        })
        .await;
        Ok(())
    }

    /// Defer a remote update that adds video, unless policy accepts it
    async fn defer_video_addition(engine: &EngineHandle, snapshot: &CallSnapshot) -> ClientResult<bool> {
        let remote_video = snapshot.remote_params.map(|p| p.video_enabled).unwrap_or(false);
        let local_video = snapshot.current_params.video_enabled;
        if !remote_video || local_video {
            return Ok(false);
        }

        let policy = engine.video_policy().await?;
        if policy.automatically_accept || engine.is_in_conference().await? {
            return Ok(false);
        }

        engine.defer_call_update(snapshot.id).await?;
        info!(call_id = %snapshot.id, "Deferred remote video addition");
        Ok(true)
    }

    fn report_termination(services: &Services, session: &CallSession) {
        let reason = session.termination_reason.unwrap_or(Reason::None);
        let Some(message) = termination_message(
            services.catalog.as_ref(),
            reason,
            session.direction,
            &session.remote_address.username,
        ) else {
            return;
        };

        info!(call_id = %session.id, ?reason, "Call terminated with error");
        let title = services.catalog.get(MessageKey::CallErrorTitle);
        services.notifications.replace(UserNotification::new(
            NotificationCategory::CallError,
            title,
            message,
        ));
    }

    /// Execute a command; returns whether it had an effect
    pub(crate) async fn execute(
        &mut self,
        engine: &EngineHandle,
        services: &Services,
        command: CallCommand,
    ) -> ClientResult<bool> {
        debug!(?command, "Executing call command");
        match command {
            CallCommand::Invite(address) => {
                info!(address = %address, "Placing call");
                engine.invite(&address).await?;
                Ok(true)
            }
            CallCommand::Terminate => self.terminate(engine).await,
            CallCommand::SetMicMuted(muted) => self.set_mic_muted(engine, services, muted).await,
            CallCommand::SetHold(hold) => self.set_hold(engine, hold).await,
            CallCommand::ToggleCamera => self.toggle_camera(engine).await,
            CallCommand::SetVideoEnabled(enable) => self.set_video_enabled(engine, enable).await,
            CallCommand::AcceptVideoUpdate { call_id, accept } => {
                self.accept_video_update(engine, call_id, accept).await
            }
        }
    }

    async fn terminate(&self, engine: &EngineHandle) -> ClientResult<bool> {
        if let Some(call) = engine.current_call().await? {
            info!(call_id = %call.id, "Terminating current call");
            engine.terminate_call(call.id).await?;
            return Ok(true);
        }

        let paused: Vec<CallId> = engine
            .calls()
            .await?
            .into_iter()
            .filter(|call| call.state == CallState::Paused)
            .map(|call| call.id)
            .collect();
        if paused.is_empty() {
            debug!("No call to terminate");
            return Ok(false);
        }

        info!(count = paused.len(), "Terminating paused calls");
        try_join_all(paused.iter().map(|id| engine.terminate_call(*id))).await?;
        Ok(true)
    }

    async fn set_mic_muted(&mut self, engine: &EngineHandle, services: &Services, muted: bool) -> ClientResult<bool> {
        if engine.calls_count().await? == 0 {
            debug!(muted, "No call, ignoring mute request");
            return Ok(false);
        }
        engine.set_mic_muted(muted).await?;
        self.mic_muted = muted;
        services.hub.emit(ClientEvent::MuteStateChanged { muted }).await;
        Ok(true)
    }

    async fn set_hold(&self, engine: &EngineHandle, hold: bool) -> ClientResult<bool> {
        if hold {
            if engine.calls_count().await? == 0 {
                return Ok(false);
            }
            let Some(call) = engine.current_call().await? else {
                debug!("No current call to hold");
                return Ok(false);
            };
            info!(call_id = %call.id, "Holding call");
            engine.pause_call(call.id).await?;
            return Ok(true);
        }

        let Some(session) = self
            .sessions
            .values()
            .filter(|s| s.state == CallState::Paused)
            .max_by_key(|s| s.pause_sequence)
        else {
            debug!("No paused call to resume");
            return Ok(false);
        };
        info!(call_id = %session.id, "Resuming call");
        engine.resume_call(session.id).await?;
        Ok(true)
    }

    async fn toggle_camera(&self, engine: &EngineHandle) -> ClientResult<bool> {
        let devices = engine.video_devices().await?;
        let current = engine.video_device().await?;
        let Some(target) = next_camera(&devices, current.as_deref()) else {
            debug!(devices = devices.len(), "Not enough cameras to toggle");
            return Ok(false);
        };

        info!(device = %target, "Switching camera");
        engine.set_video_device(&target).await?;
        if let Some(call) = engine.current_call().await? {
            engine.update_call(call.id, None).await?;
        }
        Ok(true)
    }

    async fn set_video_enabled(&self, engine: &EngineHandle, enable: bool) -> ClientResult<bool> {
        let Some(call) = engine.current_call().await? else {
            return Ok(false);
        };
        if call.camera_enabled == enable {
            return Ok(false);
        }

        let params = CallParams {
            video_enabled: enable,
            ..call.current_params
        };
        info!(call_id = %call.id, enable, "Updating call video");
        engine.update_call(call.id, Some(params)).await?;
        Ok(true)
    }

    async fn accept_video_update(&self, engine: &EngineHandle, call_id: CallId, accept: bool) -> ClientResult<bool> {
        if !self.sessions.contains_key(&call_id) {
            return Err(ClientError::CallNotFound { call_id });
        }
        let call = engine
            .calls()
            .await?
            .into_iter()
            .find(|call| call.id == call_id)
            .ok_or(ClientError::CallNotFound { call_id })?;

        let params = CallParams {
            video_enabled: accept,
            ..call.current_params
        };
        info!(call_id = %call_id, accept, "Answering remote video addition");
        engine.accept_call_update(call_id, params).await?;
        Ok(true)
    }

    /// Pick the front camera at startup, else the back one
    ///
    /// Leaves the device alone when it already is one of the two.
    pub(crate) async fn detect_cameras(&self, engine: &EngineHandle) -> ClientResult<Option<String>> {
        let devices = engine.video_devices().await?;
        let current = engine.video_device().await?;
        let front = find_camera(&devices, FRONT_CAMERA_SUFFIX);
        let back = find_camera(&devices, BACK_CAMERA_SUFFIX);

        if let Some(current) = current.as_deref() {
            if Some(current) == front || Some(current) == back {
                return Ok(None);
            }
        }

        let Some(target) = front.or(back) else {
            debug!(devices = devices.len(), "No front or back camera found");
            return Ok(None);
        };
        info!(device = %target, "Selecting camera");
        engine.set_video_device(target).await?;
        Ok(Some(target.to_string()))
    }
}
