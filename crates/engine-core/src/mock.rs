//! In-memory engine host for tests and demos
//!
//! [`MockEngineHost`] hands out a single shared [`MockEngine`]. The engine
//! records every command it receives and lets the test push notifications to
//! whatever listener is registered, the way a real engine thread would.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashSet;
use parking_lot::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::host::{Engine, EngineHandle, EngineHost, Tunnel};
use crate::notification::{EngineNotification, NotificationSink};
use crate::signal::{SignalRegistry, announce_ready};
use crate::types::{
    AccountSnapshot, CallId, CallLogRecord, CallParams, CallSnapshot, CoreSetup, HostId,
    VideoPolicy,
};

/// How a launched mock host becomes ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyBehavior {
    /// Ready as soon as it is launched
    Immediate,
    /// Ready after the given delay; acquiring before that fails
    After(Duration),
    /// Never becomes ready
    Never,
}

/// Commands observed by [`MockEngine`], in order
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    CreateCore,
    Destroy,
    SetListener { attached: bool },
    SetUserAgent { name: String, version: String },
    SetNetworkReachable(bool),
    Invite(String),
    Terminate(CallId),
    Pause(CallId),
    Resume(CallId),
    UpdateCall { call_id: CallId, params: Option<CallParams> },
    DeferUpdate(CallId),
    AcceptUpdate { call_id: CallId, params: CallParams },
    SetMicMuted(bool),
    SetRemoteDisplayName { call_id: CallId, display_name: String },
    SetVideoDevice(String),
    SetContactParameters(String),
    TunnelEnable(bool),
    TunnelAutoDetect,
    RemoveCallLog(Uuid),
    ClearCallLogs,
}

type CommandLog = Arc<Mutex<Vec<EngineCommand>>>;

#[derive(Default)]
struct MockState {
    core_running: bool,
    calls: Vec<CallSnapshot>,
    current_call: Option<CallId>,
    in_conference: bool,
    video_supported: bool,
    video_policy: VideoPolicy,
    video_devices: Vec<String>,
    video_device: Option<String>,
    default_account: Option<AccountSnapshot>,
    call_logs: Vec<CallLogRecord>,
}

/// Scriptable engine that records commands
pub struct MockEngine {
    state: RwLock<MockState>,
    listener: RwLock<Option<Arc<dyn NotificationSink>>>,
    commands: CommandLog,
    tunnel: RwLock<Option<Arc<MockTunnel>>>,
    unavailable: AtomicBool,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MockState::default()),
            listener: RwLock::new(None),
            commands: Arc::new(Mutex::new(Vec::new())),
            tunnel: RwLock::new(None),
            unavailable: AtomicBool::new(false),
        }
    }

    // Scripting

    /// Make every subsequent call fail with `EndpointUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_core_running(&self, running: bool) {
        self.state.write().core_running = running;
    }

    pub fn set_video_supported(&self, supported: bool) {
        self.state.write().video_supported = supported;
    }

    pub fn set_video_devices(&self, devices: Vec<String>, current: Option<String>) {
        let mut state = self.state.write();
        state.video_devices = devices;
        state.video_device = current;
    }

    pub fn set_video_policy(&self, policy: VideoPolicy) {
        self.state.write().video_policy = policy;
    }

    pub fn set_in_conference(&self, in_conference: bool) {
        self.state.write().in_conference = in_conference;
    }

    /// Give the engine a tunnel (or remove it with `false`)
    pub fn set_tunnel_available(&self, available: bool) {
        *self.tunnel.write() = available.then(|| {
            Arc::new(MockTunnel {
                commands: self.commands.clone(),
            })
        });
    }

    pub fn set_default_account(&self, account: Option<AccountSnapshot>) {
        self.state.write().default_account = account;
    }

    pub fn set_call_logs(&self, logs: Vec<CallLogRecord>) {
        self.state.write().call_logs = logs;
    }

    /// Insert or replace a call
    pub fn upsert_call(&self, call: CallSnapshot) {
        let mut state = self.state.write();
        match state.calls.iter_mut().find(|existing| existing.id == call.id) {
            Some(existing) => *existing = call,
            None => state.calls.push(call),
        }
    }

    pub fn remove_call(&self, call_id: CallId) {
        let mut state = self.state.write();
        state.calls.retain(|call| call.id != call_id);
        if state.current_call == Some(call_id) {
            state.current_call = None;
        }
    }

    pub fn set_current_call(&self, call_id: Option<CallId>) {
        self.state.write().current_call = call_id;
    }

    /// Record `call` in the engine and push its state to the listener
    pub fn report_call(&self, call: CallSnapshot) -> bool {
        if call.state.is_terminated() {
            self.remove_call(call.id);
        } else {
            self.upsert_call(call.clone());
        }
        let message = format!("Call state {}", call.state);
        self.emit(EngineNotification::CallState { call, message })
    }

    /// Push a notification to the registered listener
    ///
    /// Returns false when no listener is attached.
    pub fn emit(&self, notification: EngineNotification) -> bool {
        let listener = self.listener.read().clone();
        match listener {
            Some(listener) => {
                listener.deliver(notification);
                true
            }
            None => {
                debug!(kind = notification.kind(), "No listener attached, notification dropped");
                false
            }
        }
    }

    // Inspection

    pub fn commands(&self) -> Vec<EngineCommand> {
        self.commands.lock().clone()
    }

    pub fn clear_commands(&self) {
        self.commands.lock().clear();
    }

    pub fn has_listener(&self) -> bool {
        self.listener.read().is_some()
    }

    pub fn video_device_name(&self) -> Option<String> {
        self.state.read().video_device.clone()
    }

    fn record(&self, command: EngineCommand) {
        self.commands.lock().push(command);
    }

    fn check(&self, operation: &str) -> EngineResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(EngineError::endpoint_unavailable(operation))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Engine for MockEngine {
    async fn is_core_running(&self) -> EngineResult<bool> {
        self.check("is_core_running")?;
        Ok(self.state.read().core_running)
    }

    async fn create_core(&self, _setup: &CoreSetup) -> EngineResult<()> {
        self.check("create_core")?;
        self.state.write().core_running = true;
        self.record(EngineCommand::CreateCore);
        Ok(())
    }

    async fn destroy(&self) -> EngineResult<()> {
        self.check("destroy")?;
        self.state.write().core_running = false;
        self.record(EngineCommand::Destroy);
        Ok(())
    }

    async fn set_listener(&self, listener: Option<Arc<dyn NotificationSink>>) -> EngineResult<()> {
        self.check("set_listener")?;
        let attached = listener.is_some();
        *self.listener.write() = listener;
        self.record(EngineCommand::SetListener { attached });
        Ok(())
    }

    async fn set_user_agent(&self, name: &str, version: &str) -> EngineResult<()> {
        self.check("set_user_agent")?;
        self.record(EngineCommand::SetUserAgent {
            name: name.to_string(),
            version: version.to_string(),
        });
        Ok(())
    }

    async fn set_network_reachable(&self, reachable: bool) -> EngineResult<()> {
        self.check("set_network_reachable")?;
        self.record(EngineCommand::SetNetworkReachable(reachable));
        Ok(())
    }

    async fn calls_count(&self) -> EngineResult<usize> {
        self.check("calls_count")?;
        Ok(self.state.read().calls.len())
    }

    async fn calls(&self) -> EngineResult<Vec<CallSnapshot>> {
        self.check("calls")?;
        Ok(self.state.read().calls.clone())
    }

    async fn current_call(&self) -> EngineResult<Option<CallSnapshot>> {
        self.check("current_call")?;
        let state = self.state.read();
        Ok(state
            .current_call
            .and_then(|id| state.calls.iter().find(|call| call.id == id).cloned()))
    }

    async fn is_in_conference(&self) -> EngineResult<bool> {
        self.check("is_in_conference")?;
        Ok(self.state.read().in_conference)
    }

    async fn invite(&self, address: &str) -> EngineResult<()> {
        self.check("invite")?;
        self.record(EngineCommand::Invite(address.to_string()));
        Ok(())
    }

    async fn terminate_call(&self, call_id: CallId) -> EngineResult<()> {
        self.check("terminate_call")?;
        self.record(EngineCommand::Terminate(call_id));
        Ok(())
    }

    async fn pause_call(&self, call_id: CallId) -> EngineResult<()> {
        self.check("pause_call")?;
        self.record(EngineCommand::Pause(call_id));
        Ok(())
    }

    async fn resume_call(&self, call_id: CallId) -> EngineResult<()> {
        self.check("resume_call")?;
        self.record(EngineCommand::Resume(call_id));
        Ok(())
    }

    async fn update_call(&self, call_id: CallId, params: Option<CallParams>) -> EngineResult<()> {
        self.check("update_call")?;
        self.record(EngineCommand::UpdateCall { call_id, params });
        Ok(())
    }

    async fn defer_call_update(&self, call_id: CallId) -> EngineResult<()> {
        self.check("defer_call_update")?;
        self.record(EngineCommand::DeferUpdate(call_id));
        Ok(())
    }

    async fn accept_call_update(&self, call_id: CallId, params: CallParams) -> EngineResult<()> {
        self.check("accept_call_update")?;
        self.record(EngineCommand::AcceptUpdate { call_id, params });
        Ok(())
    }

    async fn set_mic_muted(&self, muted: bool) -> EngineResult<()> {
        self.check("set_mic_muted")?;
        self.record(EngineCommand::SetMicMuted(muted));
        Ok(())
    }

    async fn set_remote_display_name(&self, call_id: CallId, display_name: &str) -> EngineResult<()> {
        self.check("set_remote_display_name")?;
        {
            let mut state = self.state.write();
            if let Some(call) = state.calls.iter_mut().find(|call| call.id == call_id) {
                call.remote.display_name = Some(display_name.to_string());
            }
        }
        self.record(EngineCommand::SetRemoteDisplayName {
            call_id,
            display_name: display_name.to_string(),
        });
        Ok(())
    }

    async fn video_policy(&self) -> EngineResult<VideoPolicy> {
        self.check("video_policy")?;
        Ok(self.state.read().video_policy)
    }

    async fn is_video_supported(&self) -> EngineResult<bool> {
        self.check("is_video_supported")?;
        Ok(self.state.read().video_supported)
    }

    async fn video_devices(&self) -> EngineResult<Vec<String>> {
        self.check("video_devices")?;
        Ok(self.state.read().video_devices.clone())
    }

    async fn video_device(&self) -> EngineResult<Option<String>> {
        self.check("video_device")?;
        Ok(self.state.read().video_device.clone())
    }

    async fn set_video_device(&self, device: &str) -> EngineResult<()> {
        self.check("set_video_device")?;
        self.state.write().video_device = Some(device.to_string());
        self.record(EngineCommand::SetVideoDevice(device.to_string()));
        Ok(())
    }

    async fn tunnel(&self) -> EngineResult<Option<Arc<dyn Tunnel>>> {
        self.check("tunnel")?;
        Ok(self
            .tunnel
            .read()
            .clone()
            .map(|tunnel| tunnel as Arc<dyn Tunnel>))
    }

    async fn default_account(&self) -> EngineResult<Option<AccountSnapshot>> {
        self.check("default_account")?;
        Ok(self.state.read().default_account.clone())
    }

    async fn set_contact_uri_parameters(&self, params: &str) -> EngineResult<()> {
        self.check("set_contact_uri_parameters")?;
        self.record(EngineCommand::SetContactParameters(params.to_string()));
        Ok(())
    }

    async fn call_logs(&self) -> EngineResult<Vec<CallLogRecord>> {
        self.check("call_logs")?;
        Ok(self.state.read().call_logs.clone())
    }

    async fn remove_call_log(&self, log_id: Uuid) -> EngineResult<()> {
        self.check("remove_call_log")?;
        self.state.write().call_logs.retain(|log| log.id != log_id);
        self.record(EngineCommand::RemoveCallLog(log_id));
        Ok(())
    }

    async fn clear_call_logs(&self) -> EngineResult<()> {
        self.check("clear_call_logs")?;
        self.state.write().call_logs.clear();
        self.record(EngineCommand::ClearCallLogs);
        Ok(())
    }
}

/// Tunnel that records into its engine's command log
pub struct MockTunnel {
    commands: CommandLog,
}

#[async_trait]
impl Tunnel for MockTunnel {
    async fn enable(&self, enabled: bool) -> EngineResult<()> {
        self.commands.lock().push(EngineCommand::TunnelEnable(enabled));
        Ok(())
    }

    async fn auto_detect(&self) -> EngineResult<()> {
        self.commands.lock().push(EngineCommand::TunnelAutoDetect);
        Ok(())
    }
}

/// Engine host serving one shared [`MockEngine`]
pub struct MockEngineHost {
    engine: Arc<MockEngine>,
    signals: Arc<SignalRegistry>,
    ready_hosts: Arc<DashSet<HostId>>,
    behavior: Mutex<ReadyBehavior>,
    launches: AtomicU32,
}

impl MockEngineHost {
    pub fn new(behavior: ReadyBehavior) -> Self {
        Self::with_engine(Arc::new(MockEngine::new()), behavior)
    }

    pub fn with_engine(engine: Arc<MockEngine>, behavior: ReadyBehavior) -> Self {
        Self {
            engine,
            signals: Arc::new(SignalRegistry::new()),
            ready_hosts: Arc::new(DashSet::new()),
            behavior: Mutex::new(behavior),
            launches: AtomicU32::new(0),
        }
    }

    pub fn engine(&self) -> Arc<MockEngine> {
        self.engine.clone()
    }

    /// Applies to hosts launched from now on
    pub fn set_ready_behavior(&self, behavior: ReadyBehavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn launch_count(&self) -> u32 {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineHost for MockEngineHost {
    async fn launch(&self) -> EngineResult<HostId> {
        let host_id = HostId(self.launches.fetch_add(1, Ordering::SeqCst) + 1);
        let behavior = *self.behavior.lock();
        debug!(host_id = %host_id, ?behavior, "Launching mock engine host");

        match behavior {
            ReadyBehavior::Immediate => {
                self.ready_hosts.insert(host_id);
                announce_ready(&self.signals, host_id);
            }
            ReadyBehavior::After(delay) => {
                let ready_hosts = self.ready_hosts.clone();
                let signals = self.signals.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    ready_hosts.insert(host_id);
                    announce_ready(&signals, host_id);
                });
            }
            ReadyBehavior::Never => {}
        }
        Ok(host_id)
    }

    async fn acquire_engine(&self, host_id: HostId) -> EngineResult<EngineHandle> {
        if !self.ready_hosts.contains(&host_id) {
            return Err(EngineError::endpoint_unavailable("acquire_engine"));
        }
        Ok(self.engine.clone() as EngineHandle)
    }

    fn signals(&self) -> Arc<SignalRegistry> {
        self.signals.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallDirection, CallState, RemoteAddress};

    struct Collect(Mutex<Vec<&'static str>>);

    impl NotificationSink for Collect {
        fn deliver(&self, notification: EngineNotification) {
            self.0.lock().push(notification.kind());
        }
    }

    #[tokio::test]
    async fn test_delayed_host_is_unavailable_until_ready() {
        let host = MockEngineHost::new(ReadyBehavior::After(Duration::from_millis(20)));
        let host_id = host.launch().await.unwrap();

        let err = host.acquire_engine(host_id).await.err().unwrap();
        assert!(err.is_endpoint_unavailable());

        host.signals()
            .open(&crate::signal::host_ready_signal_name(host_id))
            .wait()
            .await;
        assert!(host.acquire_engine(host_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_report_call_reaches_listener() {
        let engine = MockEngine::new();
        let call = CallSnapshot::new(
            CallDirection::Outgoing,
            RemoteAddress::new("sip:bob@example.com", "bob"),
            CallState::OutgoingProgress,
        );
        assert!(!engine.report_call(call.clone()));

        let sink = Arc::new(Collect(Mutex::new(Vec::new())));
        engine.set_listener(Some(sink.clone())).await.unwrap();
        assert!(engine.report_call(call.with_state(CallState::Connected)));
        assert_eq!(*sink.0.lock(), vec!["call_state"]);
        assert_eq!(engine.calls_count().await.unwrap(), 1);

        engine.report_call(call.with_state(CallState::CallEnd));
        assert_eq!(engine.calls_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_engine_fails_every_call() {
        let engine = MockEngine::new();
        engine.set_unavailable(true);
        let err = engine.calls_count().await.unwrap_err();
        assert!(err.is_endpoint_unavailable());
        assert!(engine.commands().is_empty());
    }
}
