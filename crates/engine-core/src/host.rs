//! Control surface of the engine host process
//!
//! [`EngineHost`] launches the host and hands out [`Engine`] handles. Every
//! method on [`Engine`] is a cross-process call and may fail with
//! [`EngineError::EndpointUnavailable`](crate::EngineError::EndpointUnavailable)
//! once the host has gone away.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::notification::NotificationSink;
use crate::signal::SignalRegistry;
use crate::types::{
    AccountSnapshot, CallId, CallLogRecord, CallParams, CallSnapshot, CoreSetup, HostId,
    VideoPolicy,
};

/// Shared handle to a live engine
pub type EngineHandle = Arc<dyn Engine>;

/// Launches engine hosts and resolves engine handles
#[async_trait]
pub trait EngineHost: Send + Sync {
    /// Start the host process (or reuse a running one) and return its id
    async fn launch(&self) -> EngineResult<HostId>;

    /// Acquire the engine served by `host_id`
    ///
    /// Fails with `EndpointUnavailable` while the host is still starting.
    async fn acquire_engine(&self, host_id: HostId) -> EngineResult<EngineHandle>;

    /// Named signals shared with the host
    fn signals(&self) -> Arc<SignalRegistry>;
}

/// Optional tunnel transport exposed by the engine
#[async_trait]
pub trait Tunnel: Send + Sync {
    async fn enable(&self, enabled: bool) -> EngineResult<()>;

    /// Let the engine probe whether the tunnel is needed
    async fn auto_detect(&self) -> EngineResult<()>;
}

/// The call-processing engine
#[async_trait]
pub trait Engine: Send + Sync {
    // Core lifecycle

    async fn is_core_running(&self) -> EngineResult<bool>;
    async fn create_core(&self, setup: &CoreSetup) -> EngineResult<()>;
    async fn destroy(&self) -> EngineResult<()>;

    /// Register (or with `None`, detach) the receiver of engine notifications
    async fn set_listener(&self, listener: Option<Arc<dyn NotificationSink>>) -> EngineResult<()>;
    async fn set_user_agent(&self, name: &str, version: &str) -> EngineResult<()>;
    async fn set_network_reachable(&self, reachable: bool) -> EngineResult<()>;

    // Calls

    async fn calls_count(&self) -> EngineResult<usize>;
    async fn calls(&self) -> EngineResult<Vec<CallSnapshot>>;
    async fn current_call(&self) -> EngineResult<Option<CallSnapshot>>;
    async fn is_in_conference(&self) -> EngineResult<bool>;
    async fn invite(&self, address: &str) -> EngineResult<()>;
    async fn terminate_call(&self, call_id: CallId) -> EngineResult<()>;
    async fn pause_call(&self, call_id: CallId) -> EngineResult<()>;
    async fn resume_call(&self, call_id: CallId) -> EngineResult<()>;

    /// Re-negotiate a call; `None` re-sends the current parameters
    async fn update_call(&self, call_id: CallId, params: Option<CallParams>) -> EngineResult<()>;
    async fn defer_call_update(&self, call_id: CallId) -> EngineResult<()>;
    async fn accept_call_update(&self, call_id: CallId, params: CallParams) -> EngineResult<()>;
    async fn set_mic_muted(&self, muted: bool) -> EngineResult<()>;
    async fn set_remote_display_name(&self, call_id: CallId, display_name: &str) -> EngineResult<()>;

    // Video

    async fn video_policy(&self) -> EngineResult<VideoPolicy>;
    async fn is_video_supported(&self) -> EngineResult<bool>;
    async fn video_devices(&self) -> EngineResult<Vec<String>>;
    async fn video_device(&self) -> EngineResult<Option<String>>;
    async fn set_video_device(&self, device: &str) -> EngineResult<()>;

    // Network

    /// `None` when the engine was built without tunnel support
    async fn tunnel(&self) -> EngineResult<Option<Arc<dyn Tunnel>>>;

    // Accounts

    async fn default_account(&self) -> EngineResult<Option<AccountSnapshot>>;
    async fn set_contact_uri_parameters(&self, params: &str) -> EngineResult<()>;

    // Call history

    async fn call_logs(&self) -> EngineResult<Vec<CallLogRecord>>;
    async fn remove_call_log(&self, log_id: Uuid) -> EngineResult<()>;
    async fn clear_call_logs(&self) -> EngineResult<()>;
}
