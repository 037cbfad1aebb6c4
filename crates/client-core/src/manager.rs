//! The client manager
//!
//! [`ClientManager`] is the single entry point the application holds. It owns
//! the [`ConnectionCoordinator`] and the UI context task, and forwards every
//! call command onto that task.
//!
//! # Lifecycle
//!
//! ```text
//!   build() ──> start() ──> [commands, events] ──> stop() ──> start() ...
//!                 │                                  │
//!          connect + attach                  detach + disconnect
//! ```
//!
//! The UI context task is spawned on the first `start()` (or the first
//! command) and runs until the manager is dropped.
//!
//! # Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use voipbridge_client_core::{ClientBuilder, ClientResult};
//! # use voipbridge_engine_core::EngineHost;
//! # async fn example(host: Arc<dyn EngineHost>) -> ClientResult<()> {
//! let client = ClientBuilder::new().engine_host(host).build()?;
//! client.start().await?;
//!
//! client.invite("sip:bob@example.com").await?;
//! client.set_mic_muted(true).await?;
//!
//! client.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;
use voipbridge_engine_core::{CallId, EngineHandle, HostId, RegistrationState};

use crate::call::CallSession;
use crate::calls::CallCommand;
use crate::config::ClientConfig;
use crate::connection::ConnectionCoordinator;
use crate::dispatcher::{UiContext, UiHandle, UiJob};
use crate::error::{ClientError, ClientResult};
use crate::events::{ClientEvent, EventHub};
use crate::history::{self, CallHistoryEntry};
use crate::network::NetworkStatus;
use crate::registration::RegistrationRecord;
use crate::telephony::TelephonyRequest;

/// Entry point of the client
pub struct ClientManager {
    config: ClientConfig,
    coordinator: Arc<ConnectionCoordinator>,
    hub: Arc<EventHub>,
    ui: UiHandle,
    parked: Mutex<Option<(UiContext, mpsc::UnboundedReceiver<UiJob>)>>,
    context_task: Mutex<Option<JoinHandle<()>>>,
}

impl ClientManager {
    pub(crate) fn new(
        config: ClientConfig,
        coordinator: Arc<ConnectionCoordinator>,
        hub: Arc<EventHub>,
        ui: UiHandle,
        context: UiContext,
        jobs: mpsc::UnboundedReceiver<UiJob>,
    ) -> Self {
        Self {
            config,
            coordinator,
            hub,
            ui,
            parked: Mutex::new(Some((context, jobs))),
            context_task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn events(&self) -> &Arc<EventHub> {
        &self.hub
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.hub.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.coordinator.is_connected()
    }

    pub fn host_id(&self) -> Option<HostId> {
        self.coordinator.host_id()
    }

    /// Spawn the UI context task if it is not running yet
    fn ensure_context(&self) {
        if let Some((context, jobs)) = self.parked.lock().take() {
            debug!("Spawning UI context");
            *self.context_task.lock() = Some(tokio::spawn(context.run(jobs)));
        }
    }

    // Lifecycle

    /// Connect to the engine host and attach the UI context to it
    ///
    /// A failed attach releases the host again, leaving the client disconnected.
    pub async fn start(&self) -> ClientResult<()> {
        self.start_with_cancel(&CancellationToken::new()).await
    }

    /// Like [`start`](Self::start), abandoning the handshake when `cancel` fires
    pub async fn start_with_cancel(&self, cancel: &CancellationToken) -> ClientResult<()> {
        self.ensure_context();
        self.coordinator.connect_with_cancel(cancel).await?;

        if let Err(e) = self.attach().await {
            if let Err(disconnect) = self.coordinator.disconnect().await {
                warn!(error = %disconnect, "Failed to release engine host after failed start");
            }
            return Err(e);
        }

        info!(host_id = ?self.coordinator.host_id(), "Client started");
        Ok(())
    }

    async fn attach(&self) -> ClientResult<()> {
        let (reply, done) = oneshot::channel();
        self.ui.post(UiJob::Attach { reply })?;
        done.await.map_err(|_| ClientError::ContextClosed)?
    }

    /// Detach the UI context and release the engine host
    pub async fn stop(&self) -> ClientResult<()> {
        if !self.coordinator.is_connected() {
            debug!("Client not started");
            return Ok(());
        }

        let (reply, done) = oneshot::channel();
        self.ui.post(UiJob::Detach { reply })?;
        done.await.map_err(|_| ClientError::ContextClosed)?;

        self.coordinator.disconnect().await?;
        info!("Client stopped");
        Ok(())
    }

    /// Wait until every job posted so far has been processed
    pub async fn flush(&self) -> ClientResult<()> {
        self.inspect(|_| ()).await
    }

    async fn inspect<R, F>(&self, f: F) -> ClientResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&UiContext) -> R + Send + 'static,
    {
        self.ensure_context();
        let (reply, done) = oneshot::channel();
        self.ui.post(UiJob::Inspect(Box::new(move |context| {
            let _ = reply.send(f(context));
        })))?;
        done.await.map_err(|_| ClientError::ContextClosed)
    }

    // Calls

    async fn command(&self, command: CallCommand) -> ClientResult<bool> {
        self.ensure_context();
        let (reply, done) = oneshot::channel();
        self.ui.post(UiJob::Command { command, reply })?;
        done.await.map_err(|_| ClientError::ContextClosed)?
    }

    pub async fn invite(&self, address: impl Into<String>) -> ClientResult<()> {
        self.command(CallCommand::Invite(address.into())).await.map(|_| ())
    }

    /// End the current call, or every paused call when there is none
    pub async fn terminate(&self) -> ClientResult<bool> {
        self.command(CallCommand::Terminate).await
    }

    /// Mute or unmute the microphone; ignored without a call
    pub async fn set_mic_muted(&self, muted: bool) -> ClientResult<bool> {
        self.command(CallCommand::SetMicMuted(muted)).await
    }

    /// Pause the current call, or resume the most recently paused one
    pub async fn set_hold(&self, hold: bool) -> ClientResult<bool> {
        self.command(CallCommand::SetHold(hold)).await
    }

    /// Switch between capture devices; needs at least two
    pub async fn toggle_camera(&self) -> ClientResult<bool> {
        self.command(CallCommand::ToggleCamera).await
    }

    /// Add or remove video on the current call
    pub async fn set_video_enabled(&self, enable: bool) -> ClientResult<bool> {
        self.command(CallCommand::SetVideoEnabled(enable)).await
    }

    /// Answer a remote video addition that was deferred
    pub async fn accept_video_update(&self, call_id: CallId, accept: bool) -> ClientResult<bool> {
        self.command(CallCommand::AcceptVideoUpdate { call_id, accept }).await
    }

    /// Apply a mute/hold request from the OS call-control surface
    pub async fn handle_telephony_request(&self, request: TelephonyRequest) -> ClientResult<bool> {
        debug!(?request, "Telephony request");
        self.command(request.command()).await
    }

    pub async fn sessions(&self) -> ClientResult<Vec<CallSession>> {
        self.inspect(|context| context.calls.sessions()).await
    }

    pub async fn session(&self, call_id: CallId) -> ClientResult<Option<CallSession>> {
        self.inspect(move |context| context.calls.session(call_id).cloned())
            .await
    }

    pub async fn is_mic_muted(&self) -> ClientResult<bool> {
        self.inspect(|context| context.calls.is_mic_muted()).await
    }

    // Network

    /// Report a platform connectivity change. Callable from any thread.
    pub fn network_changed(&self, status: NetworkStatus) -> ClientResult<()> {
        self.ui.post(UiJob::NetworkChanged(status))
    }

    pub async fn is_network_reachable(&self) -> ClientResult<bool> {
        self.inspect(|context| context.network.is_reachable()).await
    }

    // Registration

    /// Live state of the default account, else the last one reported
    pub async fn last_known_registration_state(&self) -> ClientResult<Option<RegistrationState>> {
        if let Some(engine) = self.coordinator.engine() {
            if let Ok(Some(account)) = engine.default_account().await {
                return Ok(Some(account.state));
            }
        }
        self.inspect(|context| context.registration.last_known_state())
            .await
    }

    pub async fn registration_records(&self) -> ClientResult<Vec<RegistrationRecord>> {
        self.inspect(|context| context.registration.records()).await
    }

    pub async fn is_attached(&self) -> ClientResult<bool> {
        self.inspect(|context| context.is_attached()).await
    }

    // Call history

    fn engine(&self) -> ClientResult<EngineHandle> {
        self.coordinator.engine().ok_or(ClientError::NotConnected)
    }

    pub async fn call_history(&self) -> ClientResult<Vec<CallHistoryEntry>> {
        history::entries(&self.engine()?).await
    }

    pub async fn last_called_address(&self) -> ClientResult<Option<String>> {
        history::last_called_address(&self.engine()?).await
    }

    pub async fn remove_call_history(&self, ids: &[Uuid]) -> ClientResult<()> {
        history::remove(&self.engine()?, ids).await
    }

    pub async fn clear_call_history(&self) -> ClientResult<()> {
        history::clear(&self.engine()?).await
    }
}

impl Drop for ClientManager {
    fn drop(&mut self) {
        // The context task may already be gone
        let _ = self.ui.post(UiJob::Shutdown);
    }
}
