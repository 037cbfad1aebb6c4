//! Handshake and teardown with the out-of-process engine host
//!
//! # Connect
//!
//! 1. Already connected: return the existing handle
//! 2. Launch the host and get its id
//! 3. Acquire the engine. If the host is still starting, wait on its ready
//!    signal (bounded, 2s by default) and acquire again
//! 4. Reset the host's ui-disconnected signal. The host does not shut down
//!    while that signal is unset
//!
//! # Disconnect
//!
//! 1. Not connected: nothing to do
//! 2. Detach the UI listener. With no calls left, mark the network
//!    unreachable and destroy the engine core. These calls are best-effort:
//!    the host may already be gone
//! 3. Clear the local connection, then set the ui-disconnected signal
//!
//! Connect and disconnect are serialized; concurrent callers queue up.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use voipbridge_engine_core::{
    EngineHandle, EngineHost, EngineResult, HostId, NamedSignal, host_ready_signal_name,
    ui_disconnected_signal_name,
};

use crate::config::DEFAULT_HANDSHAKE_TIMEOUT;
use crate::error::{ConnectError, DisconnectError};

/// A live connection to an engine host
#[derive(Clone)]
pub struct EngineConnection {
    pub host_id: HostId,
    pub engine: EngineHandle,
    ui_disconnected: Arc<NamedSignal>,
}

/// Owns the connection to the engine host
pub struct ConnectionCoordinator {
    host: Arc<dyn EngineHost>,
    handshake_timeout: Duration,
    op_lock: Mutex<()>,
    connection: RwLock<Option<EngineConnection>>,
}

impl ConnectionCoordinator {
    pub fn new(host: Arc<dyn EngineHost>) -> Self {
        Self::with_handshake_timeout(host, DEFAULT_HANDSHAKE_TIMEOUT)
    }

    pub fn with_handshake_timeout(host: Arc<dyn EngineHost>, handshake_timeout: Duration) -> Self {
        Self {
            host,
            handshake_timeout,
            op_lock: Mutex::new(()),
            connection: RwLock::new(None),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    /// The live engine handle, if connected
    pub fn engine(&self) -> Option<EngineHandle> {
        self.connection.read().as_ref().map(|c| c.engine.clone())
    }

    pub fn host_id(&self) -> Option<HostId> {
        self.connection.read().as_ref().map(|c| c.host_id)
    }

    /// Connect to the engine host, launching it if needed
    pub async fn connect(&self) -> Result<EngineHandle, ConnectError> {
        self.connect_with_cancel(&CancellationToken::new()).await
    }

    /// Connect, giving up early if `cancel` fires during the ready wait
    pub async fn connect_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<EngineHandle, ConnectError> {
        let _guard = self.op_lock.lock().await;

        if let Some(engine) = self.engine() {
            debug!("Already connected to engine host");
            return Ok(engine);
        }

        let host_id = self.host.launch().await.map_err(ConnectError::LaunchFailed)?;
        debug!(host_id = %host_id, "Engine host launched");

        let engine = match self.host.acquire_engine(host_id).await {
            Ok(engine) => engine,
            Err(e) if e.is_endpoint_unavailable() => {
                self.wait_until_ready(host_id, cancel).await?;
                self.host.acquire_engine(host_id).await?
            }
            Err(e) => return Err(e.into()),
        };

        let ui_disconnected = self
            .host
            .signals()
            .open(&ui_disconnected_signal_name(host_id));
        ui_disconnected.reset();

        *self.connection.write() = Some(EngineConnection {
            host_id,
            engine: engine.clone(),
            ui_disconnected,
        });

        info!(host_id = %host_id, "Connected to engine host");
        Ok(engine)
    }

    async fn wait_until_ready(
        &self,
        host_id: HostId,
        cancel: &CancellationToken,
    ) -> Result<(), ConnectError> {
        let ready = self.host.signals().open(&host_ready_signal_name(host_id));
        let timeout_ms = self.handshake_timeout.as_millis() as u64;
        debug!(host_id = %host_id, timeout_ms, "Waiting for engine host to become ready");

        tokio::select! {
            _ = cancel.cancelled() => {
                warn!(host_id = %host_id, "Handshake cancelled");
                Err(ConnectError::HandshakeCancelled { host_id })
            }
            signalled = ready.wait_timeout(self.handshake_timeout) => {
                if signalled {
                    Ok(())
                } else {
                    error!(host_id = %host_id, timeout_ms, "Engine host did not become ready");
                    Err(ConnectError::HandshakeTimeout { host_id, timeout_ms })
                }
            }
        }
    }

    /// Release the engine host
    pub async fn disconnect(&self) -> Result<(), DisconnectError> {
        let _guard = self.op_lock.lock().await;

        let Some(connection) = self.connection.read().clone() else {
            debug!("Disconnect requested while not connected");
            return Ok(());
        };

        if let Err(e) = Self::teardown(&connection.engine).await {
            if e.is_endpoint_unavailable() {
                debug!(host_id = %connection.host_id, error = %e, "Engine already gone during teardown");
            } else {
                warn!(host_id = %connection.host_id, error = %e, "Engine teardown failed");
            }
        }

        self.connection.write().take();

        if connection.ui_disconnected.is_set() {
            debug_assert!(false, "ui-disconnected signal already set while connected");
            return Err(DisconnectError::InvalidConnectionState {
                reason: format!(
                    "ui-disconnected signal for host {} was already set",
                    connection.host_id
                ),
            });
        }
        connection.ui_disconnected.set();

        info!(host_id = %connection.host_id, "Disconnected from engine host");
        Ok(())
    }

    async fn teardown(engine: &EngineHandle) -> EngineResult<()> {
        engine.set_listener(None).await?;
        if engine.calls_count().await? == 0 {
            // Prevents the engine from unregistering on its way down
            engine.set_network_reachable(false).await?;
            engine.destroy().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voipbridge_engine_core::mock::{EngineCommand, MockEngineHost, ReadyBehavior};

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let host = Arc::new(MockEngineHost::new(ReadyBehavior::Immediate));
        let coordinator = ConnectionCoordinator::new(host.clone());

        let first = coordinator.connect().await.unwrap();
        let second = coordinator.connect().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(host.launch_count(), 1);
        assert_eq!(coordinator.host_id(), Some(HostId(1)));
    }

    #[tokio::test]
    async fn test_disconnect_without_connect_is_noop() {
        let host = Arc::new(MockEngineHost::new(ReadyBehavior::Immediate));
        let coordinator = ConnectionCoordinator::new(host.clone());

        coordinator.disconnect().await.unwrap();
        assert!(!coordinator.is_connected());
        assert!(host.engine().commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_timeout_leaves_coordinator_disconnected() {
        let host = Arc::new(MockEngineHost::new(ReadyBehavior::Never));
        let coordinator = ConnectionCoordinator::new(host.clone());

        let err = coordinator.connect().await.err().unwrap();
        assert_eq!(
            err,
            ConnectError::HandshakeTimeout {
                host_id: HostId(1),
                timeout_ms: 2000
            }
        );
        assert!(!coordinator.is_connected());

        host.set_ready_behavior(ReadyBehavior::Immediate);
        coordinator.connect().await.unwrap();
        assert!(coordinator.is_connected());
        assert_eq!(host.launch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handshake_waits_for_ready_signal() {
        let host = Arc::new(MockEngineHost::new(ReadyBehavior::After(Duration::from_millis(500))));
        let coordinator = ConnectionCoordinator::new(host.clone());

        coordinator.connect().await.unwrap();
        assert!(coordinator.is_connected());
    }

    #[tokio::test]
    async fn test_handshake_cancellation() {
        let host = Arc::new(MockEngineHost::new(ReadyBehavior::Never));
        let coordinator = ConnectionCoordinator::with_handshake_timeout(
            host.clone(),
            Duration::from_secs(60),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = coordinator.connect_with_cancel(&cancel).await.err().unwrap();
        assert_eq!(err, ConnectError::HandshakeCancelled { host_id: HostId(1) });
        assert!(!coordinator.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_releases_host() {
        let host = Arc::new(MockEngineHost::new(ReadyBehavior::Immediate));
        let coordinator = ConnectionCoordinator::new(host.clone());
        coordinator.connect().await.unwrap();

        let released = host.signals().open(&ui_disconnected_signal_name(HostId(1)));
        assert!(!released.is_set());

        coordinator.disconnect().await.unwrap();
        assert!(released.is_set());
        assert!(coordinator.engine().is_none());
        assert_eq!(
            host.engine().commands(),
            vec![
                EngineCommand::SetListener { attached: false },
                EngineCommand::SetNetworkReachable(false),
                EngineCommand::Destroy,
            ]
        );
    }

    #[tokio::test]
    async fn test_teardown_swallows_unavailable_endpoint() {
        let host = Arc::new(MockEngineHost::new(ReadyBehavior::Immediate));
        let coordinator = ConnectionCoordinator::new(host.clone());
        coordinator.connect().await.unwrap();

        host.engine().set_unavailable(true);
        coordinator.disconnect().await.unwrap();

        assert!(!coordinator.is_connected());
        assert!(host.signals().open(&ui_disconnected_signal_name(HostId(1))).is_set());
    }
}
