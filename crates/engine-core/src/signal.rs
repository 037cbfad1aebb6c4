//! Named, manual-reset signals shared between the UI and the engine host
//!
//! Two signals exist per launched host:
//!
//! - **ready**: set by the host once its engine can be acquired
//! - **ui-disconnected**: reset by the UI when it connects and set when it
//!   lets go; the host must not shut down while it is unset
//!
//! A signal stays set until explicitly reset, and any number of waiters are
//! released by a single `set`.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

use crate::types::HostId;

/// Name of the signal a host sets once it is ready to serve the UI
pub fn host_ready_signal_name(host_id: HostId) -> String {
    format!("voipbridge.host.{}.ready", host_id)
}

/// Name of the signal the UI sets when it disconnects from a host
pub fn ui_disconnected_signal_name(host_id: HostId) -> String {
    format!("voipbridge.host.{}.ui-disconnected", host_id)
}

/// A manual-reset event
#[derive(Debug)]
pub struct NamedSignal {
    name: String,
    state: watch::Sender<bool>,
}

impl NamedSignal {
    /// Create a signal in the unset state
    pub fn new(name: impl Into<String>) -> Self {
        let (state, _) = watch::channel(false);
        Self {
            name: name.into(),
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&self) {
        self.state.send_replace(true);
    }

    pub fn reset(&self) {
        self.state.send_replace(false);
    }

    pub fn is_set(&self) -> bool {
        *self.state.borrow()
    }

    /// Wait until the signal is set. Returns immediately if it already is.
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        // The sender is owned by `self`, so the channel cannot close here.
        let _ = rx.wait_for(|set| *set).await;
    }

    /// Wait at most `timeout`; returns whether the signal was observed set.
    pub async fn wait_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.wait()).await.is_ok()
    }
}

/// Process-wide table of named signals
#[derive(Debug, Default)]
pub struct SignalRegistry {
    signals: DashMap<String, Arc<NamedSignal>>,
}

impl SignalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a signal by name, creating it unset if it does not exist yet
    pub fn open(&self, name: &str) -> Arc<NamedSignal> {
        self.signals
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(NamedSignal::new(name)))
            .clone()
    }

    /// Forget a signal. Holders of the `Arc` keep a working handle.
    pub fn remove(&self, name: &str) -> Option<Arc<NamedSignal>> {
        self.signals.remove(name).map(|(_, signal)| signal)
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }
}

/// Host side: announce that the engine for `host_id` can be acquired
pub fn announce_ready(registry: &SignalRegistry, host_id: HostId) {
    debug!(host_id = %host_id, "Engine host ready");
    registry.open(&host_ready_signal_name(host_id)).set();
}

/// Host side: wait until the UI has released `host_id`
pub async fn wait_for_ui_release(registry: &SignalRegistry, host_id: HostId) {
    registry
        .open(&ui_disconnected_signal_name(host_id))
        .wait()
        .await;
    debug!(host_id = %host_id, "UI released engine host");
}
