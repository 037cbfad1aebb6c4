//! Collaborators supplied by the application
//!
//! Settings storage, contact search, network status and log report delivery
//! live outside this crate. These traits are the seams; the in-memory
//! implementations below are used when the application does not provide its
//! own.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::info;

use crate::network::{NetworkStatus, TunnelPolicy};
use crate::push::PushChannel;

/// User preferences, read on every use
pub trait SettingsProvider: Send + Sync {
    fn tunnel_policy(&self) -> TunnelPolicy;
    fn push_channel(&self) -> Option<PushChannel>;
    fn account_password(&self) -> Option<String>;
    fn vibrate_on_incoming_message(&self) -> bool;
}

/// Current connectivity of the device
pub trait NetworkInfo: Send + Sync {
    fn current(&self) -> NetworkStatus;
}

/// A contact found in the address book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub display_name: String,
    pub address: String,
}

/// Address book search
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Look up a contact by normalized SIP address (no `sip:` prefix)
    async fn find_contact(&self, address: &str) -> Option<Contact>;
}

/// Delivers an uploaded log report (e.g. by composing an email)
#[async_trait]
pub trait LogReportSink: Send + Sync {
    async fn send_report(&self, report_url: &str);
}

/// Mutable in-memory settings
#[derive(Debug, Default)]
pub struct MemorySettings {
    inner: RwLock<SettingsValues>,
}

#[derive(Debug, Clone, Default)]
struct SettingsValues {
    tunnel_policy: TunnelPolicy,
    push_channel: Option<PushChannel>,
    account_password: Option<String>,
    vibrate_on_incoming_message: bool,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tunnel_policy(&self, policy: TunnelPolicy) {
        self.inner.write().tunnel_policy = policy;
    }

    pub fn set_push_channel(&self, channel: Option<PushChannel>) {
        self.inner.write().push_channel = channel;
    }

    pub fn set_account_password(&self, password: Option<String>) {
        self.inner.write().account_password = password;
    }

    pub fn set_vibrate_on_incoming_message(&self, vibrate: bool) {
        self.inner.write().vibrate_on_incoming_message = vibrate;
    }
}

impl SettingsProvider for MemorySettings {
    fn tunnel_policy(&self) -> TunnelPolicy {
        self.inner.read().tunnel_policy
    }

    fn push_channel(&self) -> Option<PushChannel> {
        self.inner.read().push_channel.clone()
    }

    fn account_password(&self) -> Option<String> {
        self.inner.read().account_password.clone()
    }

    fn vibrate_on_incoming_message(&self) -> bool {
        self.inner.read().vibrate_on_incoming_message
    }
}

/// Network status set by hand
#[derive(Debug, Default)]
pub struct StaticNetworkInfo {
    status: RwLock<NetworkStatus>,
}

impl StaticNetworkInfo {
    pub fn new(status: NetworkStatus) -> Self {
        Self {
            status: RwLock::new(status),
        }
    }

    pub fn set(&self, status: NetworkStatus) {
        *self.status.write() = status;
    }
}

impl NetworkInfo for StaticNetworkInfo {
    fn current(&self) -> NetworkStatus {
        *self.status.read()
    }
}

/// Directory that never finds anyone
#[derive(Debug, Default)]
pub struct EmptyDirectory;

#[async_trait]
impl ContactDirectory for EmptyDirectory {
    async fn find_contact(&self, _address: &str) -> Option<Contact> {
        None
    }
}

/// Report sink that only logs
#[derive(Debug, Default)]
pub struct LoggingReportSink;

#[async_trait]
impl LogReportSink for LoggingReportSink {
    async fn send_report(&self, report_url: &str) {
        info!(report_url, "Log report uploaded");
    }
}
