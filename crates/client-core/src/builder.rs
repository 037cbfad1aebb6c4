//! Builder for [`ClientManager`]

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use voipbridge_engine_core::EngineHost;

use crate::config::ClientConfig;
use crate::connection::ConnectionCoordinator;
use crate::dispatcher::{Services, UiContext, UiHandle};
use crate::error::{ClientError, ClientResult};
use crate::events::EventHub;
use crate::manager::ClientManager;
use crate::messages::{EnglishCatalog, MessageCatalog};
use crate::network::NetworkStatus;
use crate::notifications::{LoggingNotifier, NotificationCenter, UserNotifier};
use crate::providers::{
    ContactDirectory, EmptyDirectory, LogReportSink, LoggingReportSink, MemorySettings,
    NetworkInfo, SettingsProvider, StaticNetworkInfo,
};

/// Builder for creating a client manager
///
/// Only the engine host is required. Every other collaborator falls back to
/// an in-memory or logging implementation.
pub struct ClientBuilder {
    config: ClientConfig,
    host: Option<Arc<dyn EngineHost>>,
    settings: Option<Arc<dyn SettingsProvider>>,
    directory: Option<Arc<dyn ContactDirectory>>,
    notifier: Option<Arc<dyn UserNotifier>>,
    catalog: Option<Arc<dyn MessageCatalog>>,
    network_info: Option<Arc<dyn NetworkInfo>>,
    report_sink: Option<Arc<dyn LogReportSink>>,
}

impl ClientBuilder {
    /// Create a new client builder
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            host: None,
            settings: None,
            directory: None,
            notifier: None,
            catalog: None,
            network_info: None,
            report_sink: None,
        }
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the host that launches the call engine
    pub fn engine_host(mut self, host: Arc<dyn EngineHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn settings(mut self, settings: Arc<dyn SettingsProvider>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn contact_directory(mut self, directory: Arc<dyn ContactDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn UserNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn MessageCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn network_info(mut self, network_info: Arc<dyn NetworkInfo>) -> Self {
        self.network_info = Some(network_info);
        self
    }

    pub fn log_report_sink(mut self, sink: Arc<dyn LogReportSink>) -> Self {
        self.report_sink = Some(sink);
        self
    }

    /// Set the bounded wait on the host ready signal
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_handshake_timeout(timeout);
        self
    }

    /// Set the user agent announced to the engine
    pub fn user_agent(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.config = self.config.with_user_agent(name, version);
        self
    }

    /// Build the client manager
    pub fn build(self) -> ClientResult<Arc<ClientManager>> {
        self.config.validate()?;
        let host = self.host.ok_or_else(|| {
            ClientError::invalid_configuration("engine_host", "an engine host is required")
        })?;

        let coordinator = Arc::new(ConnectionCoordinator::with_handshake_timeout(
            host,
            self.config.handshake_timeout(),
        ));
        let hub = Arc::new(EventHub::new(self.config.event_channel_capacity));
        let (ui, jobs) = UiHandle::channel();

        let services = Services {
            config: self.config.clone(),
            hub: hub.clone(),
            notifications: NotificationCenter::new(
                self.notifier.unwrap_or_else(|| Arc::new(LoggingNotifier::default())),
            ),
            catalog: self.catalog.unwrap_or_else(|| Arc::new(EnglishCatalog)),
            settings: self
                .settings
                .unwrap_or_else(|| Arc::new(MemorySettings::new())),
            network_info: self
                .network_info
                .unwrap_or_else(|| Arc::new(StaticNetworkInfo::new(NetworkStatus::wifi()))),
            report_sink: self.report_sink.unwrap_or_else(|| Arc::new(LoggingReportSink)),
        };
        let directory = self.directory.unwrap_or_else(|| Arc::new(EmptyDirectory));
        let context = UiContext::new(coordinator.clone(), ui.clone(), services, directory);

        debug!(
            user_agent = %self.config.user_agent.name,
            handshake_timeout_ms = self.config.handshake_timeout_ms,
            "Client manager built"
        );
        Ok(Arc::new(ClientManager::new(
            self.config,
            coordinator,
            hub,
            ui,
            context,
            jobs,
        )))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_requires_engine_host() {
        let result = ClientBuilder::new().build();
        assert!(matches!(
            result,
            Err(ClientError::InvalidConfiguration { ref field, .. }) if field == "engine_host"
        ));
    }

    #[test]
    fn test_build_rejects_zero_timeout() {
        let result = ClientBuilder::new()
            .handshake_timeout(Duration::ZERO)
            .build();
        assert!(matches!(
            result,
            Err(ClientError::InvalidConfiguration { ref field, .. }) if field == "handshake_timeout_ms"
        ));
    }
}
