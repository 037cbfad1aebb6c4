//! The UI context
//!
//! All consumer-side state lives in [`UiContext`] and is touched only by the
//! task running [`UiContext::run`]. Everything else talks to it through a
//! [`UiHandle`], which posts [`UiJob`]s onto an unbounded FIFO:
//!
//! ```text
//!  engine thread ──deliver()──┐
//!  OS telephony ──command──────┼──> [ UiJob queue ] ──> UiContext task
//!  platform network ──change───┤                          │
//!  contact lookup ──resolved───┘                          v
//!                                               handlers + broadcast
//! ```
//!
//! The engine handle is fetched from the coordinator for every job and never
//! cached. Engine notifications processed while detached are dropped.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use voipbridge_engine_core::{EngineHandle, EngineNotification, NotificationSink};

use crate::calls::{CallCommand, CallSessionController};
use crate::config::ClientConfig;
use crate::connection::ConnectionCoordinator;
use crate::contacts::ContactResolutionBridge;
use crate::diagnostics;
use crate::error::{ClientError, ClientResult};
use crate::events::{ClientEvent, EventHub};
use crate::messages::MessageCatalog;
use crate::messaging;
use crate::network::{NetworkReachabilityMonitor, NetworkStatus};
use crate::notifications::NotificationCenter;
use crate::providers::{Contact, ContactDirectory, LogReportSink, NetworkInfo, SettingsProvider};
use crate::push::apply_push_parameters;
use crate::registration::RegistrationTracker;

/// Read-only view of the UI context handed to inspection jobs
pub(crate) type Inspection = Box<dyn FnOnce(&UiContext) + Send>;

/// Work items for the UI context
pub(crate) enum UiJob {
    Engine(EngineNotification),
    Command {
        command: CallCommand,
        reply: oneshot::Sender<ClientResult<bool>>,
    },
    NetworkChanged(NetworkStatus),
    ContactResolved {
        ticket: u64,
        contact: Option<Contact>,
    },
    Attach {
        reply: oneshot::Sender<ClientResult<()>>,
    },
    Detach {
        reply: oneshot::Sender<()>,
    },
    Inspect(Inspection),
    Shutdown,
}

/// Sender side of the UI queue
#[derive(Clone)]
pub(crate) struct UiHandle {
    tx: mpsc::UnboundedSender<UiJob>,
}

impl UiHandle {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<UiJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub(crate) fn post(&self, job: UiJob) -> ClientResult<()> {
        self.tx.send(job).map_err(|_| ClientError::ContextClosed)
    }
}

impl NotificationSink for UiHandle {
    fn deliver(&self, notification: EngineNotification) {
        let kind = notification.kind();
        if self.tx.send(UiJob::Engine(notification)).is_err() {
            debug!(kind, "UI context closed, engine notification dropped");
        }
    }
}

/// Collaborators shared by every component on the UI context
pub(crate) struct Services {
    pub(crate) config: ClientConfig,
    pub(crate) hub: Arc<EventHub>,
    pub(crate) notifications: NotificationCenter,
    pub(crate) catalog: Arc<dyn MessageCatalog>,
    pub(crate) settings: Arc<dyn SettingsProvider>,
    pub(crate) network_info: Arc<dyn NetworkInfo>,
    pub(crate) report_sink: Arc<dyn LogReportSink>,
}

/// State owned by the UI context task
pub(crate) struct UiContext {
    coordinator: Arc<ConnectionCoordinator>,
    ui: UiHandle,
    attached: bool,
    services: Services,
    pub(crate) calls: CallSessionController,
    pub(crate) registration: RegistrationTracker,
    pub(crate) network: NetworkReachabilityMonitor,
    contacts: ContactResolutionBridge,
}

impl UiContext {
    pub(crate) fn new(
        coordinator: Arc<ConnectionCoordinator>,
        ui: UiHandle,
        services: Services,
        directory: Arc<dyn ContactDirectory>,
    ) -> Self {
        Self {
            coordinator,
            contacts: ContactResolutionBridge::new(directory, ui.clone()),
            ui,
            attached: false,
            services,
            calls: CallSessionController::new(),
            registration: RegistrationTracker::new(),
            network: NetworkReachabilityMonitor::new(),
        }
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.attached
    }

    /// Process jobs until shutdown
    pub(crate) async fn run(mut self, mut jobs: mpsc::UnboundedReceiver<UiJob>) {
        debug!("UI context started");
        while let Some(job) = jobs.recv().await {
            match job {
                UiJob::Shutdown => break,
                job => self.handle(job).await,
            }
        }
        self.contacts.cancel();
        debug!("UI context stopped");
    }

    fn engine(&self) -> Option<EngineHandle> {
        if self.attached {
            self.coordinator.engine()
        } else {
            None
        }
    }

    async fn handle(&mut self, job: UiJob) {
        match job {
            UiJob::Engine(notification) => self.on_engine_notification(notification).await,
            UiJob::Command { command, reply } => {
                let result = match self.engine() {
                    Some(engine) => self.calls.execute(&engine, &self.services, command).await,
                    None => Err(ClientError::NotConnected),
                };
                let _ = reply.send(result);
            }
            UiJob::NetworkChanged(status) => self.on_network_changed(status).await,
            UiJob::ContactResolved { ticket, contact } => self.on_contact_resolved(ticket, contact).await,
            UiJob::Attach { reply } => {
                let result = self.attach().await;
                if let Err(e) = &result {
                    warn!(error = %e, "Failed to attach to engine");
                    self.detach();
                }
                let _ = reply.send(result);
            }
            UiJob::Detach { reply } => {
                self.detach();
                let _ = reply.send(());
            }
            UiJob::Inspect(inspect) => inspect(&*self),
            UiJob::Shutdown => {}
        }
    }

    async fn on_engine_notification(&mut self, notification: EngineNotification) {
        let Some(engine) = self.engine() else {
            debug!(kind = notification.kind(), "Engine detached, notification dropped");
            return;
        };
        let kind = notification.kind();
        let services = &self.services;

        let result = match notification {
            EngineNotification::CallState { call, message } => {
                self.calls
                    .on_call_state(&engine, services, &mut self.contacts, call, message)
                    .await
            }
            EngineNotification::RegistrationState { account, state, message } => {
                self.registration
                    .on_notification(services, account, state, message)
                    .await;
                Ok(())
            }
            EngineNotification::GlobalState { state, message } => {
                info!(?state, "Global state changed: {}", message);
                Ok(())
            }
            EngineNotification::AuthInfoRequested { realm, username, domain } => {
                info!(realm = %realm, username = %username, domain = %domain, "Authentication requested");
                Ok(())
            }
            EngineNotification::EcCalibrationStatus { status, delay_ms } => {
                diagnostics::on_echo_calibration(services, status, delay_ms).await;
                Ok(())
            }
            EngineNotification::MessageReceived { message, .. } => {
                messaging::on_message_received(services, message).await;
                Ok(())
            }
            EngineNotification::ComposingReceived { room } => {
                messaging::on_composing_received(services, room).await;
                Ok(())
            }
            EngineNotification::FileTransferProgress { offset, total, .. } => {
                debug!(offset, total, "File transfer progress");
                Ok(())
            }
            EngineNotification::LogUploadStatus { state, info } => {
                diagnostics::on_log_upload_status(services, state, info).await;
                Ok(())
            }
            EngineNotification::LogUploadProgress { offset, total } => {
                diagnostics::on_log_upload_progress(services, offset, total).await;
                Ok(())
            }
        };

        if let Err(e) = result {
            warn!(kind, error = %e, "Failed to process engine notification");
        }
    }

    async fn on_network_changed(&mut self, status: NetworkStatus) {
        let policy = self.services.settings.tunnel_policy();
        let engine = self.engine();
        match self
            .network
            .on_network_changed(engine.as_ref(), status, policy)
            .await
        {
            Ok(true) => {
                self.services
                    .hub
                    .emit(ClientEvent::NetworkReachabilityChanged {
                        reachable: status.reachable,
                    })
                    .await;
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "Failed to apply network change"),
        }
    }

    async fn on_contact_resolved(&mut self, ticket: u64, contact: Option<Contact>) {
        let Some(contact) = self.contacts.complete(ticket, contact) else {
            return;
        };
        let Some(engine) = self.engine() else {
            return;
        };

        let call = match engine.current_call().await {
            Ok(Some(call)) => call,
            Ok(None) => {
                debug!(contact = %contact.display_name, "No current call for resolved contact");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch current call");
                return;
            }
        };

        info!(call_id = %call.id, display_name = %contact.display_name, "Resolved caller name");
        if let Err(e) = engine
            .set_remote_display_name(call.id, &contact.display_name)
            .await
        {
            warn!(call_id = %call.id, error = %e, "Failed to set remote display name");
        }
        self.calls.apply_display_name(call.id, &contact.display_name);
    }

    /// Register with the engine and bring it to a usable state
    async fn attach(&mut self) -> ClientResult<()> {
        let engine = self.coordinator.engine().ok_or(ClientError::NotConnected)?;
        let config = &self.services.config;
        let user_agent = &config.user_agent;
        let listener: Arc<dyn NotificationSink> = Arc::new(self.ui.clone());

        if engine.is_core_running().await? {
            let reattached = async {
                engine.set_listener(Some(listener.clone())).await?;
                engine.set_user_agent(&user_agent.name, &user_agent.version).await
            }
            .await;
            if let Err(e) = reattached {
                warn!(error = %e, "Existing engine core unusable, creating a new one");
                engine.create_core(&config.core).await?;
                engine.set_listener(Some(listener)).await?;
            }
        } else {
            info!("Creating engine core");
            engine.create_core(&config.core).await?;
            engine.set_listener(Some(listener)).await?;
        }

        if engine.is_video_supported().await? {
            self.calls.detect_cameras(&engine).await?;
        }
        engine
            .set_user_agent(&user_agent.name, &user_agent.version)
            .await?;
        apply_push_parameters(&engine, self.services.settings.as_ref(), &config.push).await?;

        let status = self.services.network_info.current();
        self.network
            .initialize(&engine, status, self.services.settings.tunnel_policy())
            .await?;
        self.calls.sync_from_engine(&engine).await?;

        self.attached = true;
        info!("Attached to engine");
        Ok(())
    }

    fn detach(&mut self) {
        if self.attached {
            info!("Detached from engine");
        }
        self.attached = false;
        self.contacts.cancel();
    }
}
