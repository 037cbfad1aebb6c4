//! Client-core: UI-side coordination of an out-of-process call engine
//!
//! The call engine lives in a separate host process (see
//! `voipbridge-engine-core`). This crate is the application's side of that
//! boundary:
//!
//! ```text
//! application ──> ClientManager ──> ConnectionCoordinator ──> EngineHost
//!                      │                                          │
//!                 UI context task <──── engine notifications ─────┘
//!                      │
//!           handlers + ClientEvent broadcast
//! ```
//!
//! Client-core focuses on:
//! - The handshake with the engine host and its release on teardown
//! - Call session state and the user's call commands
//! - Registration tracking and failure notifications
//! - Network reachability and the tunnel policy
//! - Caller name resolution from the address book
//!
//! All engine state changes are processed on a single UI context task, in
//! the order the engine delivered them.

pub mod builder;
pub mod call;
pub mod calls;
pub mod config;
pub mod connection;
pub mod contacts;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod history;
pub mod manager;
pub mod messages;
pub mod messaging;
pub mod network;
pub mod notifications;
pub mod providers;
pub mod push;
pub mod registration;
pub mod telephony;

mod dispatcher;

// Public API exports
pub use builder::ClientBuilder;
pub use call::CallSession;
pub use calls::CallCommand;
pub use config::{ClientConfig, PushConfig, UserAgent};
pub use connection::ConnectionCoordinator;
pub use error::{ClientError, ClientResult, ConnectError, DisconnectError};
pub use events::{
    CallEventHandler, ClientEvent, DiagnosticsEventHandler, EventHub, MessageEventHandler,
    RegistrationEventHandler,
};
pub use history::CallHistoryEntry;
pub use manager::ClientManager;
pub use messages::{EnglishCatalog, MessageCatalog, MessageKey};
pub use network::{NetworkReachabilityMonitor, NetworkStatus, TunnelAction, TunnelPolicy};
pub use notifications::{
    NotificationAction, NotificationCategory, NotificationId, UserNotification, UserNotifier,
};
pub use providers::{
    Contact, ContactDirectory, LogReportSink, MemorySettings, NetworkInfo, SettingsProvider,
    StaticNetworkInfo,
};
pub use push::PushChannel;
pub use registration::{RegistrationRecord, RegistrationTracker};
pub use telephony::TelephonyRequest;

// Engine types that appear in the public API
pub use voipbridge_engine_core::{CallDirection, CallId, CallState, Reason, RegistrationState};

/// Client-core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
