//! Engine host boundary for voipbridge
//!
//! The call-processing engine runs in a separate host process. This crate
//! defines everything the UI side needs to talk to it:
//!
//! - [`EngineHost`] launches the host and resolves [`Engine`] handles
//! - [`Engine`] and [`Tunnel`] are the cross-process command surface
//! - [`EngineNotification`] values flow back through a [`NotificationSink`]
//! - [`NamedSignal`]s implement the ready / ui-disconnected handshake
//!
//! With the `mock-engine` feature, [`mock`] provides an in-memory host.

pub mod error;
pub mod host;
pub mod notification;
pub mod signal;
pub mod types;

#[cfg(feature = "mock-engine")]
pub mod mock;

pub use error::{EngineError, EngineResult};
pub use host::{Engine, EngineHandle, EngineHost, Tunnel};
pub use notification::{EngineNotification, NotificationSink};
pub use signal::{
    NamedSignal, SignalRegistry, announce_ready, host_ready_signal_name,
    ui_disconnected_signal_name, wait_for_ui_release,
};
pub use types::*;
