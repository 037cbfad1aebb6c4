//! Error types for client-core
//!
//! Errors are grouped by how callers are expected to react:
//!
//! - **Handshake errors** ([`ConnectError`]) - the engine host did not come up;
//!   the coordinator stays disconnected and `connect()` may be retried
//! - **Contract violations** ([`DisconnectError`]) - programming errors in the
//!   connection lifecycle
//! - **Engine errors** - a cross-process call failed
//! - **State errors** - the operation needs a live engine or a known call
//!
//! # Example
//!
//! ```rust,no_run
//! # use voipbridge_client_core::{ClientManager, ClientError, ConnectError};
//! # async fn example(manager: ClientManager) {
//! match manager.start().await {
//!     Ok(()) => {}
//!     Err(ClientError::Connect(ConnectError::HandshakeTimeout { host_id, timeout_ms })) => {
//!         eprintln!("Host {} not ready after {}ms, try again later", host_id, timeout_ms);
//!     }
//!     Err(e) => eprintln!("Start failed ({}): {}", e.category(), e),
//! }
//! # }
//! ```

use thiserror::Error;
use voipbridge_engine_core::{CallId, EngineError, HostId};

/// Result type alias for client-core operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Failures of the connect handshake
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("Engine host {host_id} not ready after {timeout_ms}ms")]
    HandshakeTimeout { host_id: HostId, timeout_ms: u64 },

    #[error("Handshake with engine host {host_id} was cancelled")]
    HandshakeCancelled { host_id: HostId },

    #[error("Failed to launch engine host: {0}")]
    LaunchFailed(EngineError),

    #[error("Engine error during handshake: {0}")]
    Engine(#[from] EngineError),
}

/// Failures of the disconnect protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisconnectError {
    #[error("Invalid connection state: {reason}")]
    InvalidConnectionState { reason: String },
}

/// Errors returned by client-core operations
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("Not connected to an engine host")]
    NotConnected,

    #[error("UI context is not running")]
    ContextClosed,

    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error(transparent)]
    Disconnect(#[from] DisconnectError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Call not found: {call_id}")]
    CallNotFound { call_id: CallId },

    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfiguration { field: String, reason: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl ClientError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError { message: message.into() }
    }

    /// Check if retrying the operation may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            ClientError::Connect(ConnectError::HandshakeTimeout { .. })
            | ClientError::Connect(ConnectError::HandshakeCancelled { .. })
            | ClientError::NotConnected => true,
            ClientError::Engine(e) | ClientError::Connect(ConnectError::Engine(e)) => {
                e.is_endpoint_unavailable()
            }
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            ClientError::NotConnected | ClientError::Connect(_) | ClientError::Disconnect(_) => {
                "connection"
            }
            ClientError::Engine(_) => "engine",
            ClientError::CallNotFound { .. } => "call",
            ClientError::InvalidConfiguration { .. } => "configuration",
            ClientError::ContextClosed | ClientError::InternalError { .. } => "system",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_timeout_is_recoverable() {
        let err: ClientError = ConnectError::HandshakeTimeout {
            host_id: HostId(1),
            timeout_ms: 2000,
        }
        .into();
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "connection");
        assert_eq!(err.to_string(), "Engine host 1 not ready after 2000ms");
    }

    #[test]
    fn test_engine_errors_convert() {
        let err: ClientError = EngineError::endpoint_unavailable("invite").into();
        assert!(err.is_recoverable());
        assert_eq!(err.category(), "engine");

        let err: ClientError = EngineError::internal("crashed").into();
        assert!(!err.is_recoverable());
    }
}
