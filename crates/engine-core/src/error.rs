//! Error types for calls across the engine host boundary
//!
//! Every operation on the engine is a cross-process call. The one failure
//! callers are expected to branch on is [`EngineError::EndpointUnavailable`]:
//! the host has not finished starting, or it is already gone.

use thiserror::Error;

use crate::types::CallId;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the engine host control surface
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The remote endpoint is not reachable (not yet started or already torn down)
    #[error("Engine endpoint unavailable during {operation}")]
    EndpointUnavailable { operation: String },

    #[error("Failed to launch engine host: {reason}")]
    HostLaunchFailed { reason: String },

    #[error("Call not found in engine: {call_id}")]
    CallNotFound { call_id: CallId },

    #[error("Unsupported by engine: {feature}")]
    Unsupported { feature: String },

    #[error("Internal engine error: {message}")]
    Internal { message: String },
}

impl EngineError {
    /// Create an endpoint unavailable error for the named operation
    pub fn endpoint_unavailable(operation: impl Into<String>) -> Self {
        Self::EndpointUnavailable { operation: operation.into() }
    }

    /// Create a host launch error
    pub fn host_launch_failed(reason: impl Into<String>) -> Self {
        Self::HostLaunchFailed { reason: reason.into() }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// True when the remote endpoint could not be reached
    pub fn is_endpoint_unavailable(&self) -> bool {
        matches!(self, EngineError::EndpointUnavailable { .. })
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            EngineError::EndpointUnavailable { .. } => "endpoint",
            EngineError::HostLaunchFailed { .. } => "host",
            EngineError::CallNotFound { .. } => "call",
            EngineError::Unsupported { .. } => "capability",
            EngineError::Internal { .. } => "system",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_unavailable_is_detected() {
        let err = EngineError::endpoint_unavailable("set_listener");
        assert!(err.is_endpoint_unavailable());
        assert_eq!(err.category(), "endpoint");
        assert_eq!(err.to_string(), "Engine endpoint unavailable during set_listener");

        let err = EngineError::internal("boom");
        assert!(!err.is_endpoint_unavailable());
    }
}
