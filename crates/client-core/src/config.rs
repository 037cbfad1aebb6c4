//! Client configuration
//!
//! [`ClientConfig`] collects the static settings of the UI side: how long to
//! wait for the engine host, the user agent advertised by the engine, the
//! paths the engine core is created with, and push-notification details.
//! User-tunable preferences (tunnel mode, push channel, vibration) are read at
//! runtime through [`SettingsProvider`](crate::providers::SettingsProvider)
//! instead.
//!
//! # Usage Examples
//!
//! ```rust
//! use std::time::Duration;
//! use voipbridge_client_core::ClientConfig;
//!
//! let config = ClientConfig::new()
//!     .with_user_agent("Softphone", "2.1.0")
//!     .with_handshake_timeout(Duration::from_secs(5));
//!
//! assert_eq!(config.handshake_timeout(), Duration::from_secs(5));
//! assert!(config.validate().is_ok());
//! ```
//!
//! ## Loading from TOML
//!
//! ```rust
//! use voipbridge_client_core::ClientConfig;
//!
//! let config = ClientConfig::from_toml_str(r#"
//!     handshake_timeout_ms = 1500
//!
//!     [user_agent]
//!     name = "Softphone"
//!     version = "2.1.0"
//!
//!     [core]
//!     config_path = "/data/engine.rc"
//!     log_level = "debug"
//! "#).unwrap();
//!
//! assert_eq!(config.handshake_timeout_ms, 1500);
//! assert_eq!(config.push.pn_type, "wp");
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use voipbridge_engine_core::CoreSetup;

use crate::error::{ClientError, ClientResult};

/// How long `connect()` waits for the host ready signal
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Capacity of the broadcast event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// User agent advertised by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgent {
    pub name: String,
    pub version: String,
}

impl Default for UserAgent {
    fn default() -> Self {
        Self {
            name: "voipbridge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Push-notification contact parameter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Value of the `pn-type` contact parameter
    pub pn_type: String,
    /// Prefix the parameters with `pwd=<account password>;`
    pub include_password: bool,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            pn_type: "wp".to_string(),
            include_password: true,
        }
    }
}

/// Main client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub user_agent: UserAgent,
    /// Bounded wait on the host ready signal, in milliseconds
    pub handshake_timeout_ms: u64,
    pub core: CoreSetup,
    pub push: PushConfig,
    pub event_channel_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: UserAgent::default(),
            handshake_timeout_ms: DEFAULT_HANDSHAKE_TIMEOUT.as_millis() as u64,
            core: CoreSetup::default(),
            push: PushConfig::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML text. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> ClientResult<Self> {
        let config: ClientConfig = toml::from_str(text)
            .map_err(|e| ClientError::invalid_configuration("toml", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ClientError::invalid_configuration(path.display().to_string(), e.to_string())
        })?;
        Self::from_toml_str(&text)
    }

    pub fn with_user_agent(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.user_agent = UserAgent {
            name: name.into(),
            version: version.into(),
        };
        self
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_core_setup(mut self, core: CoreSetup) -> Self {
        self.core = core;
        self
    }

    pub fn with_push(mut self, push: PushConfig) -> Self {
        self.push = push;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Reject values the client cannot run with
    pub fn validate(&self) -> ClientResult<()> {
        if self.handshake_timeout_ms == 0 {
            return Err(ClientError::invalid_configuration(
                "handshake_timeout_ms",
                "must be greater than zero",
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(ClientError::invalid_configuration(
                "event_channel_capacity",
                "must be greater than zero",
            ));
        }
        if self.user_agent.name.trim().is_empty() {
            return Err(ClientError::invalid_configuration(
                "user_agent.name",
                "must not be empty",
            ));
        }
        Ok(())
    }
}
