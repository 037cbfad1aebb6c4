//! Network reachability and tunnel policy
//!
//! | Policy       | Action                                              |
//! |--------------|-----------------------------------------------------|
//! | Disabled     | disable tunnel                                      |
//! | Always       | enable tunnel                                       |
//! | Auto         | disable tunnel, then auto-detect                    |
//! | CellularOnly | enable iff Wi-Fi is off and cellular data is on     |
//!
//! The policy is only applied when the engine exposes a tunnel.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use voipbridge_engine_core::{EngineHandle, EngineResult};

use crate::error::ClientError;

/// Connectivity as seen by the platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub reachable: bool,
    pub wifi_enabled: bool,
    pub cellular_data_enabled: bool,
}

impl NetworkStatus {
    pub fn wifi() -> Self {
        Self {
            reachable: true,
            wifi_enabled: true,
            cellular_data_enabled: false,
        }
    }

    pub fn cellular() -> Self {
        Self {
            reachable: true,
            wifi_enabled: false,
            cellular_data_enabled: true,
        }
    }

    pub fn offline() -> Self {
        Self::default()
    }
}

/// When to route signalling through the tunnel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TunnelPolicy {
    #[default]
    Disabled,
    Always,
    Auto,
    /// Only when on mobile data
    CellularOnly,
}

impl fmt::Display for TunnelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TunnelPolicy::Disabled => "disabled",
            TunnelPolicy::Always => "always",
            TunnelPolicy::Auto => "auto",
            TunnelPolicy::CellularOnly => "cellular-only",
        };
        f.write_str(text)
    }
}

impl FromStr for TunnelPolicy {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" => Ok(TunnelPolicy::Disabled),
            "always" | "on" => Ok(TunnelPolicy::Always),
            "auto" => Ok(TunnelPolicy::Auto),
            "cellular-only" | "3g-only" | "3g" => Ok(TunnelPolicy::CellularOnly),
            other => Err(ClientError::invalid_configuration(
                "tunnel_policy",
                format!("unknown tunnel mode '{}'", other),
            )),
        }
    }
}

/// What to do with the tunnel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelAction {
    Disable,
    Enable,
    DisableThenAutoDetect,
}

/// Decide the tunnel action for `policy` on the current network
pub fn evaluate(policy: TunnelPolicy, status: &NetworkStatus) -> TunnelAction {
    match policy {
        TunnelPolicy::Disabled => TunnelAction::Disable,
        TunnelPolicy::Always => TunnelAction::Enable,
        TunnelPolicy::Auto => TunnelAction::DisableThenAutoDetect,
        TunnelPolicy::CellularOnly => {
            if !status.wifi_enabled && status.cellular_data_enabled {
                TunnelAction::Enable
            } else {
                TunnelAction::Disable
            }
        }
    }
}

/// Apply `policy` to the engine's tunnel
///
/// Returns the action taken, or `None` when the engine has no tunnel.
pub async fn apply_tunnel_policy(
    engine: &EngineHandle,
    policy: TunnelPolicy,
    status: &NetworkStatus,
) -> EngineResult<Option<TunnelAction>> {
    let Some(tunnel) = engine.tunnel().await? else {
        debug!("Engine has no tunnel, skipping tunnel policy");
        return Ok(None);
    };

    let action = evaluate(policy, status);
    info!(%policy, ?action, "Applying tunnel policy");
    match action {
        TunnelAction::Disable => tunnel.enable(false).await?,
        TunnelAction::Enable => tunnel.enable(true).await?,
        TunnelAction::DisableThenAutoDetect => {
            tunnel.enable(false).await?;
            tunnel.auto_detect().await?;
        }
    }
    Ok(Some(action))
}

/// Tracks reachability and pushes changes to the engine
#[derive(Debug, Default)]
pub struct NetworkReachabilityMonitor {
    last_status: Option<NetworkStatus>,
}

impl NetworkReachabilityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_status(&self) -> Option<NetworkStatus> {
        self.last_status
    }

    pub fn is_reachable(&self) -> bool {
        self.last_status.map(|s| s.reachable).unwrap_or(false)
    }

    /// Seed the engine with the current network when the UI attaches
    pub async fn initialize(
        &mut self,
        engine: &EngineHandle,
        status: NetworkStatus,
        policy: TunnelPolicy,
    ) -> EngineResult<()> {
        self.last_status = Some(status);
        engine.set_network_reachable(status.reachable).await?;
        apply_tunnel_policy(engine, policy, &status).await?;
        Ok(())
    }

    /// Handle a platform network change
    ///
    /// Only acts when reachability actually flips. Returns whether it did.
    pub async fn on_network_changed(
        &mut self,
        engine: Option<&EngineHandle>,
        status: NetworkStatus,
        policy: TunnelPolicy,
    ) -> EngineResult<bool> {
        if self.last_status.map(|s| s.reachable) == Some(status.reachable) {
            debug!(reachable = status.reachable, "Network reachability unchanged");
            self.last_status = Some(status);
            return Ok(false);
        }
        self.last_status = Some(status);

        let Some(engine) = engine else {
            debug!(reachable = status.reachable, "Engine detached, recording reachability only");
            return Ok(false);
        };

        info!(reachable = status.reachable, "Network reachability changed");
        if status.reachable {
            apply_tunnel_policy(engine, policy, &status).await?;
        }
        engine.set_network_reachable(status.reachable).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use voipbridge_engine_core::mock::{EngineCommand, MockEngine};

    fn neither() -> NetworkStatus {
        NetworkStatus {
            reachable: false,
            wifi_enabled: false,
            cellular_data_enabled: false,
        }
    }

    #[test]
    fn test_tunnel_policy_table() {
        use TunnelAction::*;
        let networks = [NetworkStatus::wifi(), NetworkStatus::cellular(), neither()];
        let expected = [
            (TunnelPolicy::Disabled, [Disable, Disable, Disable]),
            (TunnelPolicy::Always, [Enable, Enable, Enable]),
            (
                TunnelPolicy::Auto,
                [DisableThenAutoDetect, DisableThenAutoDetect, DisableThenAutoDetect],
            ),
            (TunnelPolicy::CellularOnly, [Disable, Enable, Disable]),
        ];

        for (policy, actions) in expected {
            for (status, action) in networks.iter().zip(actions) {
                assert_eq!(evaluate(policy, status), action, "{policy} on {status:?}");
            }
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("3G-only".parse::<TunnelPolicy>().unwrap(), TunnelPolicy::CellularOnly);
        assert_eq!("auto".parse::<TunnelPolicy>().unwrap(), TunnelPolicy::Auto);
        assert!("sometimes".parse::<TunnelPolicy>().is_err());
        assert_eq!(TunnelPolicy::CellularOnly.to_string(), "cellular-only");
    }

    #[tokio::test]
    async fn test_no_tunnel_is_noop() {
        let mock = Arc::new(MockEngine::new());
        let engine: EngineHandle = mock.clone();

        let action = apply_tunnel_policy(&engine, TunnelPolicy::Always, &NetworkStatus::wifi())
            .await
            .unwrap();
        assert_eq!(action, None);
        assert!(mock.commands().is_empty());
    }

    #[tokio::test]
    async fn test_auto_policy_disables_then_detects() {
        let mock = Arc::new(MockEngine::new());
        mock.set_tunnel_available(true);
        let engine: EngineHandle = mock.clone();

        apply_tunnel_policy(&engine, TunnelPolicy::Auto, &NetworkStatus::wifi())
            .await
            .unwrap();
        assert_eq!(
            mock.commands(),
            vec![EngineCommand::TunnelEnable(false), EngineCommand::TunnelAutoDetect]
        );
    }

    #[tokio::test]
    async fn test_monitor_debounces_unchanged_reachability() {
        let mock = Arc::new(MockEngine::new());
        mock.set_tunnel_available(true);
        let engine: EngineHandle = mock.clone();
        let mut monitor = NetworkReachabilityMonitor::new();

        monitor
            .initialize(&engine, NetworkStatus::wifi(), TunnelPolicy::Always)
            .await
            .unwrap();
        mock.clear_commands();

        // Wi-Fi to cellular keeps reachability: nothing happens
        let changed = monitor
            .on_network_changed(Some(&engine), NetworkStatus::cellular(), TunnelPolicy::Always)
            .await
            .unwrap();
        assert!(!changed);
        assert!(mock.commands().is_empty());

        let changed = monitor
            .on_network_changed(Some(&engine), NetworkStatus::offline(), TunnelPolicy::Always)
            .await
            .unwrap();
        assert!(changed);
        assert_eq!(mock.commands(), vec![EngineCommand::SetNetworkReachable(false)]);
        mock.clear_commands();

        monitor
            .on_network_changed(Some(&engine), NetworkStatus::cellular(), TunnelPolicy::CellularOnly)
            .await
            .unwrap();
        assert_eq!(
            mock.commands(),
            vec![EngineCommand::TunnelEnable(true), EngineCommand::SetNetworkReachable(true)]
        );
    }
}
