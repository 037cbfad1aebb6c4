//! Push-notification contact parameters
//!
//! The registrar learns how to wake the application from the contact URI
//! parameters of the default account:
//! `app-id=<channel host>;pn-type=<type>;pn-tok=<channel token>`, optionally
//! prefixed with `pwd=<password>;`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use voipbridge_engine_core::EngineHandle;

use crate::config::PushConfig;
use crate::error::ClientResult;
use crate::providers::SettingsProvider;

/// Push channel issued by the platform notification service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushChannel {
    pub host: String,
    pub token: String,
}

impl PushChannel {
    pub fn new(host: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
        }
    }

    fn is_complete(&self) -> bool {
        !self.host.is_empty() && !self.token.is_empty()
    }
}

/// Build the contact URI parameters for `channel`
pub fn contact_uri_parameters(pn_type: &str, channel: &PushChannel, password: Option<&str>) -> String {
    let params = format!("app-id={};pn-type={};pn-tok={}", channel.host, pn_type, channel.token);
    match password.filter(|p| !p.is_empty()) {
        Some(password) => format!("pwd={};{}", password, params),
        None => params,
    }
}

/// Apply push parameters to the engine's default account
///
/// Returns whether parameters were applied.
pub async fn apply_push_parameters(
    engine: &EngineHandle,
    settings: &dyn SettingsProvider,
    config: &PushConfig,
) -> ClientResult<bool> {
    let Some(account) = engine.default_account().await? else {
        debug!("No default account, skipping push parameters");
        return Ok(false);
    };

    let Some(channel) = settings.push_channel().filter(PushChannel::is_complete) else {
        warn!(account = %account.identity, "Push channel host or token missing, push notifications disabled");
        return Ok(false);
    };

    let password = if config.include_password {
        settings.account_password()
    } else {
        None
    };
    let params = contact_uri_parameters(&config.pn_type, &channel, password.as_deref());
    engine.set_contact_uri_parameters(&params).await?;
    info!(account = %account.identity, host = %channel.host, "Push parameters applied");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_uri_parameters() {
        let channel = PushChannel::new("push.example.net", "tok123");
        assert_eq!(
            contact_uri_parameters("wp", &channel, None),
            "app-id=push.example.net;pn-type=wp;pn-tok=tok123"
        );
        assert_eq!(
            contact_uri_parameters("wp", &channel, Some("s3cret")),
            "pwd=s3cret;app-id=push.example.net;pn-type=wp;pn-tok=tok123"
        );
        assert_eq!(
            contact_uri_parameters("wp", &channel, Some("")),
            "app-id=push.example.net;pn-type=wp;pn-tok=tok123"
        );
    }
}
