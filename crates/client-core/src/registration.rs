//! Registration tracking
//!
//! Keeps the last registration state per account. Only a `Failed` state with
//! a `Forbidden` reason is shown to the user; other failures are recorded and
//! logged.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use voipbridge_engine_core::{AccountSnapshot, Reason, RegistrationState};

use crate::dispatcher::Services;
use crate::events::ClientEvent;
use crate::messages::MessageKey;
use crate::notifications::{NotificationCategory, UserNotification};

/// Last known registration of one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub account_identity: String,
    pub state: RegistrationState,
    /// Reason of the most recent failure
    pub last_error: Option<Reason>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct RegistrationTracker {
    records: HashMap<String, RegistrationRecord>,
    last_known_state: Option<RegistrationState>,
}

impl RegistrationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the most recent registration notification
    pub fn last_known_state(&self) -> Option<RegistrationState> {
        self.last_known_state
    }

    pub fn record(&self, identity: &str) -> Option<&RegistrationRecord> {
        self.records.get(identity)
    }

    pub fn records(&self) -> Vec<RegistrationRecord> {
        self.records.values().cloned().collect()
    }

    /// Apply a registration notification
    pub(crate) async fn on_notification(
        &mut self,
        services: &Services,
        account: Option<AccountSnapshot>,
        state: RegistrationState,
        message: String,
    ) {
        let Some(account) = account else {
            debug!(?state, "Registration notification without account, ignored");
            return;
        };
        info!(account = %account.identity, state = %state, "Registration: {}", message);

        let record = self
            .records
            .entry(account.identity.clone())
            .or_insert_with(|| RegistrationRecord {
                account_identity: account.identity.clone(),
                state,
                last_error: None,
                updated_at: Utc::now(),
            });
        record.state = state;
        record.updated_at = Utc::now();
        if state == RegistrationState::Failed {
            record.last_error = Some(account.error);
        }
        self.last_known_state = Some(state);

        if state == RegistrationState::Failed {
            if account.error == Reason::Forbidden {
                warn!(account = %account.identity, "Registration forbidden");
                let catalog = &services.catalog;
                services.notifications.replace(UserNotification::new(
                    NotificationCategory::RegistrationError,
                    catalog.get(MessageKey::RegistrationErrorTitle),
                    catalog.get(MessageKey::RegistrationForbidden),
                ));
            } else {
                warn!(account = %account.identity, reason = ?account.error, "Registration failed");
            }
        }

        services
            .hub
            .emit(ClientEvent::RegistrationStateChanged {
                identity: account.identity,
                state,
                message,
            })
            .await;
    }
}
