//! Resolution of remote display names from the address book
//!
//! A lookup runs as its own task and reports back to the UI context with a
//! ticket. Only the most recent ticket is honoured: starting a new lookup
//! aborts the outstanding one, and a completion for any other ticket is
//! discarded. A completion consumes the subscription whether or not a contact
//! matched.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;
use voipbridge_engine_core::RemoteAddress;

use crate::dispatcher::{UiHandle, UiJob};
use crate::providers::{Contact, ContactDirectory};

/// Strip the URI scheme from a SIP address
pub fn normalize_address(uri: &str) -> &str {
    uri.strip_prefix("sips:")
        .or_else(|| uri.strip_prefix("sip:"))
        .unwrap_or(uri)
}

struct PendingLookup {
    ticket: u64,
    address: String,
    task: JoinHandle<()>,
}

/// One-shot contact lookups for the current call
pub struct ContactResolutionBridge {
    directory: Arc<dyn ContactDirectory>,
    ui: UiHandle,
    next_ticket: u64,
    pending: Option<PendingLookup>,
}

impl ContactResolutionBridge {
    pub(crate) fn new(directory: Arc<dyn ContactDirectory>, ui: UiHandle) -> Self {
        Self {
            directory,
            ui,
            next_ticket: 0,
            pending: None,
        }
    }

    /// Start a lookup for `remote` unless the engine already named it
    ///
    /// Returns whether a lookup was started.
    pub(crate) fn request(&mut self, remote: &RemoteAddress) -> bool {
        if remote.known_display_name().is_some() {
            return false;
        }

        self.cancel();

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let address = normalize_address(&remote.uri).to_string();
        debug!(ticket, address = %address, "Looking up contact");

        let directory = self.directory.clone();
        let ui = self.ui.clone();
        let lookup_address = address.clone();
        let task = tokio::spawn(async move {
            let contact = directory.find_contact(&lookup_address).await;
            // The context may be gone by now
            let _ = ui.post(UiJob::ContactResolved { ticket, contact });
        });

        self.pending = Some(PendingLookup { ticket, address, task });
        true
    }

    /// Consume the completion of `ticket`
    ///
    /// Returns the contact when `ticket` is the outstanding lookup and it
    /// matched someone.
    pub(crate) fn complete(&mut self, ticket: u64, contact: Option<Contact>) -> Option<Contact> {
        match &self.pending {
            Some(pending) if pending.ticket == ticket => {
                debug!(ticket, address = %pending.address, found = contact.is_some(), "Contact lookup completed");
                self.pending = None;
                contact
            }
            _ => {
                debug!(ticket, "Discarding stale contact lookup");
                None
            }
        }
    }

    /// Drop the outstanding lookup, if any
    pub(crate) fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(ticket = pending.ticket, "Cancelling contact lookup");
            pending.task.abort();
        }
    }

    pub fn has_pending_lookup(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for ContactResolutionBridge {
    fn drop(&mut self) {
        self.cancel();
    }
}
