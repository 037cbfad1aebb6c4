//! User-facing text
//!
//! Localization lives outside this crate. [`MessageCatalog`] is the lookup
//! seam; [`EnglishCatalog`] is the built-in fallback.

/// Placeholder replaced by the remote party's user name
pub const ADDRESS_PLACEHOLDER: &str = "#address#";

/// Keys of every string the client shows to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    CallErrorTitle,
    CallDeclined,
    CallNotFound,
    CallBusy,
    CallNotAcceptable,
    CallForbidden,
    CallUnknownError,
    RegistrationErrorTitle,
    RegistrationForbidden,
    MessageReceived,
    ImageMessageReceived,
    LogUploadErrorTitle,
    LogUploadFailed,
}

/// Lookup of localized strings
pub trait MessageCatalog: Send + Sync {
    fn get(&self, key: MessageKey) -> String;
}

/// Built-in English strings
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishCatalog;

impl MessageCatalog for EnglishCatalog {
    fn get(&self, key: MessageKey) -> String {
        let text = match key {
            MessageKey::CallErrorTitle => "Call failed",
            MessageKey::CallDeclined => "#address# declined the call",
            MessageKey::CallNotFound => "#address# could not be found",
            MessageKey::CallBusy => "#address# is busy",
            MessageKey::CallNotAcceptable => "The call parameters were not accepted",
            MessageKey::CallForbidden => "You are not allowed to place this call",
            MessageKey::CallUnknownError => "The call ended unexpectedly",
            MessageKey::RegistrationErrorTitle => "Registration failed",
            MessageKey::RegistrationForbidden => {
                "The server refused the registration, check your credentials"
            }
            MessageKey::MessageReceived => "Message received",
            MessageKey::ImageMessageReceived => "Image received",
            MessageKey::LogUploadErrorTitle => "Log upload",
            MessageKey::LogUploadFailed => "The logs could not be uploaded",
        };
        text.to_string()
    }
}

/// Substitute the remote user name into a template
pub fn with_address(template: &str, username: &str) -> String {
    template.replace(ADDRESS_PLACEHOLDER, username)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_substitution() {
        let text = with_address(&EnglishCatalog.get(MessageKey::CallBusy), "bob");
        assert_eq!(text, "bob is busy");

        let text = with_address(&EnglishCatalog.get(MessageKey::CallNotAcceptable), "bob");
        assert!(!text.contains("bob"));
    }
}
