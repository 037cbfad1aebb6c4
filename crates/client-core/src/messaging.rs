//! Chat message routing
//!
//! A message for the conversation currently on screen goes to the message
//! handler. Anything else becomes a notification that opens the conversation.

use chrono::{Datelike, Local, NaiveDateTime};
use tracing::{debug, info};
use voipbridge_engine_core::{ChatMessage, ChatRoom};

use crate::contacts::normalize_address;
use crate::dispatcher::Services;
use crate::events::ClientEvent;
use crate::messages::MessageKey;
use crate::notifications::{MESSAGE_VIBRATION, NotificationAction, NotificationCategory, UserNotification};

/// Notification title for a message received at `time`
///
/// `HH:MM` today, `Ddd D Mon, HH:MM` earlier this year, and
/// `Ddd D Mon YYYY, HH:MM` before that.
pub fn message_time_label(time: NaiveDateTime, now: NaiveDateTime) -> String {
    if time.date() == now.date() {
        time.format("%H:%M").to_string()
    } else if time.year() == now.year() {
        time.format("%a %-d %b, %H:%M").to_string()
    } else {
        time.format("%a %-d %b %Y, %H:%M").to_string()
    }
}

pub(crate) async fn on_message_received(services: &Services, message: ChatMessage) {
    let sender = normalize_address(&message.from_uri).to_string();
    info!(sender = %sender, "Chat message received");

    if services.settings.vibrate_on_incoming_message() {
        services.notifications.vibrate(MESSAGE_VIBRATION);
    }

    if services.hub.displayed_conversation().as_deref() == Some(sender.as_str()) {
        services
            .hub
            .emit(ClientEvent::MessageReceived { sender, message })
            .await;
        return;
    }

    let now = Local::now().naive_local();
    let title = message_time_label(message.time.with_timezone(&Local).naive_local(), now);
    let (caption, text) = match &message.external_body_url {
        Some(_) => (services.catalog.get(MessageKey::ImageMessageReceived), String::new()),
        None => (
            services.catalog.get(MessageKey::MessageReceived),
            message.text.clone().unwrap_or_default(),
        ),
    };

    services.notifications.replace(
        UserNotification::new(NotificationCategory::MessageReceived, title, text)
            .with_caption(caption)
            .with_action(NotificationAction::OpenConversation { sip_address: sender }),
    );
}

pub(crate) async fn on_composing_received(services: &Services, room: ChatRoom) {
    let peer = normalize_address(&room.peer_uri);
    if services.hub.displayed_conversation().as_deref() != Some(peer) {
        debug!(peer = %peer, "Composing notification for hidden conversation");
        return;
    }
    services.hub.emit(ClientEvent::ComposingReceived { room }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_message_time_label() {
        let now = at(2024, 3, 15, 18, 0);
        assert_eq!(message_time_label(at(2024, 3, 15, 9, 5), now), "09:05");
        assert_eq!(message_time_label(at(2024, 1, 2, 14, 30), now), "Tue 2 Jan, 14:30");
        assert_eq!(message_time_label(at(2023, 12, 31, 23, 59), now), "Sun 31 Dec 2023, 23:59");
    }
}
