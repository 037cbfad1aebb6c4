//! Echo calibration and log upload reporting

use tracing::{debug, error, info};
use voipbridge_engine_core::{EcCalibratorStatus, LogUploadState};

use crate::dispatcher::Services;
use crate::events::ClientEvent;
use crate::messages::MessageKey;
use crate::notifications::{NotificationCategory, UserNotification};

pub(crate) async fn on_echo_calibration(services: &Services, status: EcCalibratorStatus, delay_ms: i32) {
    info!(?status, "Echo canceller calibration status");
    if status == EcCalibratorStatus::Done {
        info!(delay_ms, "Echo canceller calibration done");
    }
    services
        .hub
        .emit(ClientEvent::EchoCalibration { status, delay_ms })
        .await;
}

pub(crate) async fn on_log_upload_status(services: &Services, state: LogUploadState, info: String) {
    match state {
        LogUploadState::Delivered => {
            info!(url = %info, "Logs uploaded");
            services.report_sink.send_report(&info).await;
        }
        LogUploadState::NotDelivered => {
            error!(info = %info, "Log upload failed");
            services.notifications.replace(UserNotification::new(
                NotificationCategory::LogUpload,
                services.catalog.get(MessageKey::LogUploadErrorTitle),
                services.catalog.get(MessageKey::LogUploadFailed),
            ));
        }
        LogUploadState::InProgress => debug!("Log upload in progress"),
    }
    services
        .hub
        .emit(ClientEvent::LogUploadStatus { state, info })
        .await;
}

/// Percentage of `total` covered by `offset`, clamped to 100
pub fn upload_percent(offset: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    (offset.min(total) * 100 / total) as u8
}

pub(crate) async fn on_log_upload_progress(services: &Services, offset: u64, total: u64) {
    let percent = upload_percent(offset, total);
    debug!(offset, total, percent, "Log upload progress");
    services
        .hub
        .emit(ClientEvent::LogUploadProgress { percent })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_percent() {
        assert_eq!(upload_percent(0, 0), 0);
        assert_eq!(upload_percent(50, 200), 25);
        assert_eq!(upload_percent(300, 200), 100);
    }
}
