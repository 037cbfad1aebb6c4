//! Notifications pushed by the engine to its registered listener

use crate::types::{
    AccountSnapshot, CallSnapshot, ChatMessage, ChatRoom, EcCalibratorStatus, GlobalState,
    LogUploadState, RegistrationState,
};

/// Asynchronous callbacks raised by the engine
///
/// They arrive on an engine-owned thread, in emission order.
#[derive(Debug, Clone)]
pub enum EngineNotification {
    GlobalState {
        state: GlobalState,
        message: String,
    },
    CallState {
        call: CallSnapshot,
        message: String,
    },
    RegistrationState {
        /// `None` when the account configuration is gone
        account: Option<AccountSnapshot>,
        state: RegistrationState,
        message: String,
    },
    AuthInfoRequested {
        realm: String,
        username: String,
        domain: String,
    },
    EcCalibrationStatus {
        status: EcCalibratorStatus,
        delay_ms: i32,
    },
    MessageReceived {
        room: ChatRoom,
        message: ChatMessage,
    },
    ComposingReceived {
        room: ChatRoom,
    },
    FileTransferProgress {
        message: ChatMessage,
        offset: u64,
        total: u64,
    },
    LogUploadStatus {
        state: LogUploadState,
        info: String,
    },
    LogUploadProgress {
        offset: u64,
        total: u64,
    },
}

impl EngineNotification {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            EngineNotification::GlobalState { .. } => "global_state",
            EngineNotification::CallState { .. } => "call_state",
            EngineNotification::RegistrationState { .. } => "registration_state",
            EngineNotification::AuthInfoRequested { .. } => "auth_info_requested",
            EngineNotification::EcCalibrationStatus { .. } => "ec_calibration_status",
            EngineNotification::MessageReceived { .. } => "message_received",
            EngineNotification::ComposingReceived { .. } => "composing_received",
            EngineNotification::FileTransferProgress { .. } => "file_transfer_progress",
            EngineNotification::LogUploadStatus { .. } => "log_upload_status",
            EngineNotification::LogUploadProgress { .. } => "log_upload_progress",
        }
    }
}

/// Receiver of engine notifications
///
/// `deliver` is called from engine threads and must not block.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: EngineNotification);
}
