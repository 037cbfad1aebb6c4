//! Requests from the operating system's call-control surface
//!
//! Headsets, lock screens and car kits issue mute and hold requests outside
//! the application UI. Each maps onto exactly one [`CallCommand`].

use crate::calls::CallCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelephonyRequest {
    Mute,
    Unmute,
    Hold,
    Resume,
}

impl TelephonyRequest {
    pub fn command(self) -> CallCommand {
        match self {
            TelephonyRequest::Mute => CallCommand::SetMicMuted(true),
            TelephonyRequest::Unmute => CallCommand::SetMicMuted(false),
            TelephonyRequest::Hold => CallCommand::SetHold(true),
            TelephonyRequest::Resume => CallCommand::SetHold(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_map_to_commands() {
        assert_eq!(TelephonyRequest::Mute.command(), CallCommand::SetMicMuted(true));
        assert_eq!(TelephonyRequest::Unmute.command(), CallCommand::SetMicMuted(false));
        assert_eq!(TelephonyRequest::Hold.command(), CallCommand::SetHold(true));
        assert_eq!(TelephonyRequest::Resume.command(), CallCommand::SetHold(false));
    }
}
