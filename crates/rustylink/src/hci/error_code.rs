//! HCI status codes
//!
//! Status codes reported by the controller are passed through the L2CAP
//! core untouched; only their display name is interpreted here.

use std::fmt;

/// HCI status / error code (Core Spec Vol 1, Part F)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(pub u8);

impl ErrorCode {
    pub const SUCCESS: ErrorCode = ErrorCode(0x00);
    pub const UNKNOWN_HCI_COMMAND: ErrorCode = ErrorCode(0x01);
    pub const UNKNOWN_CONNECTION: ErrorCode = ErrorCode(0x02);
    pub const HARDWARE_FAILURE: ErrorCode = ErrorCode(0x03);
    pub const PAGE_TIMEOUT: ErrorCode = ErrorCode(0x04);
    pub const AUTHENTICATION_FAILURE: ErrorCode = ErrorCode(0x05);
    pub const PIN_OR_KEY_MISSING: ErrorCode = ErrorCode(0x06);
    pub const MEMORY_CAPACITY_EXCEEDED: ErrorCode = ErrorCode(0x07);
    pub const CONNECTION_TIMEOUT: ErrorCode = ErrorCode(0x08);
    pub const CONNECTION_LIMIT_EXCEEDED: ErrorCode = ErrorCode(0x09);
    pub const CONNECTION_ALREADY_EXISTS: ErrorCode = ErrorCode(0x0B);
    pub const COMMAND_DISALLOWED: ErrorCode = ErrorCode(0x0C);
    pub const CONNECTION_REJECTED_LIMITED_RESOURCES: ErrorCode = ErrorCode(0x0D);
    pub const CONNECTION_REJECTED_SECURITY_REASONS: ErrorCode = ErrorCode(0x0E);
    pub const CONNECTION_ACCEPT_TIMEOUT: ErrorCode = ErrorCode(0x10);
    pub const REMOTE_USER_TERMINATED_CONNECTION: ErrorCode = ErrorCode(0x13);
    pub const REMOTE_DEVICE_TERMINATED_CONNECTION_LOW_RESOURCES: ErrorCode = ErrorCode(0x14);
    pub const REMOTE_DEVICE_TERMINATED_CONNECTION_POWER_OFF: ErrorCode = ErrorCode(0x15);
    pub const CONNECTION_TERMINATED_BY_LOCAL_HOST: ErrorCode = ErrorCode(0x16);
    pub const UNSUPPORTED_REMOTE_FEATURE: ErrorCode = ErrorCode(0x1A);
    pub const UNSPECIFIED_ERROR: ErrorCode = ErrorCode(0x1F);
    pub const LMP_RESPONSE_TIMEOUT: ErrorCode = ErrorCode(0x22);
    pub const PAIRING_WITH_UNIT_KEY_NOT_SUPPORTED: ErrorCode = ErrorCode(0x29);
    pub const UNACCEPTABLE_CONNECTION_PARAMETERS: ErrorCode = ErrorCode(0x3B);
    pub const CONNECTION_FAILED_ESTABLISHMENT: ErrorCode = ErrorCode(0x3E);

    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }

    fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::SUCCESS => "Success",
            Self::UNKNOWN_HCI_COMMAND => "Unknown HCI Command",
            Self::UNKNOWN_CONNECTION => "Unknown Connection Identifier",
            Self::HARDWARE_FAILURE => "Hardware Failure",
            Self::PAGE_TIMEOUT => "Page Timeout",
            Self::AUTHENTICATION_FAILURE => "Authentication Failure",
            Self::PIN_OR_KEY_MISSING => "PIN or Key Missing",
            Self::MEMORY_CAPACITY_EXCEEDED => "Memory Capacity Exceeded",
            Self::CONNECTION_TIMEOUT => "Connection Timeout",
            Self::CONNECTION_LIMIT_EXCEEDED => "Connection Limit Exceeded",
            Self::CONNECTION_ALREADY_EXISTS => "Connection Already Exists",
            Self::COMMAND_DISALLOWED => "Command Disallowed",
            Self::CONNECTION_REJECTED_LIMITED_RESOURCES => "Connection Rejected due to Limited Resources",
            Self::CONNECTION_REJECTED_SECURITY_REASONS => "Connection Rejected due to Security Reasons",
            Self::CONNECTION_ACCEPT_TIMEOUT => "Connection Accept Timeout Exceeded",
            Self::REMOTE_USER_TERMINATED_CONNECTION => "Remote User Terminated Connection",
            Self::REMOTE_DEVICE_TERMINATED_CONNECTION_LOW_RESOURCES => {
                "Remote Device Terminated Connection due to Low Resources"
            }
            Self::REMOTE_DEVICE_TERMINATED_CONNECTION_POWER_OFF => {
                "Remote Device Terminated Connection due to Power Off"
            }
            Self::CONNECTION_TERMINATED_BY_LOCAL_HOST => "Connection Terminated by Local Host",
            Self::UNSUPPORTED_REMOTE_FEATURE => "Unsupported Remote Feature",
            Self::UNSPECIFIED_ERROR => "Unspecified Error",
            Self::LMP_RESPONSE_TIMEOUT => "LMP Response Timeout",
            Self::PAIRING_WITH_UNIT_KEY_NOT_SUPPORTED => "Pairing With Unit Key Not Supported",
            Self::UNACCEPTABLE_CONNECTION_PARAMETERS => "Unacceptable Connection Parameters",
            Self::CONNECTION_FAILED_ESTABLISHMENT => "Connection Failed to be Established",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:02X})", name, self.0),
            None => write!(f, "Unknown error (0x{:02X})", self.0),
        }
    }
}

impl From<u8> for ErrorCode {
    fn from(value: u8) -> Self {
        ErrorCode(value)
    }
}

/// Reasons allowed in an HCI Disconnect command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DisconnectReason {
    AuthenticationFailure = 0x05,
    RemoteUserTerminatedConnection = 0x13,
    RemoteDeviceTerminatedConnectionLowResources = 0x14,
    RemoteDeviceTerminatedConnectionPowerOff = 0x15,
    UnsupportedRemoteFeature = 0x1A,
    PairingWithUnitKeyNotSupported = 0x29,
    UnacceptableConnectionParameters = 0x3B,
}

impl From<DisconnectReason> for ErrorCode {
    fn from(reason: DisconnectReason) -> Self {
        ErrorCode(reason as u8)
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        ErrorCode::from(*self).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_and_unknown_codes_display() {
        assert_eq!(ErrorCode::PAGE_TIMEOUT.to_string(), "Page Timeout (0x04)");
        assert_eq!(ErrorCode(0xEE).to_string(), "Unknown error (0xEE)");
    }

    #[test]
    fn test_disconnect_reason_maps_to_status() {
        assert_eq!(
            ErrorCode::from(DisconnectReason::RemoteUserTerminatedConnection),
            ErrorCode::REMOTE_USER_TERMINATED_CONNECTION
        );
        assert!(ErrorCode::SUCCESS.is_success());
        assert!(!ErrorCode::CONNECTION_TIMEOUT.is_success());
    }
}
