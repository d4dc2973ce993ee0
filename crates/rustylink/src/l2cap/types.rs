//! Type definitions for L2CAP operations
//!
//! This module contains core data structures used in L2CAP operations.

use bitflags::bitflags;
use std::fmt;
use thiserror::Error;

/// Channel Identifier
pub type ChannelId = u16;

/// Error types specific to L2CAP operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum L2capError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown signaling command 0x{code:02X} (identifier {identifier})")]
    UnknownCommand { identifier: u8, code: u8 },

    #[error("Invalid PSM 0x{0:04X}")]
    InvalidPsm(u16),

    #[error("CID 0x{0:04X} is not a fixed channel")]
    InvalidFixedChannel(ChannelId),

    #[error("Service already registered")]
    ServiceAlreadyRegistered,

    #[error("Service not registered")]
    ServiceNotRegistered,
}

/// Result type for L2CAP operations
pub type L2capResult<T> = std::result::Result<T, L2capError>;

/// Connection types for L2CAP
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    /// Classic Bluetooth connection (ACL-U)
    Classic,
    /// Bluetooth Low Energy connection (LE-U)
    LE,
}

/// Security a service requires before a channel to it may be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum SecurityPolicy {
    /// No security (no authentication, no encryption)
    #[default]
    None,
    /// Authentication required
    Authentication,
    /// Authentication and encryption required
    AuthenticationAndEncryption,
    /// Secure Connections required with encryption
    SecureConnectionsWithEncryption,
}

/// Configuration options carried by Configuration Request/Response.
///
/// Only the basic-mode options are modelled; unknown options are skipped
/// when parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOptions {
    /// Maximum Transmission Unit
    pub mtu: Option<u16>,
    /// Flush Timeout
    pub flush_timeout: Option<u16>,
}

/// Result field of a Connection Response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionResponseResult {
    Success,
    Pending,
    PsmNotSupported,
    SecurityBlock,
    NoResourcesAvailable,
    InvalidSourceCid,
    SourceCidAlreadyAllocated,
    Other(u16),
}

impl From<u16> for ConnectionResponseResult {
    fn from(value: u16) -> Self {
        match value {
            0x0000 => Self::Success,
            0x0001 => Self::Pending,
            0x0002 => Self::PsmNotSupported,
            0x0003 => Self::SecurityBlock,
            0x0004 => Self::NoResourcesAvailable,
            0x0006 => Self::InvalidSourceCid,
            0x0007 => Self::SourceCidAlreadyAllocated,
            other => Self::Other(other),
        }
    }
}

impl From<ConnectionResponseResult> for u16 {
    fn from(value: ConnectionResponseResult) -> Self {
        match value {
            ConnectionResponseResult::Success => 0x0000,
            ConnectionResponseResult::Pending => 0x0001,
            ConnectionResponseResult::PsmNotSupported => 0x0002,
            ConnectionResponseResult::SecurityBlock => 0x0003,
            ConnectionResponseResult::NoResourcesAvailable => 0x0004,
            ConnectionResponseResult::InvalidSourceCid => 0x0006,
            ConnectionResponseResult::SourceCidAlreadyAllocated => 0x0007,
            ConnectionResponseResult::Other(other) => other,
        }
    }
}

impl fmt::Display for ConnectionResponseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::Pending => write!(f, "Pending"),
            Self::PsmNotSupported => write!(f, "PSM not supported"),
            Self::SecurityBlock => write!(f, "Security block"),
            Self::NoResourcesAvailable => write!(f, "No resources available"),
            Self::InvalidSourceCid => write!(f, "Invalid source CID"),
            Self::SourceCidAlreadyAllocated => write!(f, "Source CID already allocated"),
            Self::Other(code) => write!(f, "Result 0x{:04X}", code),
        }
    }
}

bitflags! {
    /// Extended feature mask reported in an Information Response
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExtendedFeatures: u32 {
        const FLOW_CONTROL_MODE = 1 << 0;
        const RETRANSMISSION_MODE = 1 << 1;
        const BIDIRECTIONAL_QOS = 1 << 2;
        const ENHANCED_RETRANSMISSION_MODE = 1 << 3;
        const STREAMING_MODE = 1 << 4;
        const FCS_OPTION = 1 << 5;
        const EXTENDED_FLOW_SPECIFICATION = 1 << 6;
        const FIXED_CHANNELS = 1 << 7;
        const EXTENDED_WINDOW_SIZE = 1 << 8;
        const UNICAST_CONNECTIONLESS_DATA = 1 << 9;
    }
}

bitflags! {
    /// Fixed channels supported mask; bit N stands for CID N
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FixedChannelsSupported: u64 {
        const SIGNALING = 1 << 1;
        const CONNECTIONLESS = 1 << 2;
        const AMP_MANAGER = 1 << 3;
        const BR_EDR_SECURITY_MANAGER = 1 << 7;
    }
}

impl FixedChannelsSupported {
    /// Mask bit for a fixed channel id
    pub fn for_cid(cid: ChannelId) -> Self {
        if cid < 64 {
            Self::from_bits_retain(1u64 << cid)
        } else {
            Self::empty()
        }
    }
}
