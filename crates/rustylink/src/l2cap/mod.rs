//! L2CAP (Logical Link Control and Adaptation Protocol) implementation
//!
//! This module provides the classic L2CAP connection core, which is
//! responsible for:
//! - Keeping at most one ACL link per peer and tearing idle links down
//! - Multiplexing fixed and dynamic channels over each link
//! - Driving the signalling exchange that opens and closes dynamic channels
//! - Notifying channel users exactly once when a channel goes away

pub mod classic;
pub mod constants;
pub mod psm;
pub mod signaling;
pub mod types;
#[cfg(test)]
mod tests;

// Re-export the public API
pub use self::classic::{
    ConnectionError, DynamicChannel, DynamicChannelServiceManager, FixedChannel,
    FixedChannelServiceManager, L2capConfig, LinkManager, ParameterProvider,
    PendingDynamicChannelConnection, PendingFixedChannelConnection, SecurityEnforcement,
};
pub use self::psm::Psm;
pub use self::signaling::{L2capCommandHeader, SignalId, SignalingMessage};
pub use self::types::*;
