//! RustyLink - classic L2CAP link and channel management
//!
//! This library turns ACL connections to remote Bluetooth devices into
//! multiplexed sets of L2CAP channels. It keeps one link per peer, creates
//! fixed channels eagerly for registered services, negotiates dynamic
//! channels over the signalling channel and disconnects links that have
//! been idle for too long. The ACL transport itself is supplied by the
//! caller through the traits in [`hci`].

pub mod common;
pub mod hci;
pub mod l2cap;

// Re-export common types for convenience
pub use common::Handler;
pub use hci::{AclConnection, AclManager, BdAddr, ConnectionCallbacks, ErrorCode, PeerAddress};
pub use l2cap::{
    ConnectionError, DynamicChannel, DynamicChannelServiceManager, FixedChannel,
    FixedChannelServiceManager, L2capConfig, L2capError, LinkManager, ParameterProvider,
    PendingDynamicChannelConnection, PendingFixedChannelConnection, Psm, SecurityEnforcement,
    SecurityPolicy,
};
