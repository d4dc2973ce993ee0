//! Bluetooth HCI (Host Controller Interface) boundary
//!
//! This module holds what the L2CAP core needs to know about the layer
//! below it: device addresses, controller status codes and the ACL
//! connection interfaces.

pub mod acl;
pub mod address;
pub mod error_code;

pub use acl::{AclConnection, AclManager, ConnectionCallbacks, DisconnectCallback};
pub use address::{AddressType, BdAddr, PeerAddress};
pub use error_code::{DisconnectReason, ErrorCode};
