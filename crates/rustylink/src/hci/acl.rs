//! ACL transport boundary
//!
//! The L2CAP core never creates or tears down physical links itself. It
//! asks an [`AclManager`] to do so and learns the outcome through
//! [`ConnectionCallbacks`], which the transport invokes on the handler the
//! callbacks were registered with.

use super::address::PeerAddress;
use super::error_code::{DisconnectReason, ErrorCode};
use crate::common::Handler;
use std::sync::Arc;

/// Invoked once when an established connection goes away
pub type DisconnectCallback = Box<dyn FnOnce(ErrorCode) + Send + 'static>;

/// An established ACL connection, exclusively owned by one L2CAP link.
///
/// Implementations must not call back into the L2CAP core synchronously
/// from these methods; outcomes are reported by posting to a handler.
pub trait AclConnection: Send {
    /// Remote end of this connection
    fn peer(&self) -> PeerAddress;

    /// Request termination of the connection.
    ///
    /// Completion is reported later through the disconnect callback.
    fn disconnect(&mut self, reason: DisconnectReason);

    /// Register the one-shot callback fired, on `handler`, when the
    /// connection closes for any reason
    fn register_disconnect_callback(&mut self, handler: Handler, callback: DisconnectCallback);

    /// Send an L2CAP payload on channel `cid` of this connection
    fn send_pdu(&mut self, cid: u16, payload: Vec<u8>);
}

/// Receiver of connection-establishment outcomes
pub trait ConnectionCallbacks: Send + Sync {
    fn on_connect_success(&self, peer: PeerAddress, connection: Box<dyn AclConnection>);

    fn on_connect_fail(&self, peer: PeerAddress, reason: ErrorCode);
}

/// Creates ACL connections on request
pub trait AclManager: Send + Sync {
    /// Register the receiver of connection outcomes; outcomes are delivered
    /// by posting to `handler`
    fn register_callbacks(&self, callbacks: Arc<dyn ConnectionCallbacks>, handler: Handler);

    /// Start connecting to `peer`. Exactly one of `on_connect_success` or
    /// `on_connect_fail` follows.
    fn create_connection(&self, peer: PeerAddress);

    /// Abort an outstanding `create_connection`; the transport then
    /// reports `on_connect_fail`
    fn cancel_connect(&self, peer: PeerAddress);
}
