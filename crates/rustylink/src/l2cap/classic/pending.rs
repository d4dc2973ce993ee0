//! Outstanding connection requests and their outcomes
//!
//! A pending request carries the caller's handler together with both
//! completion callbacks. It is consumed when resolved, so each request is
//! answered exactly once, always by posting to the caller's handler.

use super::dynamic_channel::DynamicChannel;
use crate::common::Handler;
use crate::hci::{ErrorCode, PeerAddress};
use crate::l2cap::types::ConnectionResponseResult;
use thiserror::Error;

/// Why a connection request did not produce a channel
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("No fixed channel service registered")]
    NoServiceRegistered,

    #[error("Every registered service already has a channel")]
    AllServicesHaveChannel,

    #[error("ACL connection failed: {0}")]
    HciError(ErrorCode),

    #[error("Link closed: {0}")]
    LinkClosed(ErrorCode),

    #[error("Connection refused by peer: {0}")]
    Rejected(ConnectionResponseResult),

    #[error("Signalling request timed out")]
    Timeout,

    #[error("Peer rejected the signalling command (reason 0x{0:04X})")]
    CommandRejected(u16),

    #[error("PSM already in use on this link")]
    PsmInUse,

    #[error("No channel identifiers available")]
    NoResourcesAvailable,
}

/// Invoked with the failure of a connection request
pub type ConnectionFailCallback = Box<dyn FnOnce(ConnectionError) + Send + 'static>;

/// A request to connect every registered fixed channel service to a peer.
///
/// The channels themselves go to their services; the requester learns only
/// that the peer is connected.
pub struct PendingFixedChannelConnection {
    handler: Handler,
    on_success: Box<dyn FnOnce(PeerAddress) + Send + 'static>,
    on_fail: ConnectionFailCallback,
}

impl PendingFixedChannelConnection {
    pub fn new<S, F>(handler: Handler, on_success: S, on_fail: F) -> Self
    where
        S: FnOnce(PeerAddress) + Send + 'static,
        F: FnOnce(ConnectionError) + Send + 'static,
    {
        Self {
            handler,
            on_success: Box::new(on_success),
            on_fail: Box::new(on_fail),
        }
    }

    pub(crate) fn notify_success(self, peer: PeerAddress) {
        let on_success = self.on_success;
        self.handler.post(move || on_success(peer));
    }

    pub(crate) fn notify_failure(self, error: ConnectionError) {
        let on_fail = self.on_fail;
        self.handler.post(move || on_fail(error));
    }
}

/// A request to open a dynamic channel to a PSM on a peer
pub struct PendingDynamicChannelConnection {
    handler: Handler,
    on_success: Box<dyn FnOnce(DynamicChannel) + Send + 'static>,
    on_fail: ConnectionFailCallback,
}

impl PendingDynamicChannelConnection {
    pub fn new<S, F>(handler: Handler, on_success: S, on_fail: F) -> Self
    where
        S: FnOnce(DynamicChannel) + Send + 'static,
        F: FnOnce(ConnectionError) + Send + 'static,
    {
        Self {
            handler,
            on_success: Box::new(on_success),
            on_fail: Box::new(on_fail),
        }
    }

    pub(crate) fn notify_success(self, channel: DynamicChannel) {
        let on_success = self.on_success;
        self.handler.post(move || on_success(channel));
    }

    pub(crate) fn notify_failure(self, error: ConnectionError) {
        let on_fail = self.on_fail;
        self.handler.post(move || on_fail(error));
    }
}
