//! Dynamic channels negotiated over the signalling channel
//!
//! A dynamic channel is bound to a PSM and a pair of local and remote CIDs.
//! Unlike fixed channels it can be closed on its own, by either side, while
//! the link stays up.

use super::fixed_channel::refresh_link;
use super::lifecycle::{ChannelLifecycle, CloseCallback};
use super::link::Link;
use crate::common::Handler;
use crate::hci::{ErrorCode, PeerAddress};
use crate::l2cap::constants::L2CAP_DEFAULT_MTU;
use crate::l2cap::psm::Psm;
use crate::l2cap::types::{ChannelId, SecurityPolicy};
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

/// Link-side state of one dynamic channel
pub(crate) struct DynamicChannelImpl {
    cid: ChannelId,
    remote_cid: ChannelId,
    psm: Psm,
    peer: PeerAddress,
    security_policy: SecurityPolicy,
    link: Weak<Mutex<Link>>,
    lifecycle: ChannelLifecycle,
    /// MTU the peer asked for in its configuration request
    remote_mtu: u16,
    /// Our configuration request was accepted
    local_configured: bool,
    /// We accepted the peer's configuration request
    remote_configured: bool,
    /// A disconnection request for this channel is outstanding
    disconnecting: bool,
}

impl DynamicChannelImpl {
    pub fn new(
        cid: ChannelId,
        remote_cid: ChannelId,
        psm: Psm,
        peer: PeerAddress,
        security_policy: SecurityPolicy,
        link: Weak<Mutex<Link>>,
    ) -> Self {
        Self {
            cid,
            remote_cid,
            psm,
            peer,
            security_policy,
            link,
            lifecycle: ChannelLifecycle::default(),
            remote_mtu: L2CAP_DEFAULT_MTU,
            local_configured: false,
            remote_configured: false,
            disconnecting: false,
        }
    }

    pub fn cid(&self) -> ChannelId {
        self.cid
    }

    pub fn remote_cid(&self) -> ChannelId {
        self.remote_cid
    }

    pub fn psm(&self) -> Psm {
        self.psm
    }

    pub fn is_acquired(&self) -> bool {
        self.lifecycle.is_acquired()
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }

    pub fn on_closed(&mut self, reason: ErrorCode) {
        self.lifecycle.on_closed(reason);
    }

    pub fn set_remote_mtu(&mut self, mtu: u16) {
        self.remote_mtu = mtu;
    }

    pub fn set_local_configured(&mut self) {
        self.local_configured = true;
    }

    pub fn set_remote_configured(&mut self) {
        self.remote_configured = true;
    }

    pub fn is_configured(&self) -> bool {
        self.local_configured && self.remote_configured
    }

    /// Mark a disconnection as started; false if one already was
    pub fn start_disconnecting(&mut self) -> bool {
        !std::mem::replace(&mut self.disconnecting, true)
    }
}

impl fmt::Debug for DynamicChannelImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicChannelImpl")
            .field("cid", &self.cid)
            .field("remote_cid", &self.remote_cid)
            .field("psm", &self.psm)
            .field("peer", &self.peer)
            .field("acquired", &self.lifecycle.is_acquired())
            .field("configured", &self.is_configured())
            .field("closed", &self.lifecycle.is_closed())
            .finish()
    }
}

/// User handle to a dynamic channel
#[derive(Clone)]
pub struct DynamicChannel {
    inner: Arc<Mutex<DynamicChannelImpl>>,
    stack_handler: Handler,
}

impl DynamicChannel {
    pub(crate) fn new(inner: Arc<Mutex<DynamicChannelImpl>>, stack_handler: Handler) -> Self {
        Self {
            inner,
            stack_handler,
        }
    }

    /// Local channel identifier
    pub fn cid(&self) -> ChannelId {
        self.inner.lock().unwrap().cid
    }

    /// Channel identifier on the remote device
    pub fn remote_cid(&self) -> ChannelId {
        self.inner.lock().unwrap().remote_cid
    }

    pub fn psm(&self) -> Psm {
        self.inner.lock().unwrap().psm
    }

    pub fn peer(&self) -> PeerAddress {
        self.inner.lock().unwrap().peer
    }

    pub fn security_policy(&self) -> SecurityPolicy {
        self.inner.lock().unwrap().security_policy
    }

    /// Largest SDU the peer accepts on this channel
    pub fn remote_mtu(&self) -> u16 {
        self.inner.lock().unwrap().remote_mtu
    }

    /// Whether both directions finished configuration
    pub fn is_configured(&self) -> bool {
        self.inner.lock().unwrap().is_configured()
    }

    pub fn is_acquired(&self) -> bool {
        self.inner.lock().unwrap().is_acquired()
    }

    /// Register the callback run on `handler` when the channel closes.
    ///
    /// # Panics
    ///
    /// Panics if a callback was registered before.
    pub fn register_on_close_callback<F>(&self, handler: Handler, callback: F)
    where
        F: FnOnce(ErrorCode) + Send + 'static,
    {
        let callback: CloseCallback = Box::new(callback);
        self.inner
            .lock()
            .unwrap()
            .lifecycle
            .register_on_close_callback(handler, callback);
    }

    /// # Panics
    ///
    /// Panics if no close callback is registered or the channel is closed.
    pub fn acquire(&self) {
        let link = {
            let mut channel = self.inner.lock().unwrap();
            channel.lifecycle.acquire();
            channel.link.clone()
        };
        refresh_link(&self.stack_handler, link);
    }

    /// # Panics
    ///
    /// Panics if no close callback is registered or the channel is closed.
    pub fn release(&self) {
        let link = {
            let mut channel = self.inner.lock().unwrap();
            channel.lifecycle.release();
            channel.link.clone()
        };
        refresh_link(&self.stack_handler, link);
    }

    /// Ask the peer to disconnect this channel.
    ///
    /// The close callback fires once the peer confirms, or once the link
    /// goes down, whichever happens first.
    ///
    /// # Panics
    ///
    /// Panics if no close callback is registered or the channel is closed.
    pub fn close(&self) {
        let (cid, link) = {
            let channel = self.inner.lock().unwrap();
            channel.lifecycle.check_usable("close");
            (channel.cid, channel.link.clone())
        };
        self.stack_handler.post(move || {
            if let Some(link) = link.upgrade() {
                link.lock().unwrap().close_dynamic_channel(cid);
            }
        });
    }
}

impl fmt::Debug for DynamicChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner.lock().unwrap(), f)
    }
}
