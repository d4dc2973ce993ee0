//! Fixed channels on a classic link
//!
//! A fixed channel exists for a well-known CID as long as its link does.
//! Users hold a [`FixedChannel`] handle; the state behind it is owned by the
//! link's allocator and touched by the link on the stack handler.

use super::lifecycle::{ChannelLifecycle, CloseCallback};
use super::link::Link;
use crate::common::Handler;
use crate::hci::{ErrorCode, PeerAddress};
use crate::l2cap::types::{ChannelId, SecurityPolicy};
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

/// Link-side state of one fixed channel
pub(crate) struct FixedChannelImpl {
    cid: ChannelId,
    peer: PeerAddress,
    security_policy: SecurityPolicy,
    link: Weak<Mutex<Link>>,
    lifecycle: ChannelLifecycle,
}

impl FixedChannelImpl {
    pub fn new(
        cid: ChannelId,
        peer: PeerAddress,
        security_policy: SecurityPolicy,
        link: Weak<Mutex<Link>>,
    ) -> Self {
        Self {
            cid,
            peer,
            security_policy,
            link,
            lifecycle: ChannelLifecycle::default(),
        }
    }

    pub fn cid(&self) -> ChannelId {
        self.cid
    }

    pub fn is_acquired(&self) -> bool {
        self.lifecycle.is_acquired()
    }

    pub fn on_closed(&mut self, reason: ErrorCode) {
        self.lifecycle.on_closed(reason);
    }
}

impl fmt::Debug for FixedChannelImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedChannelImpl")
            .field("cid", &self.cid)
            .field("peer", &self.peer)
            .field("acquired", &self.lifecycle.is_acquired())
            .field("closed", &self.lifecycle.is_closed())
            .finish()
    }
}

/// User handle to a fixed channel.
///
/// The handle may be used from any thread. A close callback must be
/// registered before the channel is acquired or released.
#[derive(Clone)]
pub struct FixedChannel {
    inner: Arc<Mutex<FixedChannelImpl>>,
    stack_handler: Handler,
}

impl FixedChannel {
    pub(crate) fn new(inner: Arc<Mutex<FixedChannelImpl>>, stack_handler: Handler) -> Self {
        Self {
            inner,
            stack_handler,
        }
    }

    /// Channel identifier
    pub fn cid(&self) -> ChannelId {
        self.inner.lock().unwrap().cid()
    }

    /// Remote device this channel leads to
    pub fn peer(&self) -> PeerAddress {
        self.inner.lock().unwrap().peer
    }

    /// Security policy of the service owning this channel
    pub fn security_policy(&self) -> SecurityPolicy {
        self.inner.lock().unwrap().security_policy
    }

    /// Whether the channel is currently marked in use
    pub fn is_acquired(&self) -> bool {
        self.inner.lock().unwrap().is_acquired()
    }

    /// Register the callback run on `handler` when the channel closes.
    ///
    /// If the channel has already closed the callback is posted right away
    /// with the original reason.
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

    /// Mark the channel in use, holding its link open.
    ///
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

    /// Mark the channel no longer in use.
    ///
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
}

impl fmt::Debug for FixedChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner.lock().unwrap(), f)
    }
}

/// Ask the owning link to recount acquired channels on the stack handler
pub(crate) fn refresh_link(stack_handler: &Handler, link: Weak<Mutex<Link>>) {
    stack_handler.post(move || {
        if let Some(link) = link.upgrade() {
            link.lock().unwrap().refresh_ref_count();
        }
    });
}
