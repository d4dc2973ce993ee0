//! Per-link bookkeeping of instantiated fixed channels

use super::fixed_channel::FixedChannelImpl;
use super::link::Link;
use crate::hci::PeerAddress;
use crate::l2cap::constants::{L2CAP_FIRST_FIXED_CID, L2CAP_LAST_FIXED_CID};
use crate::l2cap::types::{ChannelId, SecurityPolicy};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

pub(crate) struct FixedChannelAllocator {
    peer: PeerAddress,
    link: Weak<Mutex<Link>>,
    channels: BTreeMap<ChannelId, Arc<Mutex<FixedChannelImpl>>>,
}

impl FixedChannelAllocator {
    pub fn new(peer: PeerAddress, link: Weak<Mutex<Link>>) -> Self {
        Self {
            peer,
            link,
            channels: BTreeMap::new(),
        }
    }

    /// Instantiate the channel for `cid`.
    ///
    /// # Panics
    ///
    /// Panics if `cid` is outside the fixed range or already allocated.
    pub fn allocate_channel(
        &mut self,
        cid: ChannelId,
        security_policy: SecurityPolicy,
    ) -> Arc<Mutex<FixedChannelImpl>> {
        assert!(
            (L2CAP_FIRST_FIXED_CID..=L2CAP_LAST_FIXED_CID).contains(&cid),
            "CID 0x{:04X} is not a fixed channel",
            cid
        );
        assert!(
            !self.channels.contains_key(&cid),
            "Fixed channel 0x{:04X} already allocated for {}",
            cid,
            self.peer
        );

        let channel = Arc::new(Mutex::new(FixedChannelImpl::new(
            cid,
            self.peer,
            security_policy,
            self.link.clone(),
        )));
        self.channels.insert(cid, channel.clone());
        channel
    }

    /// # Panics
    ///
    /// Panics if `cid` is not allocated.
    pub fn free_channel(&mut self, cid: ChannelId) {
        assert!(
            self.channels.remove(&cid).is_some(),
            "Fixed channel 0x{:04X} is not allocated",
            cid
        );
    }

    pub fn is_channel_allocated(&self, cid: ChannelId) -> bool {
        self.channels.contains_key(&cid)
    }

    pub fn find_channel(&self, cid: ChannelId) -> Option<Arc<Mutex<FixedChannelImpl>>> {
        self.channels.get(&cid).cloned()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Arc<Mutex<FixedChannelImpl>>> {
        self.channels.values()
    }

    pub fn allocated_cids(&self) -> impl Iterator<Item = ChannelId> + '_ {
        self.channels.keys().copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}
