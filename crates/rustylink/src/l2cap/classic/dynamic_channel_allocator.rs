//! Per-link bookkeeping of dynamic CIDs and the PSMs bound to them
//!
//! Local CIDs are handed out in two phases: a CID can be reserved so that a
//! connection request naming it goes out before the channel exists, and is
//! later bound to a full channel once the peer answers.

use super::dynamic_channel::DynamicChannelImpl;
use super::link::Link;
use crate::hci::PeerAddress;
use crate::l2cap::constants::{L2CAP_DYNAMIC_CID_MAX, L2CAP_DYNAMIC_CID_MIN};
use crate::l2cap::psm::Psm;
use crate::l2cap::types::{ChannelId, SecurityPolicy};
use log::warn;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, Weak};

pub(crate) struct DynamicChannelAllocator {
    peer: PeerAddress,
    link: Weak<Mutex<Link>>,
    channels: BTreeMap<ChannelId, Arc<Mutex<DynamicChannelImpl>>>,
    reserved: BTreeSet<ChannelId>,
    used_psm: BTreeSet<Psm>,
}

impl DynamicChannelAllocator {
    pub fn new(peer: PeerAddress, link: Weak<Mutex<Link>>) -> Self {
        Self {
            peer,
            link,
            channels: BTreeMap::new(),
            reserved: BTreeSet::new(),
            used_psm: BTreeSet::new(),
        }
    }

    /// Claim the lowest free local CID without creating a channel.
    ///
    /// Returns `None` when the dynamic range is exhausted.
    pub fn reserve_channel(&mut self) -> Option<ChannelId> {
        let cid = (L2CAP_DYNAMIC_CID_MIN..=L2CAP_DYNAMIC_CID_MAX)
            .find(|cid| !self.reserved.contains(cid) && !self.channels.contains_key(cid))?;
        self.reserved.insert(cid);
        Some(cid)
    }

    /// Create a channel on a fresh local CID.
    ///
    /// Returns `None` if `psm` is already bound on this link or no CID is
    /// left.
    pub fn allocate_channel(
        &mut self,
        psm: Psm,
        remote_cid: ChannelId,
        security_policy: SecurityPolicy,
    ) -> Option<Arc<Mutex<DynamicChannelImpl>>> {
        if self.is_psm_used(psm) {
            warn!("{} already in use on {}", psm, self.peer);
            return None;
        }
        let cid = self.reserve_channel()?;
        self.allocate_reserved_channel(cid, psm, remote_cid, security_policy)
    }

    /// Bind a reserved CID into a channel.
    ///
    /// Returns `None`, keeping the reservation, if `psm` is already bound on
    /// this link.
    ///
    /// # Panics
    ///
    /// Panics if `reserved` was not reserved.
    pub fn allocate_reserved_channel(
        &mut self,
        reserved: ChannelId,
        psm: Psm,
        remote_cid: ChannelId,
        security_policy: SecurityPolicy,
    ) -> Option<Arc<Mutex<DynamicChannelImpl>>> {
        assert!(
            self.reserved.contains(&reserved),
            "CID 0x{:04X} was not reserved",
            reserved
        );
        if self.is_psm_used(psm) {
            warn!("{} already in use on {}", psm, self.peer);
            return None;
        }

        self.reserved.remove(&reserved);
        self.used_psm.insert(psm);
        let channel = Arc::new(Mutex::new(DynamicChannelImpl::new(
            reserved,
            remote_cid,
            psm,
            self.peer,
            security_policy,
            self.link.clone(),
        )));
        self.channels.insert(reserved, channel.clone());
        Some(channel)
    }

    /// Drop the channel or reservation on `cid`, releasing its PSM
    pub fn free_channel(&mut self, cid: ChannelId) {
        if self.reserved.remove(&cid) {
            return;
        }
        match self.channels.remove(&cid) {
            Some(channel) => {
                let psm = channel.lock().unwrap().psm();
                self.used_psm.remove(&psm);
            }
            None => warn!("Freeing unknown dynamic CID 0x{:04X} on {}", cid, self.peer),
        }
    }

    pub fn is_psm_used(&self, psm: Psm) -> bool {
        self.used_psm.contains(&psm)
    }

    #[cfg(test)]
    pub fn is_reserved(&self, cid: ChannelId) -> bool {
        self.reserved.contains(&cid)
    }

    pub fn find_channel_by_cid(&self, cid: ChannelId) -> Option<Arc<Mutex<DynamicChannelImpl>>> {
        self.channels.get(&cid).cloned()
    }

    pub fn find_channel_by_remote_cid(
        &self,
        remote_cid: ChannelId,
    ) -> Option<Arc<Mutex<DynamicChannelImpl>>> {
        self.channels
            .values()
            .find(|channel| channel.lock().unwrap().remote_cid() == remote_cid)
            .cloned()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Arc<Mutex<DynamicChannelImpl>>> {
        self.channels.values()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn clear(&mut self) {
        self.channels.clear();
        self.reserved.clear();
        self.used_psm.clear();
    }
}
