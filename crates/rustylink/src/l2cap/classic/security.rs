//! Security hook consulted before accepting a remote channel

use crate::hci::PeerAddress;
use crate::l2cap::types::SecurityPolicy;

/// Decides whether a peer currently satisfies a service's security policy
pub trait SecurityEnforcement: Send + Sync {
    fn is_policy_satisfied(&self, peer: &PeerAddress, policy: SecurityPolicy) -> bool;
}

/// Accepts every peer for every policy
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl SecurityEnforcement for AllowAll {
    fn is_policy_satisfied(&self, _peer: &PeerAddress, _policy: SecurityPolicy) -> bool {
        true
    }
}
