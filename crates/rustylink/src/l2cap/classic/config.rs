//! Tunable parameters of the classic L2CAP core

use crate::l2cap::constants::L2CAP_DEFAULT_MTU;
use std::time::Duration;

/// Source of the timeouts and sizes the link layer runs with
pub trait ParameterProvider: Send + Sync {
    /// How long an ACL-U link may sit with no acquired channel before it is
    /// disconnected
    fn classic_link_idle_disconnect_timeout(&self) -> Duration;

    /// How long an LE-U link may sit with no acquired channel before it is
    /// disconnected
    fn le_link_idle_disconnect_timeout(&self) -> Duration;

    /// Response timeout for outstanding signalling requests
    fn signalling_rtx_timeout(&self) -> Duration {
        Duration::from_secs(3)
    }

    /// Response timeout once the peer has answered a request with "pending"
    fn signalling_ertx_timeout(&self) -> Duration {
        Duration::from_secs(60)
    }

    /// MTU offered in outgoing configuration requests
    fn local_mtu(&self) -> u16 {
        L2CAP_DEFAULT_MTU
    }
}

/// Plain parameter set, usable as a [`ParameterProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L2capConfig {
    pub classic_idle_timeout: Duration,
    pub le_idle_timeout: Duration,
    pub rtx_timeout: Duration,
    pub ertx_timeout: Duration,
    pub local_mtu: u16,
}

impl Default for L2capConfig {
    fn default() -> Self {
        Self {
            classic_idle_timeout: Duration::from_secs(20),
            le_idle_timeout: Duration::from_secs(20),
            rtx_timeout: Duration::from_secs(3),
            ertx_timeout: Duration::from_secs(60),
            local_mtu: L2CAP_DEFAULT_MTU,
        }
    }
}

impl ParameterProvider for L2capConfig {
    fn classic_link_idle_disconnect_timeout(&self) -> Duration {
        self.classic_idle_timeout
    }

    fn le_link_idle_disconnect_timeout(&self) -> Duration {
        self.le_idle_timeout
    }

    fn signalling_rtx_timeout(&self) -> Duration {
        self.rtx_timeout
    }

    fn signalling_ertx_timeout(&self) -> Duration {
        self.ertx_timeout
    }

    fn local_mtu(&self) -> u16 {
        self.local_mtu
    }
}
