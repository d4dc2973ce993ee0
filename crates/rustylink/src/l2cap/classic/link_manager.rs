//! Peer-to-link map and ACL connection orchestration
//!
//! The [`LinkManager`] is the single owner of every [`Link`] and the only
//! receiver of ACL connection outcomes. Its public methods may be called
//! from any thread; they post the work onto the stack handler, where all
//! link and channel state is mutated.

use super::config::ParameterProvider;
use super::dynamic_channel_service::DynamicChannelServiceManager;
use super::fixed_channel_service::FixedChannelServiceManager;
use super::link::{Link, LinkContext, LinkState};
use super::pending::{ConnectionError, PendingDynamicChannelConnection, PendingFixedChannelConnection};
use super::security::{AllowAll, SecurityEnforcement};
use crate::common::Handler;
use crate::hci::{AclConnection, AclManager, ConnectionCallbacks, DisconnectReason, ErrorCode, PeerAddress};
use crate::l2cap::psm::Psm;
use crate::l2cap::types::{ConnectionResponseResult, ConnectionType};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// Owner of all classic links of one stack instance
pub struct LinkManager {
    handler: Handler,
    acl_manager: Arc<dyn AclManager>,
    fixed_services: Arc<FixedChannelServiceManager>,
    context: Arc<LinkContext>,
    links: Mutex<HashMap<PeerAddress, Arc<Mutex<Link>>>>,
}

impl LinkManager {
    /// Create a manager for classic links that accepts every peer
    pub fn new(
        handler: Handler,
        acl_manager: Arc<dyn AclManager>,
        fixed_services: Arc<FixedChannelServiceManager>,
        dynamic_services: Arc<DynamicChannelServiceManager>,
        parameters: Arc<dyn ParameterProvider>,
    ) -> Arc<Self> {
        Self::with_options(
            handler,
            acl_manager,
            fixed_services,
            dynamic_services,
            parameters,
            Arc::new(AllowAll),
            ConnectionType::Classic,
        )
    }

    /// Create a manager with an explicit security hook and link type.
    ///
    /// The manager registers itself with `acl_manager` for connection
    /// outcomes, delivered on `handler`.
    pub fn with_options(
        handler: Handler,
        acl_manager: Arc<dyn AclManager>,
        fixed_services: Arc<FixedChannelServiceManager>,
        dynamic_services: Arc<DynamicChannelServiceManager>,
        parameters: Arc<dyn ParameterProvider>,
        security: Arc<dyn SecurityEnforcement>,
        connection_type: ConnectionType,
    ) -> Arc<Self> {
        let manager = Arc::new(Self {
            handler: handler.clone(),
            acl_manager,
            fixed_services,
            context: Arc::new(LinkContext {
                handler: handler.clone(),
                dynamic_services,
                security,
                parameters,
                connection_type,
            }),
            links: Mutex::new(HashMap::new()),
        });

        let callbacks: Arc<dyn ConnectionCallbacks> = Arc::new(LinkManagerCallbacks {
            manager: Arc::downgrade(&manager),
        });
        manager.acl_manager.register_callbacks(callbacks, handler);
        manager
    }

    /// Stack handler all link state lives on
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Connect every registered fixed channel service to `peer`.
    ///
    /// Channels are handed to their services; `pending` learns whether the
    /// peer is connected.
    pub fn connect_fixed_channel_services(
        self: &Arc<Self>,
        peer: PeerAddress,
        pending: PendingFixedChannelConnection,
    ) {
        let manager = self.clone();
        self.handler
            .post(move || manager.handle_connect_fixed_channel_services(peer, pending));
    }

    /// Open a dynamic channel to `psm` on `peer`, connecting first if needed
    pub fn connect_dynamic_channel(
        self: &Arc<Self>,
        peer: PeerAddress,
        psm: Psm,
        pending: PendingDynamicChannelConnection,
    ) {
        let manager = self.clone();
        self.handler
            .post(move || manager.handle_connect_dynamic_channel(peer, psm, pending));
    }

    /// Abort an outstanding ACL connection attempt to `peer`.
    ///
    /// Requests queued on the link fail once the transport reports the
    /// aborted connection.
    pub fn cancel_connection(self: &Arc<Self>, peer: PeerAddress) {
        let manager = self.clone();
        self.handler
            .post(move || manager.handle_cancel_connection(peer));
    }

    /// Deliver a payload received on the signalling channel of `peer`
    pub fn on_signalling_pdu(self: &Arc<Self>, peer: PeerAddress, payload: Vec<u8>) {
        let manager = self.clone();
        self.handler.post(move || match manager.find_link(&peer) {
            Some(link) => link.lock().unwrap().on_signalling_pdu(&payload),
            None => warn!(
                "Signalling PDU for unknown peer {}: {}",
                peer,
                hex::encode(&payload)
            ),
        });
    }

    /// Whether a link to `peer` exists, connecting or connected
    pub fn has_link(&self, peer: &PeerAddress) -> bool {
        self.links.lock().unwrap().contains_key(peer)
    }

    pub fn link_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    pub(crate) fn find_link(&self, peer: &PeerAddress) -> Option<Arc<Mutex<Link>>> {
        self.links.lock().unwrap().get(peer).cloned()
    }

    fn create_link(&self, peer: PeerAddress) -> Arc<Mutex<Link>> {
        let link = Link::new(peer, self.context.clone());
        self.links.lock().unwrap().insert(peer, link.clone());
        link
    }

    fn handle_connect_fixed_channel_services(
        &self,
        peer: PeerAddress,
        pending: PendingFixedChannelConnection,
    ) {
        let services = self.fixed_services.get_registered_services();
        if services.is_empty() {
            debug!("No fixed channel service to connect to {}", peer);
            pending.notify_failure(ConnectionError::NoServiceRegistered);
            return;
        }

        if let Some(link) = self.find_link(&peer) {
            let mut link = link.lock().unwrap();
            if link.state() != LinkState::Open {
                link.add_pending_fixed(pending);
            } else if link.has_all_fixed_channels(&services) {
                pending.notify_failure(ConnectionError::AllServicesHaveChannel);
            } else {
                link.create_missing_fixed_channels(&services);
                pending.notify_success(peer);
            }
            return;
        }

        let link = self.create_link(peer);
        link.lock().unwrap().add_pending_fixed(pending);
        info!("Creating ACL connection to {}", peer);
        self.acl_manager.create_connection(peer);
    }

    fn handle_connect_dynamic_channel(
        &self,
        peer: PeerAddress,
        psm: Psm,
        pending: PendingDynamicChannelConnection,
    ) {
        if !psm.is_valid() {
            warn!("Refusing to connect to invalid {}", psm);
            pending.notify_failure(ConnectionError::Rejected(
                ConnectionResponseResult::PsmNotSupported,
            ));
            return;
        }

        if let Some(link) = self.find_link(&peer) {
            link.lock().unwrap().connect_dynamic_channel(psm, pending);
            return;
        }

        let link = self.create_link(peer);
        link.lock().unwrap().connect_dynamic_channel(psm, pending);
        info!("Creating ACL connection to {}", peer);
        self.acl_manager.create_connection(peer);
    }

    fn handle_cancel_connection(&self, peer: PeerAddress) {
        let connecting = self
            .find_link(&peer)
            .is_some_and(|link| link.lock().unwrap().state() == LinkState::Connecting);
        if connecting {
            info!("Cancelling ACL connection to {}", peer);
            self.acl_manager.cancel_connect(peer);
        } else {
            debug!("No connection attempt to {} to cancel", peer);
        }
    }

    fn on_connect_success(self: &Arc<Self>, peer: PeerAddress, mut connection: Box<dyn AclConnection>) {
        debug_assert!(self.handler.is_current());

        let link = self.find_link(&peer).unwrap_or_else(|| {
            warn!("ACL connected to {} without a pending link", peer);
            self.create_link(peer)
        });
        let services = self.fixed_services.get_registered_services();

        let mut link = link.lock().unwrap();
        if link.state() != LinkState::Connecting {
            error!("Already connected to {}, dropping new ACL connection", peer);
            connection.disconnect(DisconnectReason::RemoteUserTerminatedConnection);
            return;
        }

        let manager = Arc::downgrade(self);
        link.on_acl_connected(
            connection,
            Box::new(move |reason| {
                if let Some(manager) = manager.upgrade() {
                    manager.on_disconnect(peer, reason);
                }
            }),
        );
        link.create_missing_fixed_channels(&services);
        link.resolve_pending_fixed();
        link.start_pending_dynamic();
    }

    fn on_connect_fail(&self, peer: PeerAddress, reason: ErrorCode) {
        debug_assert!(self.handler.is_current());

        let Some(link) = self.find_link(&peer) else {
            warn!("Connection failure for {} without a pending link", peer);
            return;
        };
        {
            let mut link = link.lock().unwrap();
            if link.state() != LinkState::Connecting {
                warn!(
                    "Ignoring connection failure for {}: link is {:?}",
                    peer,
                    link.state()
                );
                return;
            }
            link.on_connect_fail(reason);
        }
        self.links.lock().unwrap().remove(&peer);
    }

    fn on_disconnect(&self, peer: PeerAddress, reason: ErrorCode) {
        debug_assert!(self.handler.is_current());

        let Some(link) = self.find_link(&peer) else {
            warn!("Disconnection of {} without a link", peer);
            return;
        };
        link.lock().unwrap().on_acl_disconnected(reason);
        self.links.lock().unwrap().remove(&peer);
    }
}

/// Receives ACL outcomes on behalf of a [`LinkManager`] without keeping it
/// alive
struct LinkManagerCallbacks {
    manager: Weak<LinkManager>,
}

impl ConnectionCallbacks for LinkManagerCallbacks {
    fn on_connect_success(&self, peer: PeerAddress, connection: Box<dyn AclConnection>) {
        if let Some(manager) = self.manager.upgrade() {
            manager.on_connect_success(peer, connection);
        }
    }

    fn on_connect_fail(&self, peer: PeerAddress, reason: ErrorCode) {
        if let Some(manager) = self.manager.upgrade() {
            manager.on_connect_fail(peer, reason);
        }
    }
}
