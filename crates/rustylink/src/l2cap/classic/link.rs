//! One ACL link to a peer and the channels multiplexed over it
//!
//! A link owns the ACL connection, both channel allocators, the signalling
//! exchange with the peer and the idle-disconnect timer. All of its methods
//! run on the stack handler, under the link's mutex.

use super::config::ParameterProvider;
use super::dynamic_channel::{DynamicChannel, DynamicChannelImpl};
use super::dynamic_channel_allocator::DynamicChannelAllocator;
use super::dynamic_channel_service::{DynamicChannelService, DynamicChannelServiceManager};
use super::fixed_channel::FixedChannel;
use super::fixed_channel_allocator::FixedChannelAllocator;
use super::fixed_channel_service::FixedChannelService;
use super::pending::{
    ConnectionError, PendingDynamicChannelConnection, PendingFixedChannelConnection,
};
use super::security::SecurityEnforcement;
use super::signalling_manager::ClassicSignallingManager;
use crate::common::{Alarm, Handler};
use crate::hci::{AclConnection, DisconnectCallback, DisconnectReason, ErrorCode, PeerAddress};
use crate::l2cap::constants::*;
use crate::l2cap::psm::Psm;
use crate::l2cap::signaling::{SignalId, SignalingMessage};
use crate::l2cap::types::{
    ChannelId, ConfigOptions, ConnectionResponseResult, ConnectionType, ExtendedFeatures,
    FixedChannelsSupported, L2capError,
};
use log::{debug, error, info, trace, warn};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Where a link is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkState {
    /// ACL connection requested, outcome not known yet
    Connecting,
    /// ACL connection established
    Open,
    /// We asked the transport to disconnect; waiting for confirmation
    Disconnecting,
    /// ACL connection gone; every channel and request has been notified
    Closed,
}

/// Collaborators and parameters shared by every link of one manager
pub(crate) struct LinkContext {
    pub handler: Handler,
    pub dynamic_services: Arc<DynamicChannelServiceManager>,
    pub security: Arc<dyn SecurityEnforcement>,
    pub parameters: Arc<dyn ParameterProvider>,
    pub connection_type: ConnectionType,
}

impl LinkContext {
    fn idle_disconnect_timeout(&self) -> Duration {
        match self.connection_type {
            ConnectionType::Classic => self.parameters.classic_link_idle_disconnect_timeout(),
            ConnectionType::LE => self.parameters.le_link_idle_disconnect_timeout(),
        }
    }
}

/// An outbound dynamic channel request
struct PendingDynamicRequest {
    psm: Psm,
    /// Reserved once the connection request has been sent
    local_cid: Option<ChannelId>,
    request: PendingDynamicChannelConnection,
}

pub(crate) struct Link {
    peer: PeerAddress,
    state: LinkState,
    context: Arc<LinkContext>,
    connection: Option<Box<dyn AclConnection>>,
    fixed_channels: FixedChannelAllocator,
    dynamic_channels: DynamicChannelAllocator,
    pending_fixed: Vec<PendingFixedChannelConnection>,
    pending_dynamic: VecDeque<PendingDynamicRequest>,
    signalling: ClassicSignallingManager,
    acquired_count: usize,
    idle_alarm: Alarm,
    self_ref: Weak<Mutex<Link>>,
}

impl Link {
    pub fn new(peer: PeerAddress, context: Arc<LinkContext>) -> Arc<Mutex<Link>> {
        Arc::new_cyclic(|self_ref| {
            let rtx_timeout = context.parameters.signalling_rtx_timeout();
            let ertx_timeout = context.parameters.signalling_ertx_timeout();
            Mutex::new(Link {
                peer,
                state: LinkState::Connecting,
                connection: None,
                fixed_channels: FixedChannelAllocator::new(peer, self_ref.clone()),
                dynamic_channels: DynamicChannelAllocator::new(peer, self_ref.clone()),
                pending_fixed: Vec::new(),
                pending_dynamic: VecDeque::new(),
                signalling: ClassicSignallingManager::new(
                    context.handler.clone(),
                    rtx_timeout,
                    ertx_timeout,
                ),
                acquired_count: 0,
                idle_alarm: Alarm::new(context.handler.clone()),
                self_ref: self_ref.clone(),
                context,
            })
        })
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    #[cfg(test)]
    pub fn acquired_count(&self) -> usize {
        self.acquired_count
    }

    #[cfg(test)]
    pub fn is_idle_timer_armed(&self) -> bool {
        self.idle_alarm.is_armed()
    }

    #[cfg(test)]
    pub fn fixed_channel_count(&self) -> usize {
        self.fixed_channels.len()
    }

    #[cfg(test)]
    pub fn dynamic_channel_count(&self) -> usize {
        self.dynamic_channels.len()
    }

    // ACL lifecycle

    /// Take ownership of the established ACL connection
    pub fn on_acl_connected(
        &mut self,
        mut connection: Box<dyn AclConnection>,
        on_disconnect: DisconnectCallback,
    ) {
        assert_eq!(
            self.state,
            LinkState::Connecting,
            "ACL connected on a link that is not connecting"
        );
        connection.register_disconnect_callback(self.context.handler.clone(), on_disconnect);
        self.connection = Some(connection);
        self.state = LinkState::Open;
        info!("Link to {} is open", self.peer);

        self.acquired_count = 0;
        self.arm_idle_timer();
    }

    /// The ACL connection could not be established
    pub fn on_connect_fail(&mut self, reason: ErrorCode) {
        info!("Connection to {} failed: {}", self.peer, reason);
        self.fail_all_pending(ConnectionError::HciError(reason));
    }

    /// Terminal transition: notify every channel and every pending request
    pub fn on_acl_disconnected(&mut self, reason: ErrorCode) {
        info!("Link to {} closed: {}", self.peer, reason);
        self.state = LinkState::Closed;
        self.connection = None;
        self.idle_alarm.cancel();
        self.signalling.clear();

        let fixed_cids: Vec<ChannelId> = self.fixed_channels.allocated_cids().collect();
        for cid in fixed_cids {
            if let Some(channel) = self.fixed_channels.find_channel(cid) {
                channel.lock().unwrap().on_closed(reason);
            }
            self.fixed_channels.free_channel(cid);
        }
        for channel in self.dynamic_channels.channels() {
            channel.lock().unwrap().on_closed(reason);
        }
        self.dynamic_channels.clear();
        self.acquired_count = 0;

        self.fail_all_pending(ConnectionError::LinkClosed(reason));
    }

    fn fail_all_pending(&mut self, error: ConnectionError) {
        for pending in self.pending_fixed.drain(..) {
            pending.notify_failure(error);
        }
        for pending in self.pending_dynamic.drain(..) {
            pending.request.notify_failure(error);
        }
    }

    // Idle disconnect

    /// Recount acquired channels and arm or cancel the idle timer
    pub fn refresh_ref_count(&mut self) {
        let fixed = self
            .fixed_channels
            .channels()
            .filter(|channel| channel.lock().unwrap().is_acquired())
            .count();
        let dynamic = self
            .dynamic_channels
            .channels()
            .filter(|channel| channel.lock().unwrap().is_acquired())
            .count();

        let previous = self.acquired_count;
        self.acquired_count = fixed + dynamic;
        trace!(
            "Link to {} has {} acquired channels (was {})",
            self.peer,
            self.acquired_count,
            previous
        );

        if self.acquired_count > 0 {
            self.idle_alarm.cancel();
        } else if previous > 0 && self.state == LinkState::Open {
            self.arm_idle_timer();
        }
    }

    fn arm_idle_timer(&self) {
        let link = self.self_ref.clone();
        self.idle_alarm
            .schedule(self.context.idle_disconnect_timeout(), move || {
                if let Some(link) = link.upgrade() {
                    link.lock().unwrap().on_idle_timeout();
                }
            });
    }

    fn on_idle_timeout(&mut self) {
        // Acquisitions are flagged on the caller's thread before the
        // recount reaches this queue
        self.refresh_ref_count();
        if self.state != LinkState::Open || self.acquired_count > 0 {
            return;
        }
        info!("Link to {} idle, disconnecting", self.peer);
        if let Some(connection) = self.connection.as_mut() {
            connection.disconnect(DisconnectReason::RemoteUserTerminatedConnection);
        }
        self.state = LinkState::Disconnecting;
    }

    // Fixed channels

    /// Whether every service in `services` already has a channel here
    pub fn has_all_fixed_channels(&self, services: &[(ChannelId, Arc<FixedChannelService>)]) -> bool {
        services
            .iter()
            .all(|(cid, _)| self.fixed_channels.is_channel_allocated(*cid))
    }

    /// Create a channel for each service that lacks one and hand it over.
    ///
    /// Returns how many channels were created.
    pub fn create_missing_fixed_channels(
        &mut self,
        services: &[(ChannelId, Arc<FixedChannelService>)],
    ) -> usize {
        let mut created = 0;
        for (cid, service) in services {
            if self.fixed_channels.is_channel_allocated(*cid) {
                continue;
            }
            let channel = self
                .fixed_channels
                .allocate_channel(*cid, service.security_policy());
            debug!("Created fixed channel 0x{:04X} to {}", cid, self.peer);
            service.notify_channel_creation(FixedChannel::new(
                channel,
                self.context.handler.clone(),
            ));
            created += 1;
        }
        created
    }

    pub fn add_pending_fixed(&mut self, pending: PendingFixedChannelConnection) {
        self.pending_fixed.push(pending);
    }

    pub fn resolve_pending_fixed(&mut self) {
        for pending in self.pending_fixed.drain(..) {
            pending.notify_success(self.peer);
        }
    }

    // Dynamic channels, outbound

    /// Open a channel to `psm` now, or once the ACL connection is up
    pub fn connect_dynamic_channel(&mut self, psm: Psm, request: PendingDynamicChannelConnection) {
        match self.state {
            LinkState::Open => self.send_connection_request(psm, request),
            // Resolved once the ACL outcome is known
            _ => self.pending_dynamic.push_back(PendingDynamicRequest {
                psm,
                local_cid: None,
                request,
            }),
        }
    }

    /// Send the connection requests queued while the link was connecting
    pub fn start_pending_dynamic(&mut self) {
        let waiting: Vec<PendingDynamicRequest> = self.pending_dynamic.drain(..).collect();
        for pending in waiting {
            self.send_connection_request(pending.psm, pending.request);
        }
    }

    /// Reserve a local CID and ask the peer for a channel to `psm`
    pub fn send_connection_request(&mut self, psm: Psm, request: PendingDynamicChannelConnection) {
        let in_flight = self
            .pending_dynamic
            .iter()
            .any(|pending| pending.psm == psm && pending.local_cid.is_some());
        if in_flight || self.dynamic_channels.is_psm_used(psm) {
            request.notify_failure(ConnectionError::PsmInUse);
            return;
        }

        let Some(local_cid) = self.dynamic_channels.reserve_channel() else {
            warn!("No dynamic CID left on link to {}", self.peer);
            request.notify_failure(ConnectionError::NoResourcesAvailable);
            return;
        };

        debug!(
            "Connecting {} on CID 0x{:04X} to {}",
            psm, local_cid, self.peer
        );
        self.pending_dynamic.push_back(PendingDynamicRequest {
            psm,
            local_cid: Some(local_cid),
            request,
        });
        let identifier = self.signalling.next_identifier();
        self.send_request(SignalingMessage::ConnectionRequest {
            identifier,
            psm,
            source_cid: local_cid,
        });
    }

    fn take_pending_dynamic(&mut self, local_cid: ChannelId) -> Option<PendingDynamicRequest> {
        let index = self
            .pending_dynamic
            .iter()
            .position(|pending| pending.local_cid == Some(local_cid))?;
        self.pending_dynamic.remove(index)
    }

    fn fail_outgoing_connection(&mut self, local_cid: ChannelId, error: ConnectionError) {
        self.dynamic_channels.free_channel(local_cid);
        match self.take_pending_dynamic(local_cid) {
            Some(pending) => pending.request.notify_failure(error),
            None => warn!("No pending request on CID 0x{:04X}", local_cid),
        }
    }

    // Dynamic channels, inbound

    /// Create a channel for a connection request from the peer.
    ///
    /// The PSM must have a registered service whose security policy the peer
    /// satisfies. On refusal the result to answer with is returned.
    pub fn allocate_dynamic_channel(
        &mut self,
        psm: Psm,
        remote_cid: ChannelId,
    ) -> Result<(Arc<Mutex<DynamicChannelImpl>>, Arc<DynamicChannelService>), ConnectionResponseResult>
    {
        let service = self
            .context
            .dynamic_services
            .get_service(psm)
            .ok_or(ConnectionResponseResult::PsmNotSupported)?;

        if !(L2CAP_DYNAMIC_CID_MIN..=L2CAP_DYNAMIC_CID_MAX).contains(&remote_cid) {
            return Err(ConnectionResponseResult::InvalidSourceCid);
        }
        if self
            .dynamic_channels
            .find_channel_by_remote_cid(remote_cid)
            .is_some()
        {
            return Err(ConnectionResponseResult::SourceCidAlreadyAllocated);
        }
        if !self
            .context
            .security
            .is_policy_satisfied(&self.peer, service.security_policy())
        {
            return Err(ConnectionResponseResult::SecurityBlock);
        }

        let channel = self
            .dynamic_channels
            .allocate_channel(psm, remote_cid, service.security_policy())
            .ok_or(ConnectionResponseResult::NoResourcesAvailable)?;
        Ok((channel, service))
    }

    /// Start disconnecting a dynamic channel at the user's request
    pub fn close_dynamic_channel(&mut self, local_cid: ChannelId) {
        if self.connection.is_none() {
            return;
        }
        let Some(channel) = self.dynamic_channels.find_channel_by_cid(local_cid) else {
            debug!("Dynamic channel 0x{:04X} already gone", local_cid);
            return;
        };

        let remote_cid = {
            let mut channel = channel.lock().unwrap();
            if !channel.start_disconnecting() {
                return;
            }
            channel.remote_cid()
        };
        let identifier = self.signalling.next_identifier();
        self.send_request(SignalingMessage::DisconnectionRequest {
            identifier,
            destination_cid: remote_cid,
            source_cid: local_cid,
        });
    }

    /// Notify and drop a dynamic channel once its disconnection is settled
    fn finish_dynamic_channel(&mut self, local_cid: ChannelId) {
        let Some(channel) = self.dynamic_channels.find_channel_by_cid(local_cid) else {
            return;
        };
        {
            let mut channel = channel.lock().unwrap();
            if !channel.is_closed() {
                channel.on_closed(ErrorCode::SUCCESS);
            }
        }
        debug!("Dynamic channel 0x{:04X} to {} closed", local_cid, self.peer);
        self.dynamic_channels.free_channel(local_cid);
        self.refresh_ref_count();
    }

    /// Settle a disconnection we requested, for a channel or a bare reservation
    fn settle_disconnection(&mut self, local_cid: ChannelId) {
        if self.dynamic_channels.find_channel_by_cid(local_cid).is_some() {
            self.finish_dynamic_channel(local_cid);
        } else {
            self.dynamic_channels.free_channel(local_cid);
        }
    }

    // Signalling

    /// Handle a payload received on the signalling channel
    pub fn on_signalling_pdu(&mut self, payload: &[u8]) {
        if self.connection.is_none() {
            warn!("Signalling PDU for {} without a connection", self.peer);
            return;
        }

        for command in SignalingMessage::parse_frame(payload) {
            match command {
                Ok(message) => self.handle_signal(message),
                Err(L2capError::UnknownCommand { identifier, code }) => {
                    warn!("Unknown signalling command 0x{:02X} from {}", code, self.peer);
                    self.send_signal(&SignalingMessage::CommandReject {
                        identifier,
                        reason: L2CAP_REJECT_NOT_UNDERSTOOD,
                        data: vec![],
                    });
                }
                Err(e) => {
                    warn!(
                        "Dropping signalling PDU from {}: {} ({})",
                        self.peer,
                        e,
                        hex::encode(payload)
                    );
                    return;
                }
            }
        }
    }

    fn handle_signal(&mut self, message: SignalingMessage) {
        trace!("{} -> {:?}", self.peer, message);
        match message {
            SignalingMessage::CommandReject {
                identifier, reason, ..
            } => self.on_command_reject(identifier, reason),

            SignalingMessage::ConnectionRequest {
                identifier,
                psm,
                source_cid,
            } => self.on_connection_request(identifier, psm, source_cid),

            SignalingMessage::ConnectionResponse {
                identifier,
                destination_cid,
                source_cid,
                result,
                ..
            } => self.on_connection_response(identifier, destination_cid, source_cid, result),

            SignalingMessage::ConfigureRequest {
                identifier,
                destination_cid,
                flags,
                options,
            } => self.on_configure_request(identifier, destination_cid, flags, options),

            SignalingMessage::ConfigureResponse {
                identifier, result, ..
            } => self.on_configure_response(identifier, result),

            SignalingMessage::DisconnectionRequest {
                identifier,
                destination_cid,
                source_cid,
            } => self.on_disconnection_request(identifier, destination_cid, source_cid),

            SignalingMessage::DisconnectionResponse {
                identifier,
                source_cid,
                ..
            } => self.on_disconnection_response(identifier, source_cid),

            SignalingMessage::EchoRequest { identifier, data } => {
                self.send_signal(&SignalingMessage::EchoResponse { identifier, data });
            }

            SignalingMessage::InformationRequest {
                identifier,
                info_type,
            } => self.on_information_request(identifier, info_type),

            SignalingMessage::EchoResponse { identifier, .. }
            | SignalingMessage::InformationResponse { identifier, .. } => {
                if self.signalling.complete(identifier).is_some() {
                    self.send_next_request();
                } else {
                    warn!("Unexpected response {} from {}", identifier, self.peer);
                }
            }
        }
    }

    fn on_command_reject(&mut self, identifier: SignalId, reason: u16) {
        let Some(request) = self.signalling.complete(identifier) else {
            warn!("Command reject {} from {} matches nothing", identifier, self.peer);
            return;
        };

        match request {
            SignalingMessage::ConnectionRequest { source_cid, .. } => {
                self.fail_outgoing_connection(source_cid, ConnectionError::CommandRejected(reason));
            }
            SignalingMessage::DisconnectionRequest { source_cid, .. } => {
                self.settle_disconnection(source_cid);
            }
            request => warn!(
                "{} rejected {:?} (reason 0x{:04X})",
                self.peer, request, reason
            ),
        }
        self.send_next_request();
    }

    fn on_connection_request(&mut self, identifier: SignalId, psm: Psm, remote_cid: ChannelId) {
        match self.allocate_dynamic_channel(psm, remote_cid) {
            Err(result) => {
                info!("Refusing {} from {}: {}", psm, self.peer, result);
                self.send_signal(&SignalingMessage::ConnectionResponse {
                    identifier,
                    destination_cid: L2CAP_NULL_CID,
                    source_cid: remote_cid,
                    result,
                    status: 0,
                });
            }
            Ok((channel, service)) => {
                let local_cid = channel.lock().unwrap().cid();
                info!(
                    "Accepted {} from {} on CID 0x{:04X}",
                    psm, self.peer, local_cid
                );
                self.send_signal(&SignalingMessage::ConnectionResponse {
                    identifier,
                    destination_cid: local_cid,
                    source_cid: remote_cid,
                    result: ConnectionResponseResult::Success,
                    status: 0,
                });
                self.send_configure_request(remote_cid);
                service.notify_channel_creation(DynamicChannel::new(
                    channel,
                    self.context.handler.clone(),
                ));
            }
        }
    }

    fn on_connection_response(
        &mut self,
        identifier: SignalId,
        remote_cid: ChannelId,
        local_cid: ChannelId,
        result: ConnectionResponseResult,
    ) {
        match self.signalling.outstanding() {
            Some(SignalingMessage::ConnectionRequest {
                identifier: outstanding,
                source_cid,
                ..
            }) if *outstanding == identifier && *source_cid == local_cid => {}
            _ => {
                warn!(
                    "Unexpected connection response {} from {}",
                    identifier, self.peer
                );
                return;
            }
        }

        if result == ConnectionResponseResult::Pending {
            debug!("Connection on CID 0x{:04X} pending", local_cid);
            self.signalling.arm_ertx(self.self_ref.clone(), identifier);
            return;
        }
        self.signalling.complete(identifier);

        let Some(pending) = self.take_pending_dynamic(local_cid) else {
            warn!("No pending request on CID 0x{:04X}", local_cid);
            self.dynamic_channels.free_channel(local_cid);
            self.send_next_request();
            return;
        };

        if result != ConnectionResponseResult::Success {
            info!("{} refused {}: {}", self.peer, pending.psm, result);
            self.dynamic_channels.free_channel(local_cid);
            pending
                .request
                .notify_failure(ConnectionError::Rejected(result));
            self.send_next_request();
            return;
        }

        let security_policy = self
            .context
            .dynamic_services
            .get_service(pending.psm)
            .map(|service| service.security_policy())
            .unwrap_or_default();
        match self.dynamic_channels.allocate_reserved_channel(
            local_cid,
            pending.psm,
            remote_cid,
            security_policy,
        ) {
            Some(channel) => {
                info!(
                    "Connected {} to {} on CID 0x{:04X}",
                    pending.psm, self.peer, local_cid
                );
                self.send_configure_request(remote_cid);
                pending.request.notify_success(DynamicChannel::new(
                    channel,
                    self.context.handler.clone(),
                ));
            }
            None => {
                // The reservation is held until the peer confirms
                pending.request.notify_failure(ConnectionError::PsmInUse);
                let identifier = self.signalling.next_identifier();
                self.send_request(SignalingMessage::DisconnectionRequest {
                    identifier,
                    destination_cid: remote_cid,
                    source_cid: local_cid,
                });
            }
        }
        self.send_next_request();
    }

    fn send_configure_request(&mut self, remote_cid: ChannelId) {
        let identifier = self.signalling.next_identifier();
        self.send_request(SignalingMessage::ConfigureRequest {
            identifier,
            destination_cid: remote_cid,
            flags: 0,
            options: ConfigOptions {
                mtu: Some(self.context.parameters.local_mtu()),
                flush_timeout: None,
            },
        });
    }

    fn on_configure_request(
        &mut self,
        identifier: SignalId,
        local_cid: ChannelId,
        flags: u16,
        options: ConfigOptions,
    ) {
        let Some(channel) = self.dynamic_channels.find_channel_by_cid(local_cid) else {
            self.reject_invalid_cid(identifier, local_cid, L2CAP_NULL_CID);
            return;
        };

        let mut channel = channel.lock().unwrap();
        let remote_cid = channel.remote_cid();
        let response = match options.mtu {
            Some(mtu) if mtu < L2CAP_MIN_MTU => {
                warn!("{} offered MTU {} on CID 0x{:04X}", self.peer, mtu, local_cid);
                SignalingMessage::ConfigureResponse {
                    identifier,
                    source_cid: remote_cid,
                    flags: 0,
                    result: L2CAP_CONF_UNACCEPTABLE_PARAMS,
                    options: ConfigOptions {
                        mtu: Some(L2CAP_MIN_MTU),
                        flush_timeout: None,
                    },
                }
            }
            mtu => {
                if let Some(mtu) = mtu {
                    channel.set_remote_mtu(mtu);
                }
                if flags & L2CAP_CONF_FLAG_CONTINUATION == 0 {
                    channel.set_remote_configured();
                }
                SignalingMessage::ConfigureResponse {
                    identifier,
                    source_cid: remote_cid,
                    flags: flags & L2CAP_CONF_FLAG_CONTINUATION,
                    result: L2CAP_CONF_SUCCESS,
                    options: ConfigOptions::default(),
                }
            }
        };
        if channel.is_configured() {
            info!("Dynamic channel 0x{:04X} to {} is open", local_cid, self.peer);
        }
        drop(channel);
        self.send_signal(&response);
    }

    fn on_configure_response(&mut self, identifier: SignalId, result: u16) {
        let remote_cid = match self.signalling.outstanding() {
            Some(SignalingMessage::ConfigureRequest {
                identifier: outstanding,
                destination_cid,
                ..
            }) if *outstanding == identifier => *destination_cid,
            _ => {
                warn!("Unexpected configure response {} from {}", identifier, self.peer);
                return;
            }
        };

        if result == L2CAP_CONF_PENDING {
            self.signalling.arm_ertx(self.self_ref.clone(), identifier);
            return;
        }
        self.signalling.complete(identifier);

        if let Some(channel) = self.dynamic_channels.find_channel_by_remote_cid(remote_cid) {
            let local_cid = {
                let mut channel = channel.lock().unwrap();
                if result == L2CAP_CONF_SUCCESS {
                    channel.set_local_configured();
                    if channel.is_configured() {
                        info!(
                            "Dynamic channel 0x{:04X} to {} is open",
                            channel.cid(),
                            self.peer
                        );
                    }
                    None
                } else {
                    Some(channel.cid())
                }
            };
            if let Some(local_cid) = local_cid {
                warn!(
                    "{} refused configuration of CID 0x{:04X} (result 0x{:04X})",
                    self.peer, local_cid, result
                );
                self.close_dynamic_channel(local_cid);
            }
        }
        self.send_next_request();
    }

    fn on_disconnection_request(
        &mut self,
        identifier: SignalId,
        local_cid: ChannelId,
        remote_cid: ChannelId,
    ) {
        let known = self
            .dynamic_channels
            .find_channel_by_cid(local_cid)
            .is_some_and(|channel| channel.lock().unwrap().remote_cid() == remote_cid);
        if !known {
            self.reject_invalid_cid(identifier, local_cid, remote_cid);
            return;
        }

        self.send_signal(&SignalingMessage::DisconnectionResponse {
            identifier,
            destination_cid: local_cid,
            source_cid: remote_cid,
        });
        self.finish_dynamic_channel(local_cid);
    }

    fn on_disconnection_response(&mut self, identifier: SignalId, local_cid: ChannelId) {
        match self.signalling.outstanding() {
            Some(SignalingMessage::DisconnectionRequest {
                identifier: outstanding,
                source_cid,
                ..
            }) if *outstanding == identifier && *source_cid == local_cid => {}
            _ => {
                warn!(
                    "Unexpected disconnection response {} from {}",
                    identifier, self.peer
                );
                return;
            }
        }
        self.signalling.complete(identifier);
        self.settle_disconnection(local_cid);
        self.send_next_request();
    }

    fn on_information_request(&mut self, identifier: SignalId, info_type: u16) {
        let (result, data) = match info_type {
            L2CAP_INFO_CONNECTIONLESS_MTU => (
                L2CAP_INFO_SUCCESS,
                self.context.parameters.local_mtu().to_le_bytes().to_vec(),
            ),
            L2CAP_INFO_EXTENDED_FEATURES => (
                L2CAP_INFO_SUCCESS,
                ExtendedFeatures::FIXED_CHANNELS.bits().to_le_bytes().to_vec(),
            ),
            L2CAP_INFO_FIXED_CHANNELS => {
                let supported = self
                    .fixed_channels
                    .allocated_cids()
                    .fold(FixedChannelsSupported::SIGNALING, |mask, cid| {
                        mask | FixedChannelsSupported::for_cid(cid)
                    });
                (L2CAP_INFO_SUCCESS, supported.bits().to_le_bytes().to_vec())
            }
            _ => (L2CAP_INFO_NOT_SUPPORTED, vec![]),
        };

        self.send_signal(&SignalingMessage::InformationResponse {
            identifier,
            info_type,
            result,
            data,
        });
    }

    /// A request went unanswered for the RTX timeout
    pub fn on_signalling_timeout(&mut self, identifier: SignalId) {
        let Some(request) = self.signalling.complete(identifier) else {
            return;
        };
        warn!(
            "Signalling request {} to {} timed out",
            identifier, self.peer
        );

        match request {
            SignalingMessage::ConnectionRequest { source_cid, .. } => {
                self.fail_outgoing_connection(source_cid, ConnectionError::Timeout);
            }
            SignalingMessage::ConfigureRequest {
                destination_cid, ..
            } => {
                let local_cid = self
                    .dynamic_channels
                    .find_channel_by_remote_cid(destination_cid)
                    .map(|channel| channel.lock().unwrap().cid());
                if let Some(local_cid) = local_cid {
                    self.close_dynamic_channel(local_cid);
                }
            }
            SignalingMessage::DisconnectionRequest { source_cid, .. } => {
                self.settle_disconnection(source_cid);
            }
            _ => {}
        }
        self.send_next_request();
    }

    fn reject_invalid_cid(&mut self, identifier: SignalId, local_cid: ChannelId, remote_cid: ChannelId) {
        warn!(
            "{} referenced unknown CID 0x{:04X}",
            self.peer, local_cid
        );
        let mut data = Vec::with_capacity(4);
        data.extend_from_slice(&local_cid.to_le_bytes());
        data.extend_from_slice(&remote_cid.to_le_bytes());
        self.send_signal(&SignalingMessage::CommandReject {
            identifier,
            reason: L2CAP_REJECT_INVALID_CID,
            data,
        });
    }

    fn send_request(&mut self, request: SignalingMessage) {
        if let Some(request) = self.signalling.submit(request) {
            self.transmit_request(request);
        }
    }

    fn send_next_request(&mut self) {
        if let Some(request) = self.signalling.advance() {
            self.transmit_request(request);
        }
    }

    fn transmit_request(&mut self, request: SignalingMessage) {
        self.signalling
            .arm_rtx(self.self_ref.clone(), request.identifier());
        self.send_signal(&request);
    }

    fn send_signal(&mut self, message: &SignalingMessage) {
        match self.connection.as_mut() {
            Some(connection) => {
                trace!("{} <- {:?}", self.peer, message);
                connection.send_pdu(L2CAP_SIGNALING_CID, message.serialize());
            }
            None => error!(
                "No connection to {} for signalling command {}",
                self.peer,
                message.command_code()
            ),
        }
    }
}
