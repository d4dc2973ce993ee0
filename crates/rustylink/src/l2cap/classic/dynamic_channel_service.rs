//! Registry of services accepting dynamic channels on a PSM

use super::dynamic_channel::DynamicChannel;
use crate::common::Handler;
use crate::l2cap::psm::Psm;
use crate::l2cap::types::{L2capError, L2capResult, SecurityPolicy};
use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// Invoked with each channel a peer opens to a service
pub type OnDynamicChannelOpen = Arc<dyn Fn(DynamicChannel) + Send + Sync + 'static>;

/// A registered listener on one PSM
pub struct DynamicChannelService {
    psm: Psm,
    security_policy: SecurityPolicy,
    handler: Handler,
    on_channel_open: OnDynamicChannelOpen,
}

impl DynamicChannelService {
    pub fn psm(&self) -> Psm {
        self.psm
    }

    pub fn security_policy(&self) -> SecurityPolicy {
        self.security_policy
    }

    /// Hand a channel opened by the peer to the service on its handler
    pub fn notify_channel_creation(&self, channel: DynamicChannel) {
        let on_channel_open = self.on_channel_open.clone();
        self.handler.post(move || on_channel_open(channel));
    }
}

#[derive(Default)]
pub struct DynamicChannelServiceManager {
    services: Mutex<BTreeMap<Psm, Arc<DynamicChannelService>>>,
}

impl DynamicChannelServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(
        &self,
        psm: Psm,
        security_policy: SecurityPolicy,
        handler: Handler,
        on_channel_open: F,
    ) -> L2capResult<()>
    where
        F: Fn(DynamicChannel) + Send + Sync + 'static,
    {
        if !psm.is_valid() {
            return Err(L2capError::InvalidPsm(psm.value()));
        }

        let mut services = self.services.lock().unwrap();
        if services.contains_key(&psm) {
            return Err(L2capError::ServiceAlreadyRegistered);
        }

        info!("Registered dynamic channel service on {}", psm);
        services.insert(
            psm,
            Arc::new(DynamicChannelService {
                psm,
                security_policy,
                handler,
                on_channel_open: Arc::new(on_channel_open),
            }),
        );
        Ok(())
    }

    pub fn unregister(&self, psm: Psm) -> L2capResult<()> {
        self.services
            .lock()
            .unwrap()
            .remove(&psm)
            .map(|_| debug!("Unregistered dynamic channel service on {}", psm))
            .ok_or(L2capError::ServiceNotRegistered)
    }

    pub fn is_service_registered(&self, psm: Psm) -> bool {
        self.services.lock().unwrap().contains_key(&psm)
    }

    pub fn get_service(&self, psm: Psm) -> Option<Arc<DynamicChannelService>> {
        self.services.lock().unwrap().get(&psm).cloned()
    }
}
