//! Registry of services that want a fixed channel on every link

use super::fixed_channel::FixedChannel;
use crate::common::Handler;
use crate::l2cap::constants::{L2CAP_FIRST_FIXED_CID, L2CAP_LAST_FIXED_CID};
use crate::l2cap::types::{ChannelId, L2capError, L2capResult, SecurityPolicy};
use log::{debug, info};
use std::sync::{Arc, Mutex};

/// Invoked with each channel created for a service
pub type OnFixedChannelOpen = Arc<dyn Fn(FixedChannel) + Send + Sync + 'static>;

/// A registered user of one fixed channel id
pub struct FixedChannelService {
    cid: ChannelId,
    security_policy: SecurityPolicy,
    handler: Handler,
    on_channel_open: OnFixedChannelOpen,
}

impl FixedChannelService {
    pub fn cid(&self) -> ChannelId {
        self.cid
    }

    pub fn security_policy(&self) -> SecurityPolicy {
        self.security_policy
    }

    /// Hand a newly created channel to the service on its handler
    pub fn notify_channel_creation(&self, channel: FixedChannel) {
        let on_channel_open = self.on_channel_open.clone();
        self.handler.post(move || on_channel_open(channel));
    }
}

/// Fixed channel services, kept in registration order
#[derive(Default)]
pub struct FixedChannelServiceManager {
    services: Mutex<Vec<Arc<FixedChannelService>>>,
}

impl FixedChannelServiceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service for `cid`; channels are delivered on `handler`
    pub fn register<F>(
        &self,
        cid: ChannelId,
        security_policy: SecurityPolicy,
        handler: Handler,
        on_channel_open: F,
    ) -> L2capResult<()>
    where
        F: Fn(FixedChannel) + Send + Sync + 'static,
    {
        if !(L2CAP_FIRST_FIXED_CID..=L2CAP_LAST_FIXED_CID).contains(&cid) {
            return Err(L2capError::InvalidFixedChannel(cid));
        }

        let mut services = self.services.lock().unwrap();
        if services.iter().any(|service| service.cid == cid) {
            return Err(L2capError::ServiceAlreadyRegistered);
        }

        info!("Registered fixed channel service on CID 0x{:04X}", cid);
        services.push(Arc::new(FixedChannelService {
            cid,
            security_policy,
            handler,
            on_channel_open: Arc::new(on_channel_open),
        }));
        Ok(())
    }

    /// Remove the service for `cid`; channels already created stay open
    pub fn unregister(&self, cid: ChannelId) -> L2capResult<()> {
        let mut services = self.services.lock().unwrap();
        let index = services
            .iter()
            .position(|service| service.cid == cid)
            .ok_or(L2capError::ServiceNotRegistered)?;
        services.remove(index);
        debug!("Unregistered fixed channel service on CID 0x{:04X}", cid);
        Ok(())
    }

    pub fn is_service_registered(&self, cid: ChannelId) -> bool {
        self.services
            .lock()
            .unwrap()
            .iter()
            .any(|service| service.cid == cid)
    }

    /// Snapshot of the registered services, in registration order
    pub fn get_registered_services(&self) -> Vec<(ChannelId, Arc<FixedChannelService>)> {
        self.services
            .lock()
            .unwrap()
            .iter()
            .map(|service| (service.cid, service.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_keeps_order() {
        let handler = Handler::new("fixed_service_order").unwrap();
        let manager = FixedChannelServiceManager::new();

        manager
            .register(0x0007, SecurityPolicy::None, handler.clone(), |_| {})
            .unwrap();
        manager
            .register(0x0003, SecurityPolicy::None, handler.clone(), |_| {})
            .unwrap();

        let cids: Vec<ChannelId> = manager
            .get_registered_services()
            .into_iter()
            .map(|(cid, _)| cid)
            .collect();
        assert_eq!(cids, vec![0x0007, 0x0003]);
        handler.stop();
    }

    #[test]
    fn test_register_rejects_invalid_and_duplicate() {
        let handler = Handler::new("fixed_service_invalid").unwrap();
        let manager = FixedChannelServiceManager::new();

        assert_eq!(
            manager.register(0x0001, SecurityPolicy::None, handler.clone(), |_| {}),
            Err(L2capError::InvalidFixedChannel(0x0001))
        );
        assert_eq!(
            manager.register(0x0040, SecurityPolicy::None, handler.clone(), |_| {}),
            Err(L2capError::InvalidFixedChannel(0x0040))
        );

        manager
            .register(0x0003, SecurityPolicy::None, handler.clone(), |_| {})
            .unwrap();
        assert_eq!(
            manager.register(0x0003, SecurityPolicy::None, handler.clone(), |_| {}),
            Err(L2capError::ServiceAlreadyRegistered)
        );
        handler.stop();
    }

    #[test]
    fn test_unregister() {
        let handler = Handler::new("fixed_service_unregister").unwrap();
        let manager = FixedChannelServiceManager::new();

        manager
            .register(0x0003, SecurityPolicy::None, handler.clone(), |_| {})
            .unwrap();
        assert!(manager.is_service_registered(0x0003));

        manager.unregister(0x0003).unwrap();
        assert!(!manager.is_service_registered(0x0003));
        assert_eq!(
            manager.unregister(0x0003),
            Err(L2capError::ServiceNotRegistered)
        );
        handler.stop();
    }
}
