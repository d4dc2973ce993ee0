//! Classic (ACL-U) link and channel management
//!
//! The [`LinkManager`] keeps one link per connected peer. Each link
//! owns its fixed and dynamic channels and disconnects itself once no
//! channel has been acquired for the configured idle timeout.

pub mod config;
pub mod dynamic_channel;
mod dynamic_channel_allocator;
pub mod dynamic_channel_service;
pub mod fixed_channel;
mod fixed_channel_allocator;
pub mod fixed_channel_service;
mod lifecycle;
pub(crate) mod link;
pub mod link_manager;
pub mod pending;
pub mod security;
mod signalling_manager;
#[cfg(test)]
pub(crate) mod testing;

pub use config::{L2capConfig, ParameterProvider};
pub use dynamic_channel::DynamicChannel;
pub use dynamic_channel_service::{DynamicChannelService, DynamicChannelServiceManager};
pub use fixed_channel::FixedChannel;
pub use fixed_channel_service::{FixedChannelService, FixedChannelServiceManager};
pub use lifecycle::CloseCallback;
pub use link_manager::LinkManager;
pub use pending::{
    ConnectionError, ConnectionFailCallback, PendingDynamicChannelConnection,
    PendingFixedChannelConnection,
};
pub use security::{AllowAll, SecurityEnforcement};
