//! uaconn - Resilient OPC UA subscriptions and a bounded channel pool
//!
//! Facade over the workspace crates:
//! - [`types`] - Client handles, node ids, sampling intervals, data values
//! - [`channel`] - Channel, subscription and factory traits
//! - [`client`] - Subscription supervisor, channel pool and configuration
//! - [`logging`] - `tracing` subscriber setup for applications
//!
//! # Example
//!
//! ```ignore
//! use uaconn::client::{ClientConfig, SubscriptionSupervisor};
//!
//! uaconn::logging::init("info")?;
//! let config = ClientConfig::load("uaconn.toml")?.with_env_overrides()?;
//! let supervisor = SubscriptionSupervisor::new(my_factory, &config);
//! supervisor.start()?;
//! ```

pub mod logging;

pub use uaconn_channel as channel;
pub use uaconn_client as client;
pub use uaconn_core as types;

pub use uaconn_client::{ChannelPool, ClientConfig, SubscriptionSupervisor, SupervisorEvent};
