//! uaconn Client - Connection resilience for OPC UA subscriptions
//!
//! This crate provides the resilience engine on top of the `uaconn-channel`
//! collaborator traits:
//! - `subscription` - Handle allocation, per-interval buckets and the
//!   reconnection supervisor that restores them after connection loss
//! - `pool` - Bounded pool of authenticated channels for request/response work
//! - `config` - TOML configuration with environment overrides
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        uaconn-client                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────────────┐     ┌───────────────────────┐  │
//! │  │ SubscriptionSupervisor  │     │      ChannelPool      │  │
//! │  │ (one long-lived channel)│     │ (up to max_size idle  │  │
//! │  └────────────┬────────────┘     │  or rented channels)  │  │
//! │               │                  └───────────┬───────────┘  │
//! │               │ buckets                      │              │
//! │               ▼                              │              │
//! │  ┌─────────────────────────┐                 │              │
//! │  │     BucketRegistry      │                 │              │
//! │  │ (interval → targets)    │                 │              │
//! │  └─────────────────────────┘                 │              │
//! │               │                              │              │
//! └───────────────┼──────────────────────────────┼──────────────┘
//!                 ▼                              ▼
//!           ChannelFactory ──────────────▶ Channel / LiveSubscription
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Background tasks log failures and retry instead of propagating them

pub mod config;
pub mod error;
pub mod pool;
pub mod subscription;

pub use config::{ClientConfig, PoolConfig, SessionConfig, SupervisorConfig};
pub use error::{ConfigError, PoolError, SupervisorError};
pub use pool::{ChannelFuture, ChannelPool, PooledEntry};
pub use subscription::{
    Bucket, BucketRegistry, HandleAllocator, ItemReport, SubscriptionSupervisor, SupervisorEvent,
};
