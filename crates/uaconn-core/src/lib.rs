//! uaconn Core - Shared types for resilient OPC UA clients
//!
//! This crate provides the domain types shared between the channel
//! collaborator traits (`uaconn-channel`) and the subscription supervisor
//! and pool (`uaconn-client`).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod error;
pub mod handle;
pub mod interval;
pub mod node;
pub mod state;
pub mod value;

// Re-exports for convenience
pub use error::{DomainError, DomainResult};
pub use handle::ClientHandle;
pub use interval::SamplingInterval;
pub use node::{MonitoredTarget, NodeId};
pub use state::ConnectionState;
pub use value::{DataValue, StatusCode, StatusSeverity, Variant};
