//! uaconn Channel - Collaborator seam for the OPC UA transport
//!
//! This crate defines what the resilience engine needs from a transport:
//! a [`Channel`] that can be opened, bound to an activated session and asked
//! for [`LiveSubscription`]s, and a [`ChannelFactory`] that builds fresh
//! channels for a configured endpoint. Wire encoding, security handshakes and
//! cryptography live behind these traits.
//!
//! ## Features
//! - `test-support`: Enables the in-memory [`sim`] server used to exercise
//!   supervisors and pools without a network.

pub mod channel;
pub mod endpoint;
pub mod error;

#[cfg(feature = "test-support")]
pub mod sim;

pub use channel::{Channel, ChannelFactory, LiveSubscription, SubscriptionSinks};
pub use endpoint::{EndpointConfig, MessageSecurityMode, SecurityPolicy, UserIdentity};
pub use error::{ChannelError, ChannelResult};
