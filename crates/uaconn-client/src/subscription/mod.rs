//! Subscription management.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  subscribe   ┌────────────────┐  per interval  ┌──────────┐
//! │      caller      │─────────────▶│   Supervisor   │───────────────▶│  Bucket  │
//! └──────────────────┘              └────────────────┘                └──────────┘
//!          ▲                           │        ▲                          │
//!          │ SupervisorEvent           │ owns   │ fault                    │ live
//!          │ (broadcast)               ▼        │                          ▼
//!          └──────────────────────── Channel ◀──┴──────────────── LiveSubscription
//! ```
//!
//! - [`HandleAllocator`]: unique, consecutive client handles.
//! - [`BucketRegistry`]: one [`Bucket`] per sampling interval, each with at
//!   most one live subscription.
//! - [`SubscriptionSupervisor`]: connection lifecycle, restoration after
//!   reconnect, event fan-out.

mod bucket;
mod events;
mod handles;
mod supervisor;

pub use bucket::{create_items, Bucket, BucketRegistry, ItemReport};
pub use events::SupervisorEvent;
pub use handles::HandleAllocator;
pub use supervisor::{SubscriptionOf, SubscriptionSupervisor};
