//! Error types for the subscription supervisor and the channel pool.
//!
//! Transient channel failures inside the supervisor never reach callers;
//! they are retried by the reconnect loop. What remains here is misuse
//! (calls after disposal), domain validation, and pool creation failures.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use uaconn_channel::ChannelError;
use uaconn_core::DomainError;

// ============================================================================
// Supervisor Errors
// ============================================================================

/// Errors returned by [`SubscriptionSupervisor`](crate::SubscriptionSupervisor).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SupervisorError {
    /// The supervisor was disposed before or during the call.
    #[error("Subscription supervisor has been disposed")]
    Disposed,

    /// Invalid input or exhausted handle space.
    #[error(transparent)]
    Domain(#[from] DomainError),
}

// ============================================================================
// Pool Errors
// ============================================================================

/// Errors returned by [`ChannelPool`](crate::ChannelPool).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolError {
    /// The pool was disposed; pending and later rents fail with this.
    #[error("Channel pool has been disposed")]
    Disposed,

    /// `dispose` was called twice.
    #[error("Channel pool was already disposed")]
    AlreadyDisposed,

    /// Creating, connecting or activating a new pooled channel failed.
    #[error("Failed to open pooled channel: {0}")]
    Channel(#[from] ChannelError),
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Errors raised while loading or validating [`ClientConfig`](crate::ClientConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML for the schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds a value outside its allowed range.
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
