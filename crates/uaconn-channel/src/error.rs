//! Channel error types.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.

use std::time::Duration;

use thiserror::Error;
use uaconn_core::StatusCode;

/// Errors reported by a channel or one of its live subscriptions.
///
/// Cloneable because the same error is fanned out to every subscription sink
/// when a connection drops.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    /// Transport could not be opened.
    #[error("Failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    /// CreateSession was refused or failed.
    #[error("Failed to create session: {0}")]
    Session(String),

    /// ActivateSession was refused (bad identity, expired session, ...).
    #[error("Failed to activate session: {0}")]
    Activation(String),

    /// CreateSubscription failed.
    #[error("Failed to create subscription: {0}")]
    Subscription(String),

    /// CreateMonitoredItems failed as a whole (not per item).
    #[error("Failed to create monitored items: {0}")]
    MonitoredItems(String),

    /// Service-level fault returned by the server.
    #[error("Service fault: {0}")]
    ServiceFault(StatusCode),

    /// The underlying connection dropped.
    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    /// The request did not complete in time.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The channel was already disposed.
    #[error("Channel has been disposed")]
    Disposed,
}

impl ChannelError {
    /// Convenience constructor for connect failures.
    pub fn connect(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Connect {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for channel operations.
pub type ChannelResult<T> = Result<T, ChannelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_display() {
        let error = ChannelError::connect("opc.tcp://plc:4840", "connection refused");
        let display = format!("{error}");
        assert!(display.contains("opc.tcp://plc:4840"));
        assert!(display.contains("connection refused"));
    }

    #[test]
    fn test_service_fault_display() {
        let error = ChannelError::ServiceFault(StatusCode::BAD_SESSION_ID_INVALID);
        assert!(format!("{error}").contains("BadSessionIdInvalid"));
    }

    #[test]
    fn test_error_is_cloneable() {
        let error = ChannelError::ConnectionLost("socket reset".to_string());
        assert_eq!(error.clone(), error);
    }
}
