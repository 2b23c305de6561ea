//! Events published by the subscription supervisor.

use std::fmt;

use uaconn_core::{ClientHandle, DataValue, StatusCode};

/// Notifications broadcast to every [`events`](crate::SubscriptionSupervisor::events)
/// receiver.
///
/// Data changes for a single handle arrive in server order. Nothing is
/// replayed across reconnects: values that changed while the link was down
/// are lost.
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorEvent {
    /// A monitored item reported a new value.
    DataChanged {
        handle: ClientHandle,
        value: DataValue,
    },

    /// The link went up (`true`) or down (`false`).
    ///
    /// `true` is published after every bucket has been restored.
    ConnectionStatusChanged { connected: bool },

    /// The server refused a monitored item while subscribing or restoring.
    ///
    /// The handle stays registered and is retried on the next reconnect.
    MonitoredItemRejected {
        handle: ClientHandle,
        status: StatusCode,
    },
}

impl SupervisorEvent {
    /// Handle the event refers to, if any.
    pub fn handle(&self) -> Option<ClientHandle> {
        match self {
            Self::DataChanged { handle, .. } | Self::MonitoredItemRejected { handle, .. } => {
                Some(*handle)
            }
            Self::ConnectionStatusChanged { .. } => None,
        }
    }
}

impl fmt::Display for SupervisorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataChanged { handle, value } => {
                write!(f, "data changed on {handle} ({})", value.status)
            }
            Self::ConnectionStatusChanged { connected: true } => write!(f, "connected"),
            Self::ConnectionStatusChanged { connected: false } => write!(f, "disconnected"),
            Self::MonitoredItemRejected { handle, status } => {
                write!(f, "monitored item {handle} rejected: {status}")
            }
        }
    }
}
