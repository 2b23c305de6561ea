//! Connectivity state of a supervised channel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the channel owned by a subscription supervisor.
///
/// ```text
/// Disconnected ──start──▶ Connecting ──▶ Connected
///                              ▲             │ fault
///                              │             ▼
///                              └──────── Reconnecting
///
/// any state ──dispose──▶ Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not started yet
    #[default]
    Disconnected,
    /// Establishing the first connection
    Connecting,
    /// Channel open, session active, every bucket restored
    Connected,
    /// Re-establishing after the channel was lost
    Reconnecting,
    /// Disposed; terminal
    Stopped,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Stopped
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
