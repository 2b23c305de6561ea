//! Node references and monitored targets.

use crate::{ClientHandle, DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to an addressable data point on the remote device.
///
/// Kept in its textual form (e.g. `ns=2;s=Line1.Temperature`). The client
/// never interprets the namespace or identifier; the channel implementation
/// is responsible for encoding it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node reference, rejecting empty or whitespace-only input.
    pub fn new(id: impl Into<String>) -> DomainResult<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidNodeId { value: id });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for NodeId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for NodeId {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NodeId> for String {
    fn from(node: NodeId) -> Self {
        node.0
    }
}

/// A node registered for monitoring under a client handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MonitoredTarget {
    pub handle: ClientHandle,
    pub node: NodeId,
}

impl MonitoredTarget {
    pub fn new(handle: ClientHandle, node: NodeId) -> Self {
        Self { handle, node }
    }
}
