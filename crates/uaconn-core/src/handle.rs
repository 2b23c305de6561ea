//! Client-side correlation handles for monitored items.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Client-assigned identifier for one monitored item.
///
/// The server echoes this value back with every data change notification,
/// which is how a notification is routed to the caller that subscribed.
/// Handles are issued by a single allocator per supervisor, start at 1 and
/// are never reused, so `0` never identifies a live item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientHandle(u32);

impl ClientHandle {
    /// Wraps a raw handle value.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw value sent on the wire.
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<ClientHandle> for u32 {
    fn from(handle: ClientHandle) -> Self {
        handle.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_ordering() {
        assert!(ClientHandle::new(1) < ClientHandle::new(2));
        assert_eq!(ClientHandle::new(7).value(), 7);
    }

    #[test]
    fn test_handle_display() {
        assert_eq!(ClientHandle::new(42).to_string(), "#42");
    }

    #[test]
    fn test_handle_into_u32() {
        let raw: u32 = ClientHandle::new(9).into();
        assert_eq!(raw, 9);
    }
}
