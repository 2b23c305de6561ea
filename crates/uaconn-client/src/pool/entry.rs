//! Rented pool entries.

use std::fmt;

use tokio::sync::OwnedSemaphorePermit;
use tracing::warn;

/// Capacity slot held by a rented entry.
///
/// Dropping the slot releases the pool capacity it holds.
pub(crate) struct Slot {
    entry_id: u64,
    returned: bool,
    _permit: OwnedSemaphorePermit,
}

impl Slot {
    pub(crate) fn new(entry_id: u64, permit: OwnedSemaphorePermit) -> Self {
        Self {
            entry_id,
            returned: false,
            _permit: permit,
        }
    }

    /// Releases the capacity after a regular return.
    pub(crate) fn release(mut self) {
        self.returned = true;
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        if !self.returned {
            warn!(
                entry_id = self.entry_id,
                "Pooled entry dropped without being returned, channel closed without dispose"
            );
        }
    }
}

/// A channel rented from a [`ChannelPool`](crate::ChannelPool).
///
/// Hand it back with [`return_entry`](crate::ChannelPool::return_entry).
/// Mark it [`invalidate`](Self::invalidate)d first if the channel failed,
/// so the pool disposes it instead of handing it out again.
pub struct PooledEntry<C> {
    id: u64,
    channel: C,
    invalid: bool,
    slot: Slot,
}

impl<C> PooledEntry<C> {
    pub(crate) fn new(id: u64, channel: C, permit: OwnedSemaphorePermit) -> Self {
        Self {
            id,
            channel,
            invalid: false,
            slot: Slot::new(id, permit),
        }
    }

    /// Pool-assigned sequence number, stable across rents of the same channel.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Marks the channel as unusable. It will be disposed on return.
    pub fn invalidate(&mut self) {
        self.invalid = true;
    }

    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    pub(crate) fn into_parts(self) -> (u64, C, bool, Slot) {
        (self.id, self.channel, self.invalid, self.slot)
    }
}

impl<C> fmt::Debug for PooledEntry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledEntry")
            .field("id", &self.id)
            .field("invalid", &self.invalid)
            .finish_non_exhaustive()
    }
}
