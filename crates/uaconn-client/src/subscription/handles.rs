//! Client handle allocation.

use std::sync::atomic::{AtomicU64, Ordering};

use uaconn_core::{ClientHandle, DomainError, DomainResult};

const MAX_HANDLE: u64 = u32::MAX as u64;

/// Issues unique, strictly increasing client handles.
///
/// One allocator belongs to one supervisor. A batch is reserved with a single
/// atomic update, so concurrent batches never interleave: a batch of `k`
/// nodes always receives `k` consecutive handles. Handles start at 1 and are
/// never reused; once the 32-bit space is used up every request fails.
#[derive(Debug)]
pub struct HandleAllocator {
    /// Next handle to issue. Kept wider than `u32` so exhaustion is detectable.
    next: AtomicU64,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU64::new(u64::from(first)),
        }
    }

    /// Issues a single handle.
    pub fn next(&self) -> DomainResult<ClientHandle> {
        self.next_batch(1)?
            .first()
            .copied()
            .ok_or(DomainError::HandleSpaceExhausted {
                issued: self.issued(),
            })
    }

    /// Reserves `count` consecutive handles, in order.
    pub fn next_batch(&self, count: usize) -> DomainResult<Vec<ClientHandle>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let exhausted = || DomainError::HandleSpaceExhausted {
            issued: self.issued(),
        };
        let count = u64::try_from(count).map_err(|_| exhausted())?;

        let start = self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                let end = next.checked_add(count)?;
                (end - 1 <= MAX_HANDLE).then_some(end)
            })
            .map_err(|_| exhausted())?;

        Ok((start..start + count)
            .filter_map(|raw| u32::try_from(raw).ok())
            .map(ClientHandle::new)
            .collect())
    }

    /// Number of handles issued so far.
    pub fn issued(&self) -> u32 {
        let next = self.next.load(Ordering::Acquire);
        u32::try_from(next.saturating_sub(1)).unwrap_or(u32::MAX)
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn raw(handles: &[ClientHandle]) -> Vec<u32> {
        handles.iter().map(|h| h.value()).collect()
    }

    #[test]
    fn test_first_handle_is_one() {
        let allocator = HandleAllocator::new();
        assert_eq!(allocator.next().unwrap(), ClientHandle::new(1));
        assert_eq!(allocator.issued(), 1);
    }

    #[test]
    fn test_batches_are_consecutive() {
        let allocator = HandleAllocator::new();
        assert_eq!(raw(&allocator.next_batch(1).unwrap()), vec![1]);
        assert_eq!(raw(&allocator.next_batch(2).unwrap()), vec![2, 3]);
        assert_eq!(raw(&allocator.next_batch(3).unwrap()), vec![4, 5, 6]);
        assert_eq!(allocator.issued(), 6);
    }

    #[test]
    fn test_empty_batch_consumes_nothing() {
        let allocator = HandleAllocator::new();
        assert!(allocator.next_batch(0).unwrap().is_empty());
        assert_eq!(allocator.next().unwrap(), ClientHandle::new(1));
    }

    #[test]
    fn test_exhaustion_is_an_error_not_a_wrap() {
        let allocator = HandleAllocator::starting_at(u32::MAX - 1);
        assert_eq!(
            raw(&allocator.next_batch(2).unwrap()),
            vec![u32::MAX - 1, u32::MAX]
        );
        assert!(matches!(
            allocator.next(),
            Err(DomainError::HandleSpaceExhausted { .. })
        ));
        assert_eq!(allocator.issued(), u32::MAX);
    }

    #[test]
    fn test_oversized_batch_rejected_without_consuming() {
        let allocator = HandleAllocator::starting_at(u32::MAX);
        assert!(allocator.next_batch(2).is_err());
        assert_eq!(allocator.next().unwrap(), ClientHandle::new(u32::MAX));
    }

    #[test]
    fn test_concurrent_batches_stay_contiguous() {
        let allocator = Arc::new(HandleAllocator::new());
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let allocator = Arc::clone(&allocator);
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| allocator.next_batch(3).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for thread in threads {
            for batch in thread.join().unwrap() {
                let values = raw(&batch);
                assert_eq!(values.len(), 3);
                assert_eq!(values[1], values[0] + 1);
                assert_eq!(values[2], values[1] + 1);
                for value in values {
                    assert!(seen.insert(value), "handle {value} issued twice");
                }
            }
        }
        assert_eq!(seen.len(), 8 * 50 * 3);
    }
}
