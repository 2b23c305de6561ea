//! Bounded pool of authenticated channels for request/response work.
//!
//! Capacity is a fair [`Semaphore`]: every channel that exists (idle,
//! rented, or still opening) holds one permit, so the total never exceeds
//! `max_size` and waiters are served in arrival order. Idle channels are
//! reused most-recently-returned first.
//!
//! # Example
//!
//! ```ignore
//! let pool = ChannelPool::new(factory, &config);
//!
//! let mut entry = pool.rent().await?;
//! if let Err(error) = read_values(entry.channel()).await {
//!     entry.invalidate();
//! }
//! pool.return_entry(entry).await;
//! ```
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

mod entry;

pub use entry::PooledEntry;

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use uaconn_channel::{Channel, ChannelFactory, ChannelResult, EndpointConfig};

use crate::config::{ClientConfig, SessionConfig};
use crate::error::PoolError;

type ChannelOf<F> = <F as ChannelFactory>::Channel;

/// Boxed future borrowing a pooled channel, used by [`ChannelPool::with_channel`].
pub type ChannelFuture<'c, T> = Pin<Box<dyn Future<Output = T> + Send + 'c>>;

struct IdleChannel<C> {
    id: u64,
    channel: C,
}

struct PoolInner<F: ChannelFactory> {
    factory: F,
    endpoint: EndpointConfig,
    session: SessionConfig,
    max_size: usize,
    dispose_timeout: Duration,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<IdleChannel<ChannelOf<F>>>>,
    disposed: AtomicBool,
    next_entry_id: AtomicU64,
}

/// Bounded, reusable set of connected channels.
///
/// Cloning is cheap and every clone shares the same pool.
pub struct ChannelPool<F: ChannelFactory> {
    inner: Arc<PoolInner<F>>,
}

impl<F: ChannelFactory> Clone for ChannelPool<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: ChannelFactory> ChannelPool<F> {
    pub fn new(factory: F, config: &ClientConfig) -> Self {
        let max_size = config.pool.max_size.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            inner: Arc::new(PoolInner {
                factory,
                endpoint: config.endpoint.clone(),
                session: config.session.clone(),
                max_size,
                dispose_timeout: config.pool.dispose_timeout(),
                permits: Arc::new(Semaphore::new(max_size)),
                idle: Mutex::new(VecDeque::new()),
                disposed: AtomicBool::new(false),
                next_entry_id: AtomicU64::new(1),
            }),
        }
    }

    /// Rents a channel, waiting while the pool is at capacity.
    ///
    /// An idle channel is handed out without any I/O. Otherwise a new one is
    /// created, connected and activated; if that fails the slot is released
    /// and the partial channel disposed before the error is returned.
    pub async fn rent(&self) -> Result<PooledEntry<ChannelOf<F>>, PoolError> {
        self.ensure_open()?;

        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Disposed)?;
        self.ensure_open()?;

        let idle = self.inner.idle.lock().await.pop_back();
        if let Some(IdleChannel { id, channel }) = idle {
            debug!(entry_id = id, "Reusing idle pooled channel");
            return Ok(PooledEntry::new(id, channel, permit));
        }

        let id = self.inner.next_entry_id.fetch_add(1, Ordering::Relaxed);
        let channel = self.open(id).await?;
        debug!(entry_id = id, "Opened pooled channel");
        Ok(PooledEntry::new(id, channel, permit))
    }

    /// Hands an entry back.
    ///
    /// Invalid entries, and any entry returned after [`dispose`](Self::dispose),
    /// are disposed. Valid ones go back to the idle set before their slot is
    /// released.
    pub async fn return_entry(&self, entry: PooledEntry<ChannelOf<F>>) {
        let (id, channel, invalid, slot) = entry.into_parts();

        if invalid {
            debug!(entry_id = id, "Discarding invalid pooled channel");
            self.dispose_channel(&channel, id).await;
            slot.release();
            return;
        }

        let mut idle = self.inner.idle.lock().await;
        if self.is_disposed() {
            drop(idle);
            debug!(entry_id = id, "Pool disposed, closing returned channel");
            self.dispose_channel(&channel, id).await;
        } else {
            idle.push_back(IdleChannel { id, channel });
            drop(idle);
        }
        slot.release();
    }

    /// Rents a channel, runs `operation` on it, and returns it.
    ///
    /// The entry is invalidated if `operation` fails, so a broken channel
    /// is never reused.
    pub async fn with_channel<T, E, Op>(&self, operation: Op) -> Result<T, E>
    where
        E: From<PoolError>,
        Op: for<'c> FnOnce(&'c ChannelOf<F>) -> ChannelFuture<'c, Result<T, E>>,
    {
        let mut entry = self.rent().await?;
        let result = operation(entry.channel()).await;
        if result.is_err() {
            entry.invalidate();
        }
        self.return_entry(entry).await;
        result
    }

    /// Closes the pool.
    ///
    /// Pending and later rents fail with [`PoolError::Disposed`]; idle
    /// channels are disposed now, rented ones when they come back.
    pub async fn dispose(&self) -> Result<(), PoolError> {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return Err(PoolError::AlreadyDisposed);
        }
        self.inner.permits.close();

        let drained: Vec<_> = self.inner.idle.lock().await.drain(..).collect();
        info!(idle = drained.len(), "Disposing channel pool");
        for IdleChannel { id, channel } in drained {
            self.dispose_channel(&channel, id).await;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn max_size(&self) -> usize {
        self.inner.max_size
    }

    /// Slots that could be rented right now without waiting.
    pub fn available_slots(&self) -> usize {
        self.inner.permits.available_permits()
    }

    pub async fn idle_count(&self) -> usize {
        self.inner.idle.lock().await.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn ensure_open(&self) -> Result<(), PoolError> {
        if self.is_disposed() {
            return Err(PoolError::Disposed);
        }
        Ok(())
    }

    async fn open(&self, id: u64) -> Result<ChannelOf<F>, PoolError> {
        let channel = self.inner.factory.create(&self.inner.endpoint)?;
        if let Err(error) = self.handshake(&channel).await {
            warn!(entry_id = id, error = %error, "Failed to open pooled channel");
            self.dispose_channel(&channel, id).await;
            return Err(error.into());
        }
        Ok(channel)
    }

    async fn handshake(&self, channel: &ChannelOf<F>) -> ChannelResult<()> {
        channel.connect().await?;
        channel.create_session(&self.inner.session.name).await?;
        channel.activate_session(&self.inner.session.identity).await
    }

    async fn dispose_channel(&self, channel: &ChannelOf<F>, id: u64) {
        match timeout(self.inner.dispose_timeout, channel.dispose()).await {
            Ok(Ok(())) => debug!(entry_id = id, "Pooled channel disposed"),
            Ok(Err(error)) => warn!(entry_id = id, error = %error, "Pooled channel dispose failed"),
            Err(_) => warn!(entry_id = id, "Pooled channel dispose timed out"),
        }
    }
}
