//! Subscription buckets grouped by sampling interval.
//!
//! Every distinct sampling interval gets one [`Bucket`], and every bucket
//! owns at most one server-side subscription at a time. Targets are plain
//! metadata until a channel is available; the supervisor turns them into
//! monitored items on connect and replays them after every reconnect.
//!
//! # Concurrency
//!
//! ```text
//! BucketRegistry ── RwLock<HashMap<interval, Arc<Bucket>>>   insert-if-absent
//!        │
//!        └── Bucket ── Mutex<{ targets, live }>               per-bucket exclusion
//! ```
//!
//! The bucket mutex is held across subscription creation, so two concurrent
//! `ensure_live_subscription` calls on one bucket create exactly one
//! subscription.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use uaconn_channel::{Channel, ChannelResult, LiveSubscription, SubscriptionSinks};
use uaconn_core::{ClientHandle, MonitoredTarget, NodeId, SamplingInterval, StatusCode};

// ============================================================================
// Item Report
// ============================================================================

/// Outcome of one batched CreateMonitoredItems call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemReport {
    /// Number of targets sent in the batch.
    pub requested: usize,

    /// Targets the server refused, with the per-item status.
    pub rejected: Vec<(ClientHandle, StatusCode)>,
}

impl ItemReport {
    pub fn accepted(&self) -> usize {
        self.requested.saturating_sub(self.rejected.len())
    }

    pub fn is_degraded(&self) -> bool {
        !self.rejected.is_empty()
    }
}

/// Registers `targets` on `live` in exactly one call.
///
/// Per-item refusals are collected into the report rather than failing the
/// call. A missing status (server returned fewer results than requested) is
/// treated as a refusal with `Bad`.
pub async fn create_items<S: LiveSubscription>(
    live: &S,
    targets: &[MonitoredTarget],
) -> ChannelResult<ItemReport> {
    if targets.is_empty() {
        return Ok(ItemReport::default());
    }

    let statuses = live.create_monitored_items(targets).await?;
    if statuses.len() != targets.len() {
        warn!(
            subscription_id = live.id(),
            requested = targets.len(),
            returned = statuses.len(),
            "CreateMonitoredItems returned unexpected status count"
        );
    }

    let rejected = targets
        .iter()
        .enumerate()
        .filter_map(|(i, target)| {
            let status = statuses.get(i).copied().unwrap_or(StatusCode::BAD);
            (!status.is_good()).then_some((target.handle, status))
        })
        .collect();

    Ok(ItemReport {
        requested: targets.len(),
        rejected,
    })
}

// ============================================================================
// Bucket
// ============================================================================

struct BucketState<S> {
    /// Ordered so restoration batches are deterministic.
    targets: BTreeMap<ClientHandle, NodeId>,
    live: Option<Arc<S>>,
}

/// Targets sharing one sampling interval, plus their live subscription.
pub struct Bucket<S> {
    interval: SamplingInterval,
    state: Mutex<BucketState<S>>,
}

impl<S: LiveSubscription> Bucket<S> {
    fn new(interval: SamplingInterval) -> Self {
        Self {
            interval,
            state: Mutex::new(BucketState {
                targets: BTreeMap::new(),
                live: None,
            }),
        }
    }

    pub fn interval(&self) -> SamplingInterval {
        self.interval
    }

    /// Records targets. Metadata only, no I/O.
    pub async fn add_targets(&self, targets: &[MonitoredTarget]) {
        let mut state = self.state.lock().await;
        for target in targets {
            state.targets.insert(target.handle, target.node.clone());
        }
    }

    /// Snapshot of the registered targets in handle order.
    pub async fn targets(&self) -> Vec<MonitoredTarget> {
        self.state
            .lock()
            .await
            .targets
            .iter()
            .map(|(handle, node)| MonitoredTarget::new(*handle, node.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.targets.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Current live subscription, if any.
    pub async fn live_subscription(&self) -> Option<Arc<S>> {
        self.state.lock().await.live.clone()
    }

    /// Returns the live subscription, creating it on `channel` if absent.
    ///
    /// Idempotent. The bucket lock is held for the whole creation so
    /// concurrent callers wait for, and then share, the same subscription.
    pub async fn ensure_live_subscription<C>(
        &self,
        channel: &C,
        sinks: SubscriptionSinks,
    ) -> ChannelResult<Arc<S>>
    where
        C: Channel<Subscription = S>,
    {
        let mut state = self.state.lock().await;
        if let Some(live) = &state.live {
            return Ok(Arc::clone(live));
        }

        let live = Arc::new(channel.create_subscription(self.interval, sinks).await?);
        debug!(
            interval_ms = self.interval.as_millis(),
            subscription_id = live.id(),
            "Created live subscription"
        );
        state.live = Some(Arc::clone(&live));
        Ok(live)
    }

    /// Re-registers every known target on `live` in one batched call.
    pub async fn restore(&self, live: &S) -> ChannelResult<ItemReport> {
        let targets = self.targets().await;
        let report = create_items(live, &targets).await?;
        debug!(
            interval_ms = self.interval.as_millis(),
            subscription_id = live.id(),
            requested = report.requested,
            accepted = report.accepted(),
            "Restored bucket"
        );
        Ok(report)
    }

    /// Forgets the live subscription without contacting the server.
    pub async fn clear_live_reference(&self) -> Option<Arc<S>> {
        self.state.lock().await.live.take()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// All buckets of one supervisor, keyed by sampling interval.
///
/// Buckets are created on first use and kept for the registry's lifetime.
pub struct BucketRegistry<S> {
    buckets: RwLock<HashMap<SamplingInterval, Arc<Bucket<S>>>>,
}

impl<S: LiveSubscription> BucketRegistry<S> {
    pub fn new() -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the bucket for `interval`, creating it if absent.
    pub async fn get_or_create(&self, interval: SamplingInterval) -> Arc<Bucket<S>> {
        if let Some(bucket) = self.buckets.read().await.get(&interval) {
            return Arc::clone(bucket);
        }

        let mut buckets = self.buckets.write().await;
        let bucket = buckets.entry(interval).or_insert_with(|| {
            debug!(interval_ms = interval.as_millis(), "Created bucket");
            Arc::new(Bucket::new(interval))
        });
        Arc::clone(bucket)
    }

    /// Registers targets under `interval` and returns the bucket.
    pub async fn add_targets(
        &self,
        interval: SamplingInterval,
        targets: &[MonitoredTarget],
    ) -> Arc<Bucket<S>> {
        let bucket = self.get_or_create(interval).await;
        bucket.add_targets(targets).await;
        bucket
    }

    pub async fn bucket(&self, interval: SamplingInterval) -> Option<Arc<Bucket<S>>> {
        self.buckets.read().await.get(&interval).cloned()
    }

    /// Snapshot of all buckets, ordered by interval.
    pub async fn buckets(&self) -> Vec<Arc<Bucket<S>>> {
        let mut buckets: Vec<_> = self.buckets.read().await.values().cloned().collect();
        buckets.sort_by_key(|b| b.interval());
        buckets
    }

    pub async fn len(&self) -> usize {
        self.buckets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Total number of registered targets across buckets.
    pub async fn target_count(&self) -> usize {
        let mut total = 0;
        for bucket in self.buckets().await {
            total += bucket.len().await;
        }
        total
    }

    /// Clears every bucket's live reference. Returns how many were set.
    pub async fn clear_live_references(&self) -> usize {
        self.take_live_subscriptions().await.len()
    }

    /// Clears and returns every live subscription, e.g. to dispose them.
    pub async fn take_live_subscriptions(&self) -> Vec<Arc<S>> {
        let mut taken = Vec::new();
        for bucket in self.buckets().await {
            if let Some(live) = bucket.clear_live_reference().await {
                taken.push(live);
            }
        }
        taken
    }
}

impl<S: LiveSubscription> Default for BucketRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}
