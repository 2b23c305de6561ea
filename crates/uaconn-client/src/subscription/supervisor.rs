//! Reconnection supervisor.
//!
//! The supervisor owns one channel at a time and keeps every registered
//! target monitored across connection loss. A single background task drives
//! the link:
//!
//! ```text
//!            ┌──────────── retry_interval ◀─────────┐
//!            ▼                                       │ failure
//!   establish: create → connect → session → activate → restore buckets
//!            │ success
//!            ▼
//!   Connected ── fault from a live subscription ──▶ tear down ──▶ establish
//! ```
//!
//! Faults are tagged with the channel generation they came from. Reports
//! for an older generation are ignored, and concurrent reports for the
//! current one collapse into a single reconnect cycle.
//!
//! **Panic-Free Policy:** This module follows the project's panic-free guidelines.
//! No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, or `todo!()`.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};

use tokio::sync::{broadcast, watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use uaconn_channel::{
    Channel, ChannelError, ChannelFactory, ChannelResult, EndpointConfig, LiveSubscription,
    SubscriptionSinks,
};
use uaconn_core::{
    ClientHandle, ConnectionState, MonitoredTarget, NodeId, SamplingInterval,
};

use super::bucket::{create_items, Bucket, BucketRegistry, ItemReport};
use super::events::SupervisorEvent;
use super::handles::HandleAllocator;
use crate::config::{ClientConfig, SessionConfig, SupervisorConfig};
use crate::error::SupervisorError;

type ChannelOf<F> = <F as ChannelFactory>::Channel;

/// Live subscription type produced by the factory's channels.
pub type SubscriptionOf<F> = <ChannelOf<F> as Channel>::Subscription;

// ============================================================================
// Reconnect Trigger
// ============================================================================

/// Debounced, generation-tagged fault signal.
#[derive(Debug, Default)]
struct ReconnectTrigger {
    generation: AtomicU64,
    requested: AtomicBool,
    notify: Notify,
}

impl ReconnectTrigger {
    /// Starts accepting faults for `generation` only.
    fn arm(&self, generation: u64) {
        self.generation.store(generation, Ordering::SeqCst);
        self.requested.store(false, Ordering::SeqCst);
    }

    /// Requests a reconnect. Returns `true` for the first report of the
    /// current generation, `false` for duplicates and stale reports.
    fn fire(&self, generation: u64) -> bool {
        if generation != self.generation.load(Ordering::SeqCst) {
            return false;
        }
        if self
            .requested
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.notify.notify_one();
        true
    }

    fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Shared State
// ============================================================================

enum AttemptError {
    Cancelled,
    Channel(ChannelError),
}

impl From<ChannelError> for AttemptError {
    fn from(error: ChannelError) -> Self {
        Self::Channel(error)
    }
}

/// Connectivity state guarded by one async mutex.
///
/// Holding this lock serializes `subscribe` against bucket restoration.
struct Link<C> {
    channel: Option<Arc<C>>,
    state: ConnectionState,
    generation: u64,
}

struct Shared<F: ChannelFactory> {
    factory: F,
    endpoint: EndpointConfig,
    session: SessionConfig,
    config: SupervisorConfig,
    default_interval: SamplingInterval,

    handles: HandleAllocator,
    buckets: BucketRegistry<SubscriptionOf<F>>,
    link: Mutex<Link<ChannelOf<F>>>,

    state_tx: watch::Sender<ConnectionState>,
    /// Flips to `true` once, after the first successful connection.
    connected_once: watch::Sender<bool>,
    trigger: Arc<ReconnectTrigger>,
    events: broadcast::Sender<SupervisorEvent>,

    cancel: CancellationToken,
    started: AtomicBool,
    disposed: AtomicBool,
}

impl<F: ChannelFactory> Shared<F> {
    fn set_state(&self, link: &mut Link<ChannelOf<F>>, state: ConnectionState) {
        link.state = state;
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    fn publish(&self, event: SupervisorEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    fn sinks(&self, generation: u64) -> SubscriptionSinks {
        let events = self.events.clone();
        let trigger = Arc::clone(&self.trigger);
        SubscriptionSinks::new(
            move |handle, value| {
                let _ = events.send(SupervisorEvent::DataChanged { handle, value });
            },
            move |error| {
                if trigger.fire(generation) {
                    warn!(channel_generation = generation, error = %error, "Connection lost");
                }
            },
        )
    }

    fn publish_rejections(&self, interval: SamplingInterval, report: &ItemReport) {
        for (handle, status) in &report.rejected {
            warn!(
                handle = handle.value(),
                interval_ms = interval.as_millis(),
                status = %status,
                "Monitored item rejected"
            );
            self.publish(SupervisorEvent::MonitoredItemRejected {
                handle: *handle,
                status: *status,
            });
        }
    }

    /// Runs `operation` unless the supervisor is cancelled first.
    async fn guarded<T>(
        &self,
        operation: impl Future<Output = ChannelResult<T>>,
    ) -> Result<T, AttemptError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AttemptError::Cancelled),
            result = operation => result.map_err(AttemptError::Channel),
        }
    }

    /// Disposes `channel`, bounded by the dispose timeout.
    ///
    /// Not raced against the cancellation token: a dropped dispose would
    /// leak the server session, and `dispose()` waits at most one timeout
    /// for the loop to finish it.
    async fn dispose_channel(&self, channel: &ChannelOf<F>, generation: u64) {
        match timeout(self.config.dispose_timeout(), channel.dispose()).await {
            Ok(Ok(())) => debug!(channel_generation = generation, "Channel disposed"),
            Ok(Err(error)) => {
                warn!(channel_generation = generation, error = %error, "Channel dispose failed")
            }
            Err(_) => warn!(
                channel_generation = generation,
                timeout_ms = self.config.dispose_timeout_ms,
                "Channel dispose timed out"
            ),
        }
    }

    async fn dispose_subscription(&self, live: &SubscriptionOf<F>) {
        match timeout(self.config.dispose_timeout(), live.dispose()).await {
            Ok(Ok(())) => debug!(subscription_id = live.id(), "Subscription disposed"),
            Ok(Err(error)) => {
                warn!(subscription_id = live.id(), error = %error, "Subscription dispose failed")
            }
            Err(_) => warn!(subscription_id = live.id(), "Subscription dispose timed out"),
        }
    }

    // ------------------------------------------------------------------------
    // Background loop
    // ------------------------------------------------------------------------

    async fn run(self: Arc<Self>) {
        let mut attempt: u32 = 0;

        while !self.cancel.is_cancelled() {
            attempt = attempt.saturating_add(1);

            match self.establish(attempt).await {
                Ok(()) => {
                    attempt = 0;
                    if !self.wait_for_fault().await {
                        break;
                    }
                    self.tear_down().await;
                }
                Err(AttemptError::Cancelled) => break,
                Err(AttemptError::Channel(error)) => {
                    warn!(
                        attempt,
                        error = %error,
                        retry_ms = self.config.retry_interval_ms,
                        "Connection attempt failed"
                    );
                    tokio::select! {
                        _ = sleep(self.config.retry_interval()) => {}
                        _ = self.cancel.cancelled() => break,
                    }
                }
            }
        }

        debug!("Supervisor loop exited");
    }

    /// One full connection attempt. On failure the partial channel is gone.
    async fn establish(&self, attempt: u32) -> Result<(), AttemptError> {
        let generation = {
            let mut link = tokio::select! {
                _ = self.cancel.cancelled() => return Err(AttemptError::Cancelled),
                link = self.link.lock() => link,
            };
            link.generation += 1;
            let state = if *self.connected_once.borrow() {
                ConnectionState::Reconnecting
            } else {
                ConnectionState::Connecting
            };
            self.set_state(&mut link, state);
            self.trigger.arm(link.generation);
            link.generation
        };

        info!(
            attempt,
            channel_generation = generation,
            endpoint = %self.endpoint.url,
            "Connecting"
        );

        let channel = Arc::new(self.factory.create(&self.endpoint)?);
        match self.open_and_restore(&channel, generation).await {
            Ok(()) => Ok(()),
            Err(error) => {
                self.buckets.clear_live_references().await;
                self.dispose_channel(&channel, generation).await;
                Err(error)
            }
        }
    }

    async fn open_and_restore(
        &self,
        channel: &Arc<ChannelOf<F>>,
        generation: u64,
    ) -> Result<(), AttemptError> {
        self.guarded(channel.connect()).await?;
        self.guarded(channel.create_session(&self.session.name)).await?;
        self.guarded(channel.activate_session(&self.session.identity))
            .await?;

        let mut link = tokio::select! {
            _ = self.cancel.cancelled() => return Err(AttemptError::Cancelled),
            link = self.link.lock() => link,
        };

        let mut restored = 0;
        for bucket in self.buckets.buckets().await {
            let live = self
                .guarded(bucket.ensure_live_subscription(channel.as_ref(), self.sinks(generation)))
                .await?;
            let report = self.guarded(bucket.restore(live.as_ref())).await?;
            self.publish_rejections(bucket.interval(), &report);
            restored += report.accepted();
        }

        if self.cancel.is_cancelled() {
            return Err(AttemptError::Cancelled);
        }

        link.channel = Some(Arc::clone(channel));
        self.set_state(&mut link, ConnectionState::Connected);
        drop(link);

        self.connected_once.send_replace(true);
        info!(
            channel_generation = generation,
            restored_items = restored,
            "Connected"
        );
        self.publish(SupervisorEvent::ConnectionStatusChanged { connected: true });
        Ok(())
    }

    /// Waits for a fault on the current generation. `false` means cancelled.
    async fn wait_for_fault(&self) -> bool {
        loop {
            let notified = self.trigger.notify.notified();
            if self.trigger.is_requested() {
                return true;
            }
            tokio::select! {
                _ = notified => {}
                _ = self.cancel.cancelled() => return false,
            }
        }
    }

    async fn tear_down(&self) {
        let (channel, generation) = {
            let mut link = tokio::select! {
                _ = self.cancel.cancelled() => return,
                link = self.link.lock() => link,
            };
            let channel = link.channel.take();
            self.buckets.clear_live_references().await;
            self.set_state(&mut link, ConnectionState::Reconnecting);
            (channel, link.generation)
        };

        info!(channel_generation = generation, "Disconnected, reconnecting");
        self.publish(SupervisorEvent::ConnectionStatusChanged { connected: false });

        if let Some(channel) = channel {
            self.dispose_channel(&channel, generation).await;
        }
    }

    /// Creates monitored items for freshly added targets on a live link.
    async fn create_live(
        &self,
        bucket: &Bucket<SubscriptionOf<F>>,
        channel: &ChannelOf<F>,
        targets: &[MonitoredTarget],
        generation: u64,
    ) -> ChannelResult<()> {
        let live = bucket
            .ensure_live_subscription(channel, self.sinks(generation))
            .await?;
        let report = create_items(live.as_ref(), targets).await?;
        self.publish_rejections(bucket.interval(), &report);
        Ok(())
    }
}

// ============================================================================
// Supervisor
// ============================================================================

/// Keeps subscriptions alive across connection loss.
///
/// # Example
///
/// ```ignore
/// let supervisor = SubscriptionSupervisor::new(factory, &config);
/// supervisor.start()?;
///
/// let mut events = supervisor.events();
/// let handles = supervisor.subscribe_default(vec![NodeId::new("ns=2;s=Temp")?]).await?;
///
/// while let Ok(event) = events.recv().await {
///     println!("{event}");
/// }
/// ```
pub struct SubscriptionSupervisor<F: ChannelFactory> {
    shared: Arc<Shared<F>>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<F: ChannelFactory> SubscriptionSupervisor<F> {
    /// Creates an idle supervisor. Nothing happens until [`start`](Self::start).
    pub fn new(factory: F, config: &ClientConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (connected_once, _) = watch::channel(false);
        let (events, _) = broadcast::channel(config.supervisor.event_buffer.max(1));

        Self {
            shared: Arc::new(Shared {
                factory,
                endpoint: config.endpoint.clone(),
                session: config.session.clone(),
                config: config.supervisor.clone(),
                default_interval: config.supervisor.default_sampling_interval(),
                handles: HandleAllocator::new(),
                buckets: BucketRegistry::new(),
                link: Mutex::new(Link {
                    channel: None,
                    state: ConnectionState::Disconnected,
                    generation: 0,
                }),
                state_tx,
                connected_once,
                trigger: Arc::new(ReconnectTrigger::default()),
                events,
                cancel: CancellationToken::new(),
                started: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
            task: std::sync::Mutex::new(None),
        }
    }

    /// Spawns the background loop. Calling it again is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), SupervisorError> {
        self.ensure_not_disposed()?;
        if self
            .shared
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Supervisor already started");
            return Ok(());
        }

        info!(endpoint = %self.shared.endpoint.url, "Starting subscription supervisor");
        let task = tokio::spawn(Arc::clone(&self.shared).run());
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
        Ok(())
    }

    /// Registers `nodes` at `interval` and returns one handle per node, in order.
    ///
    /// Waits for the first successful connection. Once connected, monitored
    /// items are created immediately; otherwise they are created by the next
    /// restoration. A failure creating them on a live link is not returned
    /// here: it triggers a reconnect, which restores the targets. A dispose
    /// that lands while items are being created aborts the call with
    /// [`SupervisorError::Disposed`].
    pub async fn subscribe(
        &self,
        nodes: Vec<NodeId>,
        interval: SamplingInterval,
    ) -> Result<Vec<ClientHandle>, SupervisorError> {
        self.ensure_not_disposed()?;
        if nodes.is_empty() {
            return Ok(Vec::new());
        }

        self.wait_for_first_connection().await?;

        let handles = self.shared.handles.next_batch(nodes.len())?;
        let targets: Vec<MonitoredTarget> = handles
            .iter()
            .copied()
            .zip(nodes)
            .map(|(handle, node)| MonitoredTarget::new(handle, node))
            .collect();

        let link = self.shared.link.lock().await;
        self.ensure_not_disposed()?;
        let bucket = self.shared.buckets.add_targets(interval, &targets).await;

        if let (ConnectionState::Connected, Some(channel)) = (link.state, link.channel.as_ref()) {
            let generation = link.generation;
            let created = tokio::select! {
                biased;
                _ = self.shared.cancel.cancelled() => None,
                result = self.shared.create_live(&bucket, channel, &targets, generation) => Some(result),
            };
            match created {
                None => {
                    debug!(interval_ms = interval.as_millis(), "Subscribe abandoned by dispose");
                    return Err(SupervisorError::Disposed);
                }
                Some(Err(error)) => {
                    warn!(
                        channel_generation = generation,
                        interval_ms = interval.as_millis(),
                        error = %error,
                        "Creating monitored items failed, scheduling reconnect"
                    );
                    self.shared.trigger.fire(generation);
                }
                Some(Ok(())) => {}
            }
        }
        drop(link);

        debug!(
            handles = targets.len(),
            interval_ms = interval.as_millis(),
            "Registered targets"
        );
        Ok(handles)
    }

    /// [`subscribe`](Self::subscribe) at the configured default interval.
    pub async fn subscribe_default(
        &self,
        nodes: Vec<NodeId>,
    ) -> Result<Vec<ClientHandle>, SupervisorError> {
        self.subscribe(nodes, self.shared.default_interval).await
    }

    /// Reports a lost connection from outside the subscription sinks.
    ///
    /// Returns `true` if this started a reconnect cycle.
    pub fn report_connection_lost(&self, error: ChannelError) -> bool {
        if !self.state().is_connected() {
            return false;
        }
        let generation = self.shared.trigger.current_generation();
        let fired = self.shared.trigger.fire(generation);
        if fired {
            warn!(channel_generation = generation, error = %error, "Connection reported lost");
        }
        fired
    }

    /// Stops the loop and releases every server-side resource. Idempotent.
    pub async fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Disposing subscription supervisor");
        self.shared.cancel.cancel();

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            if let Err(error) = task.await {
                warn!(error = %error, "Supervisor task ended abnormally");
            }
        }

        let (channel, was_connected, generation) = {
            let mut link = self.shared.link.lock().await;
            let was_connected = link.state.is_connected();
            let channel = link.channel.take();
            self.shared.set_state(&mut link, ConnectionState::Stopped);
            (channel, was_connected, link.generation)
        };

        for live in self.shared.buckets.take_live_subscriptions().await {
            self.shared.dispose_subscription(&live).await;
        }
        if let Some(channel) = channel {
            self.shared.dispose_channel(&channel, generation).await;
        }
        if was_connected {
            self.shared
                .publish(SupervisorEvent::ConnectionStatusChanged { connected: false });
        }

        info!("Subscription supervisor disposed");
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    /// New receiver for [`SupervisorEvent`]s published from now on.
    pub fn events(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.shared.events.subscribe()
    }

    /// Number of handles issued so far.
    pub fn handle_count(&self) -> u32 {
        self.shared.handles.issued()
    }

    pub async fn bucket_count(&self) -> usize {
        self.shared.buckets.len().await
    }

    pub fn buckets(&self) -> &BucketRegistry<SubscriptionOf<F>> {
        &self.shared.buckets
    }

    pub fn default_interval(&self) -> SamplingInterval {
        self.shared.default_interval
    }

    fn ensure_not_disposed(&self) -> Result<(), SupervisorError> {
        if self.is_disposed() {
            return Err(SupervisorError::Disposed);
        }
        Ok(())
    }

    async fn wait_for_first_connection(&self) -> Result<(), SupervisorError> {
        let mut ready = self.shared.connected_once.subscribe();
        loop {
            if *ready.borrow_and_update() {
                return Ok(());
            }
            tokio::select! {
                changed = ready.changed() => {
                    if changed.is_err() {
                        return Err(SupervisorError::Disposed);
                    }
                }
                _ = self.shared.cancel.cancelled() => return Err(SupervisorError::Disposed),
            }
        }
    }
}

impl<F: ChannelFactory> Drop for SubscriptionSupervisor<F> {
    fn drop(&mut self) {
        // Lets the background task exit; server resources need an explicit dispose.
        self.shared.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uaconn_channel::sim::{SimFactory, SimServer};

    fn config() -> ClientConfig {
        let mut config = ClientConfig::for_endpoint("opc.tcp://sim:4840");
        config.supervisor.retry_interval_ms = 100;
        config
    }

    fn node(id: &str) -> NodeId {
        NodeId::new(id).unwrap()
    }

    async fn wait_connected(supervisor: &SubscriptionSupervisor<SimFactory>) {
        let mut state = supervisor.watch_state();
        state.wait_for(|s| s.is_connected()).await.unwrap();
    }

    // ------------------------------------------------------------------------
    // Trigger Tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_trigger_first_reporter_wins() {
        let trigger = ReconnectTrigger::default();
        trigger.arm(3);
        assert!(trigger.fire(3));
        assert!(!trigger.fire(3));
        assert!(trigger.is_requested());
    }

    #[test]
    fn test_trigger_ignores_stale_generation() {
        let trigger = ReconnectTrigger::default();
        trigger.arm(2);
        assert!(!trigger.fire(1));
        assert!(!trigger.is_requested());

        trigger.arm(3);
        assert!(!trigger.fire(2));
        assert!(trigger.fire(3));
    }

    // ------------------------------------------------------------------------
    // Lifecycle Tests
    // ------------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_start_connects_and_reports_state() {
        let server = SimServer::new();
        let supervisor = SubscriptionSupervisor::new(server.factory(), &config());
        assert_eq!(supervisor.state(), ConnectionState::Disconnected);

        supervisor.start().unwrap();
        supervisor.start().unwrap();
        wait_connected(&supervisor).await;

        assert_eq!(server.connect_attempts(), 1);
        supervisor.dispose().await;
        assert_eq!(supervisor.state(), ConnectionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_after_dispose_fails() {
        let server = SimServer::new();
        let supervisor = SubscriptionSupervisor::new(server.factory(), &config());
        supervisor.dispose().await;
        supervisor.dispose().await;

        assert_eq!(supervisor.start(), Err(SupervisorError::Disposed));
        assert_eq!(server.connect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_empty_returns_immediately() {
        let server = SimServer::new();
        let supervisor = SubscriptionSupervisor::new(server.factory(), &config());

        // Not started, so a non-empty subscribe would wait forever.
        let handles = supervisor.subscribe_default(Vec::new()).await.unwrap();
        assert!(handles.is_empty());
        assert_eq!(supervisor.handle_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_after_dispose_fails() {
        let server = SimServer::new();
        let supervisor = SubscriptionSupervisor::new(server.factory(), &config());
        supervisor.dispose().await;

        let result = supervisor.subscribe_default(vec![node("ns=2;s=A")]).await;
        assert_eq!(result, Err(SupervisorError::Disposed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_uses_default_interval() {
        let server = SimServer::new();
        let supervisor = SubscriptionSupervisor::new(server.factory(), &config());
        supervisor.start().unwrap();

        supervisor
            .subscribe_default(vec![node("ns=2;s=A")])
            .await
            .unwrap();

        let bucket = supervisor
            .buckets()
            .bucket(SamplingInterval::default())
            .await
            .unwrap();
        assert_eq!(bucket.len().await, 1);
        assert!(bucket.live_subscription().await.is_some());
        supervisor.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_connection_lost_requires_connection() {
        let server = SimServer::new();
        server.fail_next_connects(u32::MAX);
        let supervisor = SubscriptionSupervisor::new(server.factory(), &config());
        supervisor.start().unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(!supervisor.is_connected());
        assert!(!supervisor.report_connection_lost(ChannelError::ConnectionLost(
            "unreachable".to_string()
        )));
        supervisor.dispose().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_connection_lost_debounces() {
        let server = SimServer::new();
        let supervisor = SubscriptionSupervisor::new(server.factory(), &config());
        supervisor.start().unwrap();
        wait_connected(&supervisor).await;

        let mut events = supervisor.events();
        let lost = || ChannelError::ConnectionLost("reset".to_string());
        assert!(supervisor.report_connection_lost(lost()));
        assert!(!supervisor.report_connection_lost(lost()));

        assert_eq!(
            events.recv().await.unwrap(),
            SupervisorEvent::ConnectionStatusChanged { connected: false }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SupervisorEvent::ConnectionStatusChanged { connected: true }
        );
        assert_eq!(server.channels_created(), 2);
        assert_eq!(server.dispose_calls(1), 1);
        supervisor.dispose().await;
    }
}
