//! In-memory server simulator.
//!
//! [`SimServer`] stands in for a remote endpoint. Channels built by its
//! [`SimFactory`] record every call in a journal, can be scripted to fail a
//! number of times, and expose hooks to push data changes or drop the
//! connection. Nothing here touches the network.
//!
//! ```ignore
//! let server = SimServer::new();
//! server.fail_next_connects(1);
//! let pool = ChannelPool::new(server.factory(), config);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use uaconn_core::{ClientHandle, DataValue, MonitoredTarget, NodeId, SamplingInterval, StatusCode};

use crate::{
    Channel, ChannelError, ChannelFactory, ChannelResult, EndpointConfig, LiveSubscription,
    SubscriptionSinks, UserIdentity,
};

// ============================================================================
// Journal
// ============================================================================

/// One call observed by the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    Connect {
        channel: u64,
    },
    CreateSession {
        channel: u64,
        name: String,
    },
    ActivateSession {
        channel: u64,
        identity: &'static str,
    },
    CreateSubscription {
        channel: u64,
        subscription: u32,
        interval: SamplingInterval,
    },
    CreateMonitoredItems {
        subscription: u32,
        handles: Vec<ClientHandle>,
    },
    DisposeSubscription {
        subscription: u32,
    },
    DisposeChannel {
        channel: u64,
    },
}

// ============================================================================
// Server State
// ============================================================================

struct SubscriptionRecord {
    id: u32,
    channel: u64,
    interval: SamplingInterval,
    sinks: SubscriptionSinks,
    handles: HashSet<ClientHandle>,
    disposed: bool,
}

#[derive(Default)]
struct SimState {
    journal: Vec<SimCall>,
    next_channel: u64,
    next_subscription: u32,
    fail_connects: u32,
    fail_sessions: u32,
    fail_activations: u32,
    fail_subscriptions: u32,
    fail_monitored_items: u32,
    rejected_nodes: HashSet<NodeId>,
    disposed_channels: HashSet<u64>,
    subscriptions: Vec<SubscriptionRecord>,
    peak_live: HashMap<SamplingInterval, usize>,
    connect_latency: Duration,
    subscription_latency: Duration,
    dispose_latency: Duration,
}

impl SimState {
    fn take_failure(counter: &mut u32) -> bool {
        if *counter > 0 {
            *counter -= 1;
            true
        } else {
            false
        }
    }

    fn is_live(&self, record: &SubscriptionRecord) -> bool {
        !record.disposed && !self.disposed_channels.contains(&record.channel)
    }

    fn live_count(&self, interval: SamplingInterval) -> usize {
        self.subscriptions
            .iter()
            .filter(|r| r.interval == interval && self.is_live(r))
            .count()
    }

    fn check_open(&self, channel: u64) -> ChannelResult<()> {
        if self.disposed_channels.contains(&channel) {
            return Err(ChannelError::Disposed);
        }
        Ok(())
    }
}

/// Scriptable in-memory endpoint.
#[derive(Default)]
pub struct SimServer {
    state: Mutex<SimState>,
}

impl SimServer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // A panicking test thread must not cascade into every other assertion.
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Factory producing channels bound to this server.
    pub fn factory(self: &Arc<Self>) -> SimFactory {
        SimFactory {
            server: Arc::clone(self),
        }
    }

    // ------------------------------------------------------------------------
    // Scripting
    // ------------------------------------------------------------------------

    pub fn fail_next_connects(&self, count: u32) {
        self.lock().fail_connects = count;
    }

    pub fn fail_next_sessions(&self, count: u32) {
        self.lock().fail_sessions = count;
    }

    pub fn fail_next_activations(&self, count: u32) {
        self.lock().fail_activations = count;
    }

    pub fn fail_next_subscriptions(&self, count: u32) {
        self.lock().fail_subscriptions = count;
    }

    pub fn fail_next_monitored_items(&self, count: u32) {
        self.lock().fail_monitored_items = count;
    }

    /// Items for `node` are refused with `BadNodeIdUnknown`.
    pub fn reject_node(&self, node: NodeId) {
        self.lock().rejected_nodes.insert(node);
    }

    pub fn set_connect_latency(&self, latency: Duration) {
        self.lock().connect_latency = latency;
    }

    pub fn set_subscription_latency(&self, latency: Duration) {
        self.lock().subscription_latency = latency;
    }

    /// Delays every channel dispose call by `latency`.
    pub fn set_dispose_latency(&self, latency: Duration) {
        self.lock().dispose_latency = latency;
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    pub fn journal(&self) -> Vec<SimCall> {
        self.lock().journal.clone()
    }

    /// Number of connect calls, failed ones included.
    pub fn connect_attempts(&self) -> usize {
        self.lock()
            .journal
            .iter()
            .filter(|c| matches!(c, SimCall::Connect { .. }))
            .count()
    }

    pub fn channels_created(&self) -> u64 {
        self.lock().next_channel
    }

    pub fn disposed_channel_count(&self) -> usize {
        self.lock().disposed_channels.len()
    }

    pub fn is_channel_disposed(&self, channel: u64) -> bool {
        self.lock().disposed_channels.contains(&channel)
    }

    /// Number of times `channel` received a dispose call.
    pub fn dispose_calls(&self, channel: u64) -> usize {
        self.lock()
            .journal
            .iter()
            .filter(|c| matches!(c, SimCall::DisposeChannel { channel: id } if *id == channel))
            .count()
    }

    /// Subscriptions at `interval` that are neither disposed nor on a disposed channel.
    pub fn live_subscriptions(&self, interval: SamplingInterval) -> usize {
        self.lock().live_count(interval)
    }

    /// Highest value `live_subscriptions(interval)` ever reached.
    pub fn peak_live_subscriptions(&self, interval: SamplingInterval) -> usize {
        self.lock().peak_live.get(&interval).copied().unwrap_or(0)
    }

    /// Handle batches of every CreateMonitoredItems call, in call order.
    pub fn monitored_item_batches(&self) -> Vec<Vec<ClientHandle>> {
        self.lock()
            .journal
            .iter()
            .filter_map(|c| match c {
                SimCall::CreateMonitoredItems { handles, .. } => Some(handles.clone()),
                _ => None,
            })
            .collect()
    }

    // ------------------------------------------------------------------------
    // Server-initiated events
    // ------------------------------------------------------------------------

    /// Delivers a data change to the live subscription monitoring `handle`.
    ///
    /// Returns `false` if no live subscription monitors it.
    pub fn push_data_change(&self, handle: ClientHandle, value: DataValue) -> bool {
        let sinks = {
            let state = self.lock();
            state
                .subscriptions
                .iter()
                .rev()
                .find(|r| state.is_live(r) && r.handles.contains(&handle))
                .map(|r| r.sinks.clone())
        };

        match sinks {
            Some(sinks) => {
                sinks.data_changed(handle, value);
                true
            }
            None => false,
        }
    }

    /// Reports a lost connection through every live subscription.
    ///
    /// Returns how many subscriptions were notified.
    pub fn drop_connection(&self, reason: &str) -> usize {
        let sinks: Vec<SubscriptionSinks> = {
            let state = self.lock();
            state
                .subscriptions
                .iter()
                .filter(|r| state.is_live(r))
                .map(|r| r.sinks.clone())
                .collect()
        };

        debug!(subscriptions = sinks.len(), reason, "Simulating connection loss");
        for sink in &sinks {
            sink.connection_lost(ChannelError::ConnectionLost(reason.to_string()));
        }
        sinks.len()
    }

    /// Reports a lost connection through every subscription ever created on
    /// `channel`, disposed or not, the way a late transport callback would.
    pub fn fault_channel(&self, channel: u64, reason: &str) -> usize {
        let sinks: Vec<SubscriptionSinks> = self
            .lock()
            .subscriptions
            .iter()
            .filter(|r| r.channel == channel)
            .map(|r| r.sinks.clone())
            .collect();

        debug!(channel, subscriptions = sinks.len(), reason, "Simulating late channel fault");
        for sink in &sinks {
            sink.connection_lost(ChannelError::ConnectionLost(reason.to_string()));
        }
        sinks.len()
    }
}

// ============================================================================
// Factory / Channel / Subscription
// ============================================================================

/// Factory handing out [`SimChannel`]s.
#[derive(Clone)]
pub struct SimFactory {
    server: Arc<SimServer>,
}

impl SimFactory {
    pub fn server(&self) -> &Arc<SimServer> {
        &self.server
    }
}

impl ChannelFactory for SimFactory {
    type Channel = SimChannel;

    fn create(&self, endpoint: &EndpointConfig) -> ChannelResult<SimChannel> {
        let id = {
            let mut state = self.server.lock();
            state.next_channel += 1;
            state.next_channel
        };
        Ok(SimChannel {
            id,
            endpoint: endpoint.url.clone(),
            server: Arc::clone(&self.server),
        })
    }
}

/// Channel bound to a [`SimServer`].
pub struct SimChannel {
    id: u64,
    endpoint: String,
    server: Arc<SimServer>,
}

impl SimChannel {
    /// Sequence number assigned by the factory, starting at 1.
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[async_trait]
impl Channel for SimChannel {
    type Subscription = SimSubscription;

    async fn connect(&self) -> ChannelResult<()> {
        let latency = self.server.lock().connect_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.server.lock();
        state.journal.push(SimCall::Connect { channel: self.id });
        state.check_open(self.id)?;
        if SimState::take_failure(&mut state.fail_connects) {
            return Err(ChannelError::connect(&self.endpoint, "simulated refusal"));
        }
        Ok(())
    }

    async fn create_session(&self, name: &str) -> ChannelResult<()> {
        let mut state = self.server.lock();
        state.journal.push(SimCall::CreateSession {
            channel: self.id,
            name: name.to_string(),
        });
        state.check_open(self.id)?;
        if SimState::take_failure(&mut state.fail_sessions) {
            return Err(ChannelError::Session("simulated refusal".to_string()));
        }
        Ok(())
    }

    async fn activate_session(&self, identity: &UserIdentity) -> ChannelResult<()> {
        let mut state = self.server.lock();
        state.journal.push(SimCall::ActivateSession {
            channel: self.id,
            identity: identity.kind(),
        });
        state.check_open(self.id)?;
        if SimState::take_failure(&mut state.fail_activations) {
            return Err(ChannelError::Activation("simulated refusal".to_string()));
        }
        Ok(())
    }

    async fn create_subscription(
        &self,
        interval: SamplingInterval,
        sinks: SubscriptionSinks,
    ) -> ChannelResult<SimSubscription> {
        let latency = self.server.lock().subscription_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.server.lock();
        state.check_open(self.id)?;
        if SimState::take_failure(&mut state.fail_subscriptions) {
            return Err(ChannelError::Subscription("simulated refusal".to_string()));
        }

        state.next_subscription += 1;
        let id = state.next_subscription;
        state.journal.push(SimCall::CreateSubscription {
            channel: self.id,
            subscription: id,
            interval,
        });
        state.subscriptions.push(SubscriptionRecord {
            id,
            channel: self.id,
            interval,
            sinks,
            handles: HashSet::new(),
            disposed: false,
        });

        let live = state.live_count(interval);
        let peak = state.peak_live.entry(interval).or_insert(0);
        *peak = (*peak).max(live);

        Ok(SimSubscription {
            id,
            interval,
            server: Arc::clone(&self.server),
        })
    }

    async fn dispose(&self) -> ChannelResult<()> {
        let latency = self.server.lock().dispose_latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.server.lock();
        state.journal.push(SimCall::DisposeChannel { channel: self.id });
        state.disposed_channels.insert(self.id);
        Ok(())
    }
}

/// Subscription created by a [`SimChannel`].
pub struct SimSubscription {
    id: u32,
    interval: SamplingInterval,
    server: Arc<SimServer>,
}

#[async_trait]
impl LiveSubscription for SimSubscription {
    fn id(&self) -> u32 {
        self.id
    }

    fn interval(&self) -> SamplingInterval {
        self.interval
    }

    async fn create_monitored_items(
        &self,
        targets: &[MonitoredTarget],
    ) -> ChannelResult<Vec<StatusCode>> {
        let mut state = self.server.lock();
        state.journal.push(SimCall::CreateMonitoredItems {
            subscription: self.id,
            handles: targets.iter().map(|t| t.handle).collect(),
        });
        if SimState::take_failure(&mut state.fail_monitored_items) {
            return Err(ChannelError::MonitoredItems("simulated refusal".to_string()));
        }

        let statuses: Vec<StatusCode> = targets
            .iter()
            .map(|t| {
                if state.rejected_nodes.contains(&t.node) {
                    StatusCode::BAD_NODE_ID_UNKNOWN
                } else {
                    StatusCode::GOOD
                }
            })
            .collect();

        let accepted: Vec<ClientHandle> = targets
            .iter()
            .zip(statuses.iter())
            .filter(|(_, status)| status.is_good())
            .map(|(t, _)| t.handle)
            .collect();

        let id = self.id;
        match state.subscriptions.iter_mut().find(|r| r.id == id) {
            Some(record) if !record.disposed => {
                record.handles.extend(accepted);
                Ok(statuses)
            }
            _ => Err(ChannelError::Disposed),
        }
    }

    async fn dispose(&self) -> ChannelResult<()> {
        let mut state = self.server.lock();
        state.journal.push(SimCall::DisposeSubscription {
            subscription: self.id,
        });
        let id = self.id;
        if let Some(record) = state.subscriptions.iter_mut().find(|r| r.id == id) {
            record.disposed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uaconn_core::Variant;

    fn node(id: &str) -> NodeId {
        NodeId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_scripted_connect_failure() {
        let server = SimServer::new();
        server.fail_next_connects(1);
        let factory = server.factory();

        let first = factory.create(&EndpointConfig::default()).unwrap();
        assert!(first.connect().await.is_err());

        let second = factory.create(&EndpointConfig::default()).unwrap();
        assert!(second.connect().await.is_ok());
        assert_eq!(server.connect_attempts(), 2);
        assert_eq!(second.id(), 2);
    }

    #[tokio::test]
    async fn test_rejected_node_gets_bad_status() {
        let server = SimServer::new();
        server.reject_node(node("ns=2;s=Missing"));
        let channel = server.factory().create(&EndpointConfig::default()).unwrap();
        let interval = SamplingInterval::default();
        let sub = channel
            .create_subscription(interval, SubscriptionSinks::discard())
            .await
            .unwrap();

        let statuses = sub
            .create_monitored_items(&[
                MonitoredTarget::new(ClientHandle::new(1), node("ns=2;s=Temp")),
                MonitoredTarget::new(ClientHandle::new(2), node("ns=2;s=Missing")),
            ])
            .await
            .unwrap();

        assert_eq!(statuses, vec![StatusCode::GOOD, StatusCode::BAD_NODE_ID_UNKNOWN]);
        assert!(server.push_data_change(ClientHandle::new(1), DataValue::new(Variant::Int64(5))));
        assert!(!server.push_data_change(ClientHandle::new(2), DataValue::default()));
    }

    #[tokio::test]
    async fn test_disposed_channel_hides_subscriptions() {
        let server = SimServer::new();
        let channel = server.factory().create(&EndpointConfig::default()).unwrap();
        let interval = SamplingInterval::default();
        let _sub = channel
            .create_subscription(interval, SubscriptionSinks::discard())
            .await
            .unwrap();
        assert_eq!(server.live_subscriptions(interval), 1);

        channel.dispose().await.unwrap();
        assert_eq!(server.live_subscriptions(interval), 0);
        assert_eq!(server.peak_live_subscriptions(interval), 1);
        assert!(matches!(channel.connect().await, Err(ChannelError::Disposed)));
        assert_eq!(server.dispose_calls(channel.id()), 1);
    }

    #[tokio::test]
    async fn test_fault_channel_reaches_disposed_subscriptions() {
        let server = SimServer::new();
        let channel = server.factory().create(&EndpointConfig::default()).unwrap();
        let _sub = channel
            .create_subscription(SamplingInterval::default(), SubscriptionSinks::discard())
            .await
            .unwrap();
        channel.dispose().await.unwrap();

        assert_eq!(server.drop_connection("gone"), 0);
        assert_eq!(server.fault_channel(channel.id(), "late"), 1);
        assert_eq!(server.fault_channel(99, "unknown"), 0);
    }
}
