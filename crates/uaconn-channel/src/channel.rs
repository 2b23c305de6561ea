//! Channel, subscription and factory traits.
//!
//! A [`Channel`] is single-use: once it has failed or been disposed it is
//! never reopened, a fresh one is built through the [`ChannelFactory`]
//! instead. Implementations are not required to be re-entrant; callers in
//! this workspace guarantee one logical owner at a time.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use uaconn_core::{ClientHandle, DataValue, MonitoredTarget, SamplingInterval, StatusCode};

use crate::{ChannelError, ChannelResult, EndpointConfig, UserIdentity};

// ============================================================================
// Subscription Sinks
// ============================================================================

type DataChangedFn = dyn Fn(ClientHandle, DataValue) + Send + Sync;
type ConnectionLostFn = dyn Fn(ChannelError) + Send + Sync;

/// Callbacks a live subscription reports into.
///
/// Both callbacks are invoked from the transport's own tasks and must not
/// block. Notifications for one handle arrive in order; there is no ordering
/// across handles.
#[derive(Clone)]
pub struct SubscriptionSinks {
    on_data_changed: Arc<DataChangedFn>,
    on_connection_lost: Arc<ConnectionLostFn>,
}

impl SubscriptionSinks {
    pub fn new(
        on_data_changed: impl Fn(ClientHandle, DataValue) + Send + Sync + 'static,
        on_connection_lost: impl Fn(ChannelError) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_data_changed: Arc::new(on_data_changed),
            on_connection_lost: Arc::new(on_connection_lost),
        }
    }

    /// Sinks that drop everything.
    pub fn discard() -> Self {
        Self::new(|_, _| {}, |_| {})
    }

    /// Delivers a data change notification.
    pub fn data_changed(&self, handle: ClientHandle, value: DataValue) {
        (self.on_data_changed)(handle, value);
    }

    /// Reports that the subscription's connection is unrecoverable.
    pub fn connection_lost(&self, error: ChannelError) {
        (self.on_connection_lost)(error);
    }
}

impl fmt::Debug for SubscriptionSinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionSinks").finish_non_exhaustive()
    }
}

// ============================================================================
// Traits
// ============================================================================

/// A server-side subscription bound to one channel.
#[async_trait]
pub trait LiveSubscription: Send + Sync + 'static {
    /// Server-assigned subscription id.
    fn id(&self) -> u32;

    /// Publishing/sampling interval the subscription was created with.
    fn interval(&self) -> SamplingInterval;

    /// Registers monitored items in one batched request.
    ///
    /// Returns one status per target, in input order. A transport-level
    /// failure is an `Err`; a per-item refusal is a bad status in the vector.
    async fn create_monitored_items(
        &self,
        targets: &[MonitoredTarget],
    ) -> ChannelResult<Vec<StatusCode>>;

    /// Deletes the subscription on the server.
    async fn dispose(&self) -> ChannelResult<()>;
}

/// One authenticated connection to the endpoint.
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    type Subscription: LiveSubscription;

    /// Opens the transport and secure channel.
    async fn connect(&self) -> ChannelResult<()>;

    /// CreateSession with the given session name.
    async fn create_session(&self, name: &str) -> ChannelResult<()>;

    /// ActivateSession with the given identity.
    async fn activate_session(&self, identity: &UserIdentity) -> ChannelResult<()>;

    /// Creates a subscription at `interval` reporting into `sinks`.
    async fn create_subscription(
        &self,
        interval: SamplingInterval,
        sinks: SubscriptionSinks,
    ) -> ChannelResult<Self::Subscription>;

    /// Closes the session and the transport. The channel is unusable afterwards.
    async fn dispose(&self) -> ChannelResult<()>;
}

/// Builds fresh, unconnected channels.
pub trait ChannelFactory: Send + Sync + 'static {
    type Channel: Channel;

    /// Creates a channel for `endpoint` without performing any I/O.
    fn create(&self, endpoint: &EndpointConfig) -> ChannelResult<Self::Channel>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uaconn_core::Variant;

    #[test]
    fn test_sinks_invoke_callbacks() {
        let data = Arc::new(AtomicUsize::new(0));
        let lost = Arc::new(AtomicUsize::new(0));

        let data_count = Arc::clone(&data);
        let lost_count = Arc::clone(&lost);
        let sinks = SubscriptionSinks::new(
            move |handle, _| {
                assert_eq!(handle, ClientHandle::new(3));
                data_count.fetch_add(1, Ordering::SeqCst);
            },
            move |_| {
                lost_count.fetch_add(1, Ordering::SeqCst);
            },
        );

        let cloned = sinks.clone();
        sinks.data_changed(ClientHandle::new(3), DataValue::new(Variant::Int64(1)));
        cloned.data_changed(ClientHandle::new(3), DataValue::new(Variant::Int64(2)));
        cloned.connection_lost(ChannelError::ConnectionLost("reset".to_string()));

        assert_eq!(data.load(Ordering::SeqCst), 2);
        assert_eq!(lost.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_discard_sinks() {
        let sinks = SubscriptionSinks::discard();
        sinks.data_changed(ClientHandle::new(1), DataValue::default());
        sinks.connection_lost(ChannelError::Disposed);
        assert!(format!("{sinks:?}").contains("SubscriptionSinks"));
    }
}
