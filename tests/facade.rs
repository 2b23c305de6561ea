//! End-to-end check through the `uaconn` facade: a supervisor and a pool
//! sharing one simulated endpoint.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.

use std::time::Duration;

use tokio::time::timeout;
use uaconn::channel::sim::SimServer;
use uaconn::types::{DataValue, NodeId, Variant};
use uaconn::{ChannelPool, ClientConfig, SubscriptionSupervisor, SupervisorEvent};

#[tokio::test(start_paused = true)]
async fn test_supervisor_and_pool_share_an_endpoint() {
    let config = ClientConfig::from_toml_str(
        r#"
        [endpoint]
        url = "opc.tcp://sim:4840"

        [supervisor]
        retry_interval_ms = 50

        [pool]
        max_size = 1
        "#,
    )
    .unwrap();

    let server = SimServer::new();
    let supervisor = SubscriptionSupervisor::new(server.factory(), &config);
    let pool = ChannelPool::new(server.factory(), &config);
    supervisor.start().unwrap();

    let handles = supervisor
        .subscribe_default(vec![NodeId::new("ns=2;s=Line1.Speed").unwrap()])
        .await
        .unwrap();
    let mut events = supervisor.events();

    let entry = pool.rent().await.unwrap();
    assert_ne!(entry.channel().id(), 1, "pool must not share the supervisor channel");
    pool.return_entry(entry).await;

    assert!(server.push_data_change(handles[0], DataValue::new(Variant::Int64(1200))));
    let event = timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, SupervisorEvent::DataChanged { handle, .. } if handle == handles[0]));

    pool.dispose().await.unwrap();
    supervisor.dispose().await;
    assert_eq!(server.disposed_channel_count(), 2);
}
