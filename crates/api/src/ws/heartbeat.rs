use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::ws::hub::RoomHub;

/// Keep idle gateway sockets alive behind proxies that drop quiet
/// connections.
///
/// Every `period` the hub pings each connection. Channels that no longer
/// accept frames belong to sockets whose receive loop is still winding down;
/// they are only counted here, since that loop owns presence cleanup.
pub fn start_heartbeat(hub: Arc<RoomHub>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nobody needs a ping at boot.
        interval.tick().await;

        loop {
            interval.tick().await;
            let total = hub.connection_count().await;
            let reached = hub.ping_all().await;
            if reached < total {
                tracing::debug!(total, reached, "Heartbeat found closing gateway sockets");
            } else {
                tracing::trace!(total, "Gateway heartbeat");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use axum::extract::ws::Message;

    use super::*;

    #[tokio::test]
    async fn pings_live_connections_each_period() {
        let hub = Arc::new(RoomHub::new());
        let mut rx = hub.add("live".into()).await;

        let handle = start_heartbeat(Arc::clone(&hub), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.abort();

        let mut pings = 0;
        while let Ok(message) = rx.try_recv() {
            assert!(matches!(message, Message::Ping(_)));
            pings += 1;
        }
        assert!(pings >= 2, "got {pings} pings");
    }
}
