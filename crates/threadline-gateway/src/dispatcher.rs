use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use threadline_types::events::GatewayEvent;

type ConnectionMap = HashMap<Uuid, HashMap<Uuid, mpsc::UnboundedSender<GatewayEvent>>>;

/// Registry of live gateway connections. A user is present while they hold
/// at least one connection; every connect or disconnect pushes the full
/// online list to everyone.
#[derive(Clone, Default)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

#[derive(Default)]
struct DispatcherInner {
    /// user_id -> (conn_id -> sender)
    connections: RwLock<ConnectionMap>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection for `user_id`. Returns (conn_id, receiver).
    pub async fn connect(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<GatewayEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut connections = self.inner.connections.write().await;
        connections.entry(user_id).or_default().insert(conn_id, tx);
        announce_presence(&connections);
        drop(connections);

        debug!("{} registered connection {}", user_id, conn_id);
        (conn_id, rx)
    }

    /// Drop one connection. The user leaves the online list once their last
    /// connection is gone.
    pub async fn disconnect(&self, user_id: Uuid, conn_id: Uuid) {
        let mut connections = self.inner.connections.write().await;
        if let Some(conns) = connections.get_mut(&user_id) {
            conns.remove(&conn_id);
            if conns.is_empty() {
                connections.remove(&user_id);
            }
        }
        announce_presence(&connections);
        drop(connections);

        debug!("{} dropped connection {}", user_id, conn_id);
    }

    /// Ids of every user holding a connection, sorted.
    pub async fn online_users(&self) -> Vec<Uuid> {
        online_ids(&*self.inner.connections.read().await)
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.connections.read().await.contains_key(&user_id)
    }

    /// Send an event to every connection of one user. Returns how many
    /// connections accepted it; zero means the user is offline and the event
    /// is dropped.
    pub async fn send_to_user(&self, user_id: Uuid, event: GatewayEvent) -> usize {
        let connections = self.inner.connections.read().await;
        let Some(conns) = connections.get(&user_id) else {
            return 0;
        };
        conns
            .values()
            .filter(|tx| tx.send(event.clone()).is_ok())
            .count()
    }

    /// Send an event to every connection.
    pub async fn broadcast(&self, event: GatewayEvent) {
        fan_out(&*self.inner.connections.read().await, &event);
    }
}

/// Push the online list while the caller still holds the write guard, so
/// presence snapshots reach every queue in the order the map changed.
fn announce_presence(connections: &ConnectionMap) {
    let online = online_ids(connections);
    fan_out(connections, &GatewayEvent::OnlineUsers { user_ids: online });
}

fn fan_out(connections: &ConnectionMap, event: &GatewayEvent) {
    for tx in connections.values().flat_map(|conns| conns.values()) {
        let _ = tx.send(event.clone());
    }
}

fn online_ids(connections: &ConnectionMap) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = connections.keys().copied().collect();
    ids.sort();
    ids
}
