//! Process-wide registry of live connections.
//!
//! Two independent locks — one per map — so a lookup by `user_id` never
//! contends with a lookup by `conn_id`, and vice versa.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::connection::Connection;

#[derive(Default)]
pub struct ConnManager {
    connections: RwLock<HashMap<u32, Arc<Connection>>>,
    user_to_conn: RwLock<HashMap<u64, u32>>,
}

impl ConnManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add(&self, conn: &Arc<Connection>) {
        self.connections.write().unwrap().insert(conn.conn_id(), Arc::clone(conn));
        let size = self.connections.read().unwrap().len();
        info!(conn_id = conn.conn_id(), size, "registered connection");
    }

    /// Removes `conn` from the registry, then drops its `user_to_conn`
    /// mapping only if that mapping still points at `conn` — a newer
    /// connection may have since claimed the same user id.
    pub fn remove(&self, conn: &Arc<Connection>) {
        self.connections.write().unwrap().remove(&conn.conn_id());
        let size = self.connections.read().unwrap().len();

        if let Ok(user_id) = conn.get_property::<u64>("userID") {
            let mut users = self.user_to_conn.write().unwrap();
            if users.get(&user_id) == Some(&conn.conn_id()) {
                users.remove(&user_id);
            }
        }

        info!(conn_id = conn.conn_id(), size, "removed connection");
    }

    pub fn get(&self, conn_id: u32) -> Option<Arc<Connection>> {
        self.connections.read().unwrap().get(&conn_id).cloned()
    }

    pub fn size(&self) -> usize {
        self.connections.read().unwrap().len()
    }

    /// Snapshots both maps under their write locks, replaces them with
    /// empty maps, releases the locks, then stops every snapshotted
    /// connection. `Connection::stop` calls back into `remove`, which would
    /// deadlock if it re-acquired a lock still held by this method.
    pub fn clear_conns(&self) {
        let snapshot: Vec<Arc<Connection>> = {
            let mut connections = self.connections.write().unwrap();
            let mut users = self.user_to_conn.write().unwrap();
            let snapshot = connections.values().cloned().collect();
            connections.clear();
            users.clear();
            snapshot
        };

        for conn in snapshot {
            conn.stop();
        }
    }

    pub fn all(&self) -> Vec<Arc<Connection>> {
        self.connections.read().unwrap().values().cloned().collect()
    }

    /// Maps `user_id` to `conn_id`, overwriting any prior mapping for that
    /// user. No-op if `conn_id` isn't currently registered.
    pub fn set_conn_by_user_id(&self, conn_id: u32, user_id: u64) {
        if !self.connections.read().unwrap().contains_key(&conn_id) {
            return;
        }
        self.user_to_conn.write().unwrap().insert(user_id, conn_id);
    }

    pub fn clear_conn_by_user_id(&self, user_id: u64) {
        self.user_to_conn.write().unwrap().remove(&user_id);
    }

    pub fn get_conn_by_user_id(&self, user_id: u64) -> Option<Arc<Connection>> {
        let conn_id = *self.user_to_conn.read().unwrap().get(&user_id)?;
        self.connections.read().unwrap().get(&conn_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::worker_pool::MsgHandler;
    use std::net::{TcpListener, TcpStream};

    fn dummy_conn(conn_id: u32) -> Arc<Connection> {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        drop(client);

        let config = Arc::new(Config::default());
        let msg_handler = Arc::new(MsgHandler::new(config.worker_pool_size, config.max_task_len));
        let conn_manager = ConnManager::new();
        Connection::new(conn_id, server_side, config, msg_handler, conn_manager, None, None)
    }

    #[test]
    fn remove_clears_registry_and_user_mapping() {
        let manager = ConnManager::new();
        let conn = dummy_conn(1);
        manager.add(&conn);
        conn.set_property("userID", Box::new(42u64));
        manager.set_conn_by_user_id(1, 42);

        assert!(manager.get_conn_by_user_id(42).is_some());
        manager.remove(&conn);

        assert!(manager.get(1).is_none());
        assert!(manager.get_conn_by_user_id(42).is_none());
    }

    #[test]
    fn remove_does_not_clobber_a_newer_mapping_for_the_same_user() {
        let manager = ConnManager::new();
        let stale = dummy_conn(1);
        let fresh = dummy_conn(2);
        manager.add(&stale);
        manager.add(&fresh);

        stale.set_property("userID", Box::new(7u64));
        fresh.set_property("userID", Box::new(7u64));
        manager.set_conn_by_user_id(1, 7);
        manager.set_conn_by_user_id(2, 7);

        manager.remove(&stale);

        let resolved = manager.get_conn_by_user_id(7).unwrap();
        assert_eq!(resolved.conn_id(), 2);
    }

    #[test]
    fn set_conn_by_user_id_ignores_unregistered_conn_id() {
        let manager = ConnManager::new();
        manager.set_conn_by_user_id(99, 1);
        assert!(manager.get_conn_by_user_id(1).is_none());
    }

    #[test]
    fn clear_conns_empties_both_maps() {
        let manager = ConnManager::new();
        let conn = dummy_conn(1);
        manager.add(&conn);
        manager.set_conn_by_user_id(1, 5);

        manager.clear_conns();

        assert_eq!(manager.size(), 0);
        assert!(manager.get_conn_by_user_id(5).is_none());
    }
}
