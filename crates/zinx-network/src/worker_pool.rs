//! Routing table and bounded worker pool.
//!
//! Workers are long-lived threads, one per queue; `SendMsgToTaskQueue`
//! dispatches round-robin rather than by connection id, trading
//! per-connection ordering for simpler load balance (see the ordering
//! notes in [`crate::connection`]).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use crossbeam_channel::{Receiver, Sender};
use tracing::warn;

use crate::error::RouterError;
use crate::request::Request;
use crate::router::Router;

pub struct MsgHandler {
    apis: RwLock<HashMap<u32, Arc<dyn Router>>>,
    task_queues: Vec<(Sender<Request>, Receiver<Request>)>,
    worker_pool_size: u32,
    round_robin_counter: AtomicU32,
}

impl MsgHandler {
    pub fn new(worker_pool_size: u32, max_task_len: usize) -> Self {
        let task_queues = (0..worker_pool_size.max(1))
            .map(|_| crossbeam_channel::bounded(max_task_len.max(1)))
            .collect();
        Self {
            apis: RwLock::new(HashMap::new()),
            task_queues,
            worker_pool_size,
            round_robin_counter: AtomicU32::new(0),
        }
    }

    pub fn worker_pool_size(&self) -> u32 {
        self.worker_pool_size
    }

    /// Binds `router` to `msg_id`. Must be called before [`Self::start_worker_pool`];
    /// the routing table is treated as immutable once the pool is running.
    pub fn add_router(&self, msg_id: u32, router: Arc<dyn Router>) -> Result<(), RouterError> {
        let mut apis = self.apis.write().unwrap();
        if apis.contains_key(&msg_id) {
            return Err(RouterError::DuplicateRoute(msg_id));
        }
        apis.insert(msg_id, router);
        Ok(())
    }

    /// Spawns one worker thread per task queue. One-shot: call once, after
    /// every `AddRouter` call and before the accept loop starts.
    ///
    /// Unlike the per-connection threads (reader/writer/heartbeat), a
    /// failure to spawn a worker thread is fatal to startup rather than
    /// merely logged: a short worker pool silently breaks the round-robin
    /// modulus every caller of `send_msg_to_task_queue` relies on.
    pub fn start_worker_pool(self: &Arc<Self>) -> std::io::Result<()> {
        if self.worker_pool_size == 0 {
            return Ok(());
        }
        for worker_id in 0..self.task_queues.len() {
            let handler = Arc::clone(self);
            zinx_utils::spawn_named_or_err(format!("zinx-worker-{worker_id}"), move || {
                handler.worker_loop(worker_id);
            })?;
        }
        Ok(())
    }

    fn worker_loop(&self, worker_id: usize) {
        let (_, rx) = &self.task_queues[worker_id];
        while let Ok(request) = rx.recv() {
            self.do_msg_handler(&request);
        }
    }

    /// Round-robin enqueue; blocks the caller when the target queue is at
    /// capacity, which is how read loops apply back-pressure.
    pub fn send_msg_to_task_queue(&self, request: Request) {
        let worker_id = self.round_robin_counter.fetch_add(1, Ordering::Relaxed) as usize
            % self.task_queues.len();
        let (tx, _) = &self.task_queues[worker_id];
        let _ = tx.send(request);
    }

    pub fn do_msg_handler(&self, request: &Request) {
        let msg_id = request.message().msg_id();
        let router = self.apis.read().unwrap().get(&msg_id).cloned();
        match router {
            Some(router) => {
                router.pre_handle(request);
                router.handle(request);
                router.post_handle(request);
            }
            None => {
                warn!(msg_id, "no router registered, dropping request");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingRouter(Arc<AtomicUsize>);
    impl Router for CountingRouter {
        fn handle(&self, _req: &Request) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn add_router_rejects_duplicate_msg_id() {
        let handler = MsgHandler::new(1, 4);
        let count = Arc::new(AtomicUsize::new(0));
        handler.add_router(1, Arc::new(CountingRouter(Arc::clone(&count)))).unwrap();
        let err = handler.add_router(1, Arc::new(CountingRouter(count))).unwrap_err();
        assert_eq!(err, RouterError::DuplicateRoute(1));
    }

    #[test]
    fn unknown_msg_id_is_dropped_without_panic() {
        use crate::conn_manager::ConnManager;
        use crate::config::Config;
        use crate::connection::Connection;
        use crate::message::Message;
        use std::net::{TcpListener, TcpStream};

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let _client = TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();

        let config = Arc::new(Config::default());
        let handler = Arc::new(MsgHandler::new(1, 4));
        let conn_manager = ConnManager::new();
        let conn = Connection::new(1, server_side, config, Arc::clone(&handler), conn_manager, None, None);

        let request = Request::new(conn, Message::new(999, Vec::new()));
        handler.do_msg_handler(&request);
    }
}
