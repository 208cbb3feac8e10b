//! Accept loop wiring together configuration, the worker pool and the
//! connection registry.

use std::net::TcpListener;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::conn_manager::ConnManager;
use crate::config::Config;
use crate::connection::{ConnHook, Connection};
use crate::error::RouterError;
use crate::router::Router;
use crate::worker_pool::MsgHandler;

pub struct Server {
    name: String,
    config: Arc<Config>,
    msg_handler: Arc<MsgHandler>,
    conn_manager: Arc<ConnManager>,
    next_conn_id: Arc<AtomicU32>,
    on_conn_start: Option<ConnHook>,
    on_conn_stop: Option<ConnHook>,
}

impl Server {
    pub fn new(name: impl Into<String>, config: Config) -> Self {
        let config = Arc::new(config);
        let msg_handler = Arc::new(MsgHandler::new(config.worker_pool_size, config.max_task_len));
        Self {
            name: name.into(),
            config,
            msg_handler,
            conn_manager: ConnManager::new(),
            next_conn_id: Arc::new(AtomicU32::new(0)),
            on_conn_start: None,
            on_conn_stop: None,
        }
    }

    pub fn add_router(&self, msg_id: u32, router: Arc<dyn Router>) -> Result<(), RouterError> {
        self.msg_handler.add_router(msg_id, router)
    }

    pub fn set_on_conn_start(&mut self, hook: ConnHook) {
        self.on_conn_start = Some(hook);
    }

    pub fn set_on_conn_stop(&mut self, hook: ConnHook) {
        self.on_conn_stop = Some(hook);
    }

    pub fn conn_manager(&self) -> &Arc<ConnManager> {
        &self.conn_manager
    }

    /// Starts the worker pool and the accept loop on a dedicated thread.
    /// Returns once the listener is bound so callers can synchronize with
    /// the accept loop coming up; the loop itself keeps running in the
    /// background thread.
    pub fn start(&self) -> std::io::Result<()> {
        self.msg_handler.start_worker_pool()?;

        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)?;
        info!(name = %self.name, %addr, "server listening");

        let config = Arc::clone(&self.config);
        let msg_handler = Arc::clone(&self.msg_handler);
        let conn_manager = Arc::clone(&self.conn_manager);
        let next_conn_id = Arc::clone(&self.next_conn_id);
        let on_conn_start = self.on_conn_start.clone();
        let on_conn_stop = self.on_conn_stop.clone();

        zinx_utils::spawn_named("zinx-accept-loop", move || {
            for incoming in listener.incoming() {
                let socket = match incoming {
                    Ok(socket) => socket,
                    Err(err) => {
                        warn!(%err, "accept error");
                        continue;
                    }
                };

                if conn_manager.size() > config.max_conn {
                    warn!(max_conn = config.max_conn, "connection limit reached, closing new socket");
                    let _ = socket.shutdown(std::net::Shutdown::Both);
                    continue;
                }

                let conn_id = next_conn_id.fetch_add(1, Ordering::SeqCst);
                let conn = Connection::new(
                    conn_id,
                    socket,
                    Arc::clone(&config),
                    Arc::clone(&msg_handler),
                    Arc::clone(&conn_manager),
                    on_conn_start.clone(),
                    on_conn_stop.clone(),
                );
                conn_manager.add(&conn);
                conn.start();
            }
        });

        Ok(())
    }

    /// Starts the server, then blocks the calling thread forever.
    pub fn serve(&self) -> std::io::Result<()> {
        self.start()?;
        loop {
            std::thread::park();
        }
    }

    pub fn stop(&self) {
        info!(name = %self.name, "server shutting down");
        self.conn_manager.clear_conns();
    }
}
