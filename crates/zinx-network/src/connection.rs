//! Per-connection lifecycle: reader, writer and heartbeat threads sharing
//! one socket through a handful of synchronized handles.

use std::any::Any;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, info, warn};

use crate::conn_manager::ConnManager;
use crate::config::Config;
use crate::datapack::{DataPack, HEAD_LEN};
use crate::error::PropertyError;
use crate::message::Message;
use crate::request::Request;
use crate::worker_pool::MsgHandler;

/// A user-registered callback fired at a connection lifecycle point.
pub type ConnHook = Arc<dyn Fn(&Arc<Connection>) + Send + Sync>;

/// Per-connection mutable state that has no meaning without the other: a
/// handler reading `last_activity` while a property write is in flight (or
/// vice versa) would see a torn view, so both live under one lock, matching
/// the reference `propertyLock` which guards both.
struct ConnState {
    properties: HashMap<String, Box<dyn Any + Send + Sync>>,
    last_activity: Instant,
}

/// Owns one accepted TCP socket and the reader/writer/heartbeat threads that
/// service it.
///
/// Cloned as `Arc<Connection>` between [`ConnManager`], the worker pool
/// (via [`Request`]), and its own threads; no single owner outlives the
/// others, so `Stop` has to be callable from any of them and safe to call
/// more than once.
pub struct Connection {
    conn_id: u32,
    socket: TcpStream,
    config: Arc<Config>,
    msg_handler: Arc<MsgHandler>,
    conn_manager: Arc<ConnManager>,
    closed: AtomicBool,
    writer_exit_tx: Sender<()>,
    writer_exit_rx: Receiver<()>,
    heartbeat_exit_tx: Sender<()>,
    heartbeat_exit_rx: Receiver<()>,
    outbound_tx: Sender<Vec<u8>>,
    /// Taken once by `write_loop` and dropped when that loop returns, so a
    /// `send_msg` blocked on a full channel errors out instead of blocking
    /// forever once the connection closes (see `write_loop`).
    outbound_rx: Mutex<Option<Receiver<Vec<u8>>>>,
    state: RwLock<ConnState>,
    on_conn_start: Mutex<Option<ConnHook>>,
    on_conn_stop: Mutex<Option<ConnHook>>,
}

impl Connection {
    pub fn new(
        conn_id: u32,
        socket: TcpStream,
        config: Arc<Config>,
        msg_handler: Arc<MsgHandler>,
        conn_manager: Arc<ConnManager>,
        on_conn_start: Option<ConnHook>,
        on_conn_stop: Option<ConnHook>,
    ) -> Arc<Self> {
        let (writer_exit_tx, writer_exit_rx) = crossbeam_channel::bounded(1);
        let (heartbeat_exit_tx, heartbeat_exit_rx) = crossbeam_channel::bounded(1);
        let (outbound_tx, outbound_rx) = crossbeam_channel::bounded(256);
        Arc::new(Self {
            conn_id,
            socket,
            config,
            msg_handler,
            conn_manager,
            closed: AtomicBool::new(false),
            writer_exit_tx,
            writer_exit_rx,
            heartbeat_exit_tx,
            heartbeat_exit_rx,
            outbound_tx,
            outbound_rx: Mutex::new(Some(outbound_rx)),
            state: RwLock::new(ConnState { properties: HashMap::new(), last_activity: Instant::now() }),
            on_conn_start: Mutex::new(on_conn_start),
            on_conn_stop: Mutex::new(on_conn_stop),
        })
    }

    pub fn conn_id(&self) -> u32 {
        self.conn_id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Spawns the reader, writer and heartbeat threads, then fires
    /// `OnConnStart`.
    pub fn start(self: &Arc<Self>) {
        let reader = Arc::clone(self);
        zinx_utils::spawn_named(format!("zinx-conn-{}-reader", self.conn_id), move || {
            reader.read_loop();
        });

        let writer = Arc::clone(self);
        zinx_utils::spawn_named(format!("zinx-conn-{}-writer", self.conn_id), move || {
            writer.write_loop();
        });

        let heartbeat = Arc::clone(self);
        zinx_utils::spawn_named(format!("zinx-conn-{}-heartbeat", self.conn_id), move || {
            heartbeat.heartbeat_loop();
        });

        if let Some(hook) = self.on_conn_start.lock().unwrap().clone() {
            hook(self);
        }
    }

    /// Idempotent teardown: flips `closed`, fires `OnConnStop`, unregisters
    /// from the manager, shuts the socket down and wakes writer/heartbeat.
    pub fn stop(self: &Arc<Self>) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(hook) = self.on_conn_stop.lock().unwrap().clone() {
            hook(self);
        }

        self.conn_manager.remove(self);

        let _ = self.socket.shutdown(Shutdown::Both);
        let _ = self.writer_exit_tx.try_send(());
        let _ = self.heartbeat_exit_tx.try_send(());
    }

    /// Encodes `(msg_id, data)` and enqueues it for the writer. A no-op on a
    /// closed connection, per the reference's silent-swallow policy.
    pub fn send_msg(&self, msg_id: u32, data: &[u8]) {
        if self.is_closed() {
            return;
        }
        let dp = DataPack::new(self.config.max_package_size);
        let frame = dp.pack(msg_id, data);
        // Blocks if the outbound channel is saturated, matching the
        // back-pressure the reader's queue submission already applies.
        // Once `write_loop` drops its `Receiver` (on `Stop`), this errors
        // out instead of blocking forever.
        let _ = self.outbound_tx.send(frame);
    }

    /// Reserved passthrough around framing; the reference declares this
    /// call but never gives it a body.
    pub fn send(&self, _data: &[u8]) {}

    pub fn set_property(&self, key: impl Into<String>, value: Box<dyn Any + Send + Sync>) {
        self.state.write().unwrap().properties.insert(key.into(), value);
    }

    pub fn get_property<T: 'static + Clone>(&self, key: &str) -> Result<T, PropertyError> {
        self.state
            .read()
            .unwrap()
            .properties
            .get(key)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
            .ok_or_else(|| PropertyError::NotFound(key.to_string()))
    }

    pub fn remove_property(&self, key: &str) {
        self.state.write().unwrap().properties.remove(key);
    }

    pub fn update_activity(&self) {
        self.state.write().unwrap().last_activity = Instant::now();
    }

    pub fn last_activity(&self) -> Instant {
        self.state.read().unwrap().last_activity
    }

    fn read_loop(self: Arc<Self>) {
        let dp = DataPack::new(self.config.max_package_size);
        let mut socket = self.socket.try_clone().expect("socket clone for reader");

        loop {
            if self.is_closed() {
                return;
            }

            let mut header = [0u8; HEAD_LEN];
            if let Err(err) = socket.read_exact(&mut header) {
                debug!(conn_id = self.conn_id, %err, "reader: connection closed or errored");
                break;
            }

            let message = match dp.unpack(&header) {
                Ok(msg) => msg,
                Err(err) => {
                    warn!(conn_id = self.conn_id, %err, "reader: framing error, closing connection");
                    break;
                }
            };

            let mut payload = vec![0u8; message.data_len() as usize];
            if !payload.is_empty() {
                if let Err(err) = socket.read_exact(&mut payload) {
                    debug!(conn_id = self.conn_id, %err, "reader: short read on payload");
                    break;
                }
            }

            let mut message = message;
            message.set_data(payload);
            self.update_activity();

            self.dispatch(message);
        }

        self.stop();
    }

    fn dispatch(self: &Arc<Self>, message: Message) {
        let request = Request::new(Arc::clone(self), message);
        if self.msg_handler.worker_pool_size() > 0 {
            self.msg_handler.send_msg_to_task_queue(request);
        } else {
            let msg_handler = Arc::clone(&self.msg_handler);
            zinx_utils::spawn_named(format!("zinx-conn-{}-inline-handler", self.conn_id), move || {
                msg_handler.do_msg_handler(&request);
            });
        }
    }

    fn write_loop(self: Arc<Self>) {
        let mut socket = self.socket.try_clone().expect("socket clone for writer");
        // Owning the receiver here (rather than sharing it as a permanent
        // field) means dropping it on the way out actually closes the
        // channel: a `send_msg` blocked on a full queue errors out instead
        // of blocking forever against a receiver kept alive by the very
        // `Arc<Connection>` the blocked thread is holding.
        let outbound_rx = self
            .outbound_rx
            .lock()
            .unwrap()
            .take()
            .expect("write_loop invoked more than once per connection");

        loop {
            crossbeam_channel::select! {
                recv(outbound_rx) -> frame => {
                    match frame {
                        Ok(bytes) => {
                            if let Err(err) = socket.write_all(&bytes) {
                                debug!(conn_id = self.conn_id, %err, "writer: short write, closing");
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                }
                recv(self.writer_exit_rx) -> _ => break,
            }
        }
        drop(outbound_rx);
        self.stop();
    }

    fn heartbeat_loop(self: Arc<Self>) {
        let interval = Duration::from_secs(self.config.heartbeat_interval_secs.max(1));
        let timeout = Duration::from_secs(self.config.heartbeat_timeout_secs);

        loop {
            match self.heartbeat_exit_rx.recv_timeout(interval) {
                Ok(()) => return,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            }

            if self.is_closed() {
                return;
            }

            if self.last_activity().elapsed() > timeout {
                info!(conn_id = self.conn_id, "heartbeat: idle timeout exceeded, closing connection");
                self.stop();
                return;
            }
        }
    }
}
