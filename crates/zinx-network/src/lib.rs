//! TCP server framework core: message framing, connection lifecycle, a
//! bounded worker-pool dispatcher, and the process-wide connection
//! registry.
//!
//! Configuration loading, logging setup and application routers are
//! supplied by the embedding binary; see `zinx-demo` for a worked example.

pub mod conn_manager;
pub mod config;
pub mod connection;
pub mod datapack;
pub mod error;
pub mod heartbeat;
pub mod message;
pub mod request;
pub mod router;
pub mod server;
pub mod worker_pool;

pub use conn_manager::ConnManager;
pub use config::Config;
pub use connection::{ConnHook, Connection};
pub use datapack::DataPack;
pub use error::{ConfigError, FramingError, PropertyError, RouterError};
pub use heartbeat::{PingRouter, MSG_ID_PING, MSG_ID_PONG};
pub use message::Message;
pub use request::Request;
pub use router::Router;
pub use server::Server;
pub use worker_pool::MsgHandler;
