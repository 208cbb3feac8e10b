use std::io;

use thiserror::Error;

/// Errors surfaced while framing a byte stream into [`crate::message::Message`]s.
///
/// These always terminate the owning connection; see `Connection::Stop` call
/// sites in [`crate::connection`].
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("data_len {data_len} exceeds MaxPackageSize {max}")]
    MessageTooLarge { data_len: u32, max: u32 },

    #[error("peer closed the connection mid-frame")]
    UnexpectedEof,

    #[error("socket error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while wiring up routers on a [`crate::worker_pool::MsgHandler`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("msg_id {0} already has a router bound; AddRouter must be called at most once per id")]
    DuplicateRoute(u32),
}

/// Errors raised by the per-connection property bag.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertyError {
    #[error("no property found for key {0:?}")]
    NotFound(String),
}

/// Errors raised while loading [`crate::config::Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path:?} does not exist")]
    NotFound { path: std::path::PathBuf },

    #[error("failed to read config file {path:?}: {source}")]
    Read { path: std::path::PathBuf, source: io::Error },

    #[error("failed to parse config file {path:?}: {source}")]
    Parse { path: std::path::PathBuf, source: serde_json::Error },
}
