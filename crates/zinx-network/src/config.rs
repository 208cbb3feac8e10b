//! Process-wide configuration: built-in defaults overlaid by an optional
//! JSON document.
//!
//! Mirrors the reference `GlobalObj`/`Reload()` pair: a `Config::default()`
//! seeds every field, and [`Config::load`] overlays whatever the JSON file
//! at `conf/zinx.json` mentions. The file itself is mandatory once
//! `Config::load` is called — a missing or unreadable file is a fatal
//! startup error, per spec §7/§10.3 — but every individual *field* inside
//! it is optional, so a config that only tunes `WorkerPoolSize` doesn't
//! have to repeat every other default.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Conventional path the reference implementation reads at startup.
pub const DEFAULT_CONFIG_PATH: &str = "conf/zinx.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub tcp_port: u16,
    pub name: String,
    pub version: String,
    pub max_conn: usize,
    pub max_package_size: u32,
    pub worker_pool_size: u32,
    pub max_task_len: usize,
    pub heartbeat_interval_secs: u64,
    pub heartbeat_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            tcp_port: 8999,
            name: "ZinxServerApp".to_string(),
            version: "V0.10".to_string(),
            max_conn: 1000,
            max_package_size: 4096,
            worker_pool_size: 10,
            max_task_len: 1024,
            heartbeat_interval_secs: 10,
            heartbeat_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Loads `conf/zinx.json` (relative to the process working directory)
    /// and overlays it on [`Config::default`]. See [`Config::load_from`]
    /// for a variant that takes an explicit path, used by tests.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound { path: path.to_path_buf() });
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let overlay: ConfigOverlay = serde_json::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;

        let mut config = Self::default();
        overlay.apply_to(&mut config);
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.tcp_port)
    }
}

/// Every field optional: present-but-absent keys keep the built-in default,
/// present-and-unrecognized JSON keys are ignored by `serde_json` already.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ConfigOverlay {
    host: Option<String>,
    tcp_port: Option<u16>,
    name: Option<String>,
    version: Option<String>,
    max_conn: Option<usize>,
    max_package_size: Option<u32>,
    worker_pool_size: Option<u32>,
    max_task_len: Option<usize>,
    heartbeat_interval: Option<u64>,
    heartbeat_timeout: Option<u64>,
}

impl ConfigOverlay {
    fn apply_to(self, config: &mut Config) {
        if let Some(v) = self.host {
            config.host = v;
        }
        if let Some(v) = self.tcp_port {
            config.tcp_port = v;
        }
        if let Some(v) = self.name {
            config.name = v;
        }
        if let Some(v) = self.version {
            config.version = v;
        }
        if let Some(v) = self.max_conn {
            config.max_conn = v;
        }
        if let Some(v) = self.max_package_size {
            config.max_package_size = v;
        }
        if let Some(v) = self.worker_pool_size {
            config.worker_pool_size = v;
        }
        if let Some(v) = self.max_task_len {
            config.max_task_len = v;
        }
        if let Some(v) = self.heartbeat_interval {
            config.heartbeat_interval_secs = v;
        }
        if let Some(v) = self.heartbeat_timeout {
            config.heartbeat_timeout_secs = v;
        }
    }
}

/// Resolves the conventional config path without constructing a `Config`,
/// so a caller (the demo binary's `--config`-less default) can check
/// whether it exists before deciding whether to call [`Config::load`].
pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}
