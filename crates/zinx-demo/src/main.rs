//! Minimal echo server demonstrating `zinx-network`: one router that
//! echoes payloads back verbatim, the built-in heartbeat reply, and a
//! pair of connection-lifecycle log hooks.

use std::sync::Arc;

use clap::Parser;
use tracing::info;
use zinx_network::{Config, PingRouter, Request, Router, Server, MSG_ID_PING};

const MSG_ID_ECHO: u32 = 1;

#[derive(Parser)]
#[command(about = "Example zinx-network echo server")]
struct Args {
    /// Path to a JSON config overlay. Defaults to `conf/zinx.json` relative
    /// to the working directory when omitted; falls back to built-in
    /// defaults if that conventional path doesn't exist either.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Override the configured bind host.
    #[arg(long)]
    host: Option<String>,

    /// Override the configured bind port.
    #[arg(long)]
    port: Option<u16>,

    /// Override the configured worker pool size.
    #[arg(long = "worker-pool-size")]
    worker_pool_size: Option<u32>,
}

struct EchoRouter;

impl Router for EchoRouter {
    fn handle(&self, req: &Request) {
        let data = req.message().data().to_vec();
        req.connection().send_msg(MSG_ID_ECHO, &data);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut config = match args.config {
        Some(path) => Config::load_from(path)?,
        None => {
            let default_path = zinx_network::config::default_config_path();
            if default_path.exists() {
                Config::load_from(&default_path)?
            } else {
                Config::default()
            }
        }
    };

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.tcp_port = port;
    }
    if let Some(worker_pool_size) = args.worker_pool_size {
        config.worker_pool_size = worker_pool_size;
    }

    let mut server = Server::new(config.name.clone(), config);
    server.add_router(MSG_ID_ECHO, Arc::new(EchoRouter))?;
    server.add_router(MSG_ID_PING, Arc::new(PingRouter))?;

    server.set_on_conn_start(Arc::new(|conn| {
        info!(conn_id = conn.conn_id(), "client connected");
    }));
    server.set_on_conn_stop(Arc::new(|conn| {
        info!(conn_id = conn.conn_id(), "client disconnected");
    }));

    server.serve()?;
    Ok(())
}
