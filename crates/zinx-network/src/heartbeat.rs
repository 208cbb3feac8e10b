//! Reserved heartbeat message ids and the default `PING` router.

use crate::request::Request;
use crate::router::Router;

pub const MSG_ID_PING: u32 = 100;
pub const MSG_ID_PONG: u32 = 101;

/// Replies to `PING` with a `PONG` frame carrying `"pong"`.
///
/// Registering this is optional — applications that want a custom
/// heartbeat reply can bind their own router to [`MSG_ID_PING`] instead.
pub struct PingRouter;

impl Router for PingRouter {
    fn handle(&self, req: &Request) {
        req.connection().send_msg(MSG_ID_PONG, b"pong");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conn_manager::ConnManager;
    use crate::config::Config;
    use crate::connection::Connection;
    use crate::message::Message;
    use crate::worker_pool::MsgHandler;
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;

    #[test]
    fn ping_router_replies_with_pong_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut client = TcpStream::connect(addr).unwrap();
        let (server_side, _) = listener.accept().unwrap();

        let config = Arc::new(Config::default());
        let msg_handler = Arc::new(MsgHandler::new(config.worker_pool_size, config.max_task_len));
        let conn_manager = ConnManager::new();
        let conn = Connection::new(1, server_side, config, msg_handler, conn_manager, None, None);
        conn.start();

        let request = Request::new(Arc::clone(&conn), Message::new(MSG_ID_PING, Vec::new()));
        PingRouter.handle(&request);

        use std::io::Read;
        let mut header = [0u8; 8];
        client.read_exact(&mut header).unwrap();
        let data_len = u32::from_le_bytes(header[0..4].try_into().unwrap());
        let msg_id = u32::from_le_bytes(header[4..8].try_into().unwrap());
        let mut payload = vec![0u8; data_len as usize];
        client.read_exact(&mut payload).unwrap();

        assert_eq!(msg_id, MSG_ID_PONG);
        assert_eq!(payload, b"pong");

        conn.stop();
    }
}
