use std::sync::Arc;

use crate::connection::Connection;
use crate::message::Message;

/// Binds an inbound [`Message`] to the [`Connection`] it arrived on.
///
/// Handed to a [`crate::router::Router`] by [`crate::worker_pool::MsgHandler::do_msg_handler`];
/// routers read `message()` and reply through `connection()`.
pub struct Request {
    conn: Arc<Connection>,
    message: Message,
}

impl Request {
    pub fn new(conn: Arc<Connection>, message: Message) -> Self {
        Self { conn, message }
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.conn
    }

    pub fn message(&self) -> &Message {
        &self.message
    }
}
