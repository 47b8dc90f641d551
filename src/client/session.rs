//! Client representation
//!
//! `Client` models a connected client and holds the sending side of a
//! per-client channel used by the broker to push deliveries. `prefetch` and
//! `in_flight` implement the per-client window: the broker stops pushing once
//! `in_flight` reaches `prefetch` (0 means unlimited).

use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::transport::message::ServerMessage;

pub type ClientId = String;

#[derive(Debug)]
pub struct Client {
    pub id: ClientId,
    pub sender: UnboundedSender<ServerMessage>,
    pub prefetch: u16,
    pub in_flight: usize,
}

impl Client {
    /// Create a new client with a sender channel. The `id` is a UUID used
    /// to identify the client across broker operations.
    pub fn new(sender: UnboundedSender<ServerMessage>) -> Self {
        Self {
            id: format!("client-{}", Uuid::new_v4()),
            sender,
            prefetch: 0,
            in_flight: 0,
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.prefetch == 0 || self.in_flight < usize::from(self.prefetch)
    }
}
