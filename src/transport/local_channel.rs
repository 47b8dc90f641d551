//! In-process broker connection.
//!
//! Runs requests straight through `handle_client_message` against a shared
//! broker, with the same reply and delivery semantics as the WebSocket
//! transport. Used by tests and by single-process setups.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::debug;

use crate::broker::{Broker, Delivery, lock};
use crate::client::{Client, ClientId};
use crate::transport::channel::BrokerChannel;
use crate::transport::handler::handle_client_message;
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::ChannelError;

pub struct LocalChannel {
    broker: Arc<Mutex<Broker>>,
    client_id: Option<ClientId>,
    receiver: UnboundedReceiver<ServerMessage>,
}

impl LocalChannel {
    pub fn connect(broker: Arc<Mutex<Broker>>) -> Self {
        let (tx, receiver) = mpsc::unbounded_channel();
        let client = Client::new(tx);
        let client_id = client.id.clone();
        lock(&broker).register_client(client);
        Self {
            broker,
            client_id: Some(client_id),
            receiver,
        }
    }

    /// `None` once the channel is closed.
    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    fn disconnect(&mut self) {
        if let Some(client_id) = self.client_id.take() {
            lock(&self.broker).cleanup_client(&client_id);
        }
    }
}

#[async_trait]
impl BrokerChannel for LocalChannel {
    async fn request(&mut self, msg: ClientMessage) -> Result<ServerMessage, ChannelError> {
        let client_id = self.client_id.as_deref().ok_or(ChannelError::Closed)?;
        let mut broker = lock(&self.broker);
        Ok(handle_client_message(&mut broker, client_id, msg))
    }

    async fn next_delivery(&mut self) -> Result<Delivery, ChannelError> {
        if self.client_id.is_none() {
            return Err(ChannelError::Closed);
        }
        loop {
            match self.receiver.recv().await {
                Some(ServerMessage::Delivery(delivery)) => return Ok(delivery),
                Some(other) => debug!(frame = other.kind(), "ignoring pushed frame"),
                None => return Err(ChannelError::Closed),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ChannelError> {
        self.disconnect();
        Ok(())
    }
}

impl Drop for LocalChannel {
    fn drop(&mut self) {
        self.disconnect();
    }
}
