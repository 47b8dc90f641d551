//! Client side of a broker connection.
//!
//! `BrokerChannel` is the seam the producer and consumer are written
//! against. Implementations only move frames; the typed operations are
//! provided on top of `request`.

use async_trait::async_trait;

use crate::broker::{Delivery, QueueInfo, QueueOptions};
use crate::transport::message::{ClientMessage, ServerMessage};
use crate::utils::error::ChannelError;

#[async_trait]
pub trait BrokerChannel: Send {
    /// Send one request and wait for its reply. Deliveries that arrive in
    /// the meantime are kept for `next_delivery`, in order.
    async fn request(&mut self, msg: ClientMessage) -> Result<ServerMessage, ChannelError>;

    /// Wait for the next pushed delivery. Cancel safe.
    async fn next_delivery(&mut self) -> Result<Delivery, ChannelError>;

    /// Release the connection. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), ChannelError>;

    async fn declare_queue(
        &mut self,
        queue: &str,
        options: QueueOptions,
    ) -> Result<QueueInfo, ChannelError> {
        let msg = ClientMessage::DeclareQueue {
            queue: queue.to_string(),
            options,
        };
        match self.request(msg).await? {
            ServerMessage::QueueDeclared { queue } => Ok(queue),
            other => Err(unexpected(other)),
        }
    }

    async fn delete_queue(&mut self, queue: &str) -> Result<usize, ChannelError> {
        let msg = ClientMessage::DeleteQueue {
            queue: queue.to_string(),
        };
        match self.request(msg).await? {
            ServerMessage::QueueDeleted { message_count, .. } => Ok(message_count),
            other => Err(unexpected(other)),
        }
    }

    async fn purge_queue(&mut self, queue: &str) -> Result<usize, ChannelError> {
        let msg = ClientMessage::PurgeQueue {
            queue: queue.to_string(),
        };
        match self.request(msg).await? {
            ServerMessage::QueuePurged { message_count, .. } => Ok(message_count),
            other => Err(unexpected(other)),
        }
    }

    async fn list_queues(&mut self) -> Result<Vec<QueueInfo>, ChannelError> {
        match self.request(ClientMessage::ListQueues).await? {
            ServerMessage::Queues { queues } => Ok(queues),
            other => Err(unexpected(other)),
        }
    }

    /// Returns the broker-assigned message id.
    async fn publish(&mut self, queue: &str, body: Vec<u8>) -> Result<String, ChannelError> {
        let msg = ClientMessage::Publish {
            queue: queue.to_string(),
            body,
        };
        match self.request(msg).await? {
            ServerMessage::Published { message_id } => Ok(message_id),
            other => Err(unexpected(other)),
        }
    }

    async fn qos(&mut self, prefetch: u16) -> Result<(), ChannelError> {
        match self.request(ClientMessage::Qos { prefetch }).await? {
            ServerMessage::QosOk { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Returns the consumer tag.
    async fn consume(&mut self, queue: &str) -> Result<String, ChannelError> {
        let msg = ClientMessage::Consume {
            queue: queue.to_string(),
        };
        match self.request(msg).await? {
            ServerMessage::ConsumeOk { consumer_tag } => Ok(consumer_tag),
            other => Err(unexpected(other)),
        }
    }

    async fn ack(&mut self, delivery_tag: u64) -> Result<(), ChannelError> {
        match self.request(ClientMessage::Ack { delivery_tag }).await? {
            ServerMessage::Acked { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn nack(&mut self, delivery_tag: u64, requeue: bool) -> Result<(), ChannelError> {
        let msg = ClientMessage::Nack {
            delivery_tag,
            requeue,
        };
        match self.request(msg).await? {
            ServerMessage::Nacked { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(reply: ServerMessage) -> ChannelError {
    match reply {
        ServerMessage::Error { message } => ChannelError::Broker(message),
        other => ChannelError::UnexpectedReply(other.kind().to_string()),
    }
}
