//! Wire protocol
//!
//! Frames are JSON text, internally tagged by `type`. Every `ClientMessage`
//! is answered by exactly one non-delivery `ServerMessage`; `delivery`
//! frames are pushed whenever the broker dispatches and may arrive between a
//! request and its reply.

use serde::{Deserialize, Serialize};

use crate::broker::{Delivery, QueueInfo, QueueOptions};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "declare_queue")]
    DeclareQueue { queue: String, options: QueueOptions },
    #[serde(rename = "delete_queue")]
    DeleteQueue { queue: String },
    #[serde(rename = "purge_queue")]
    PurgeQueue { queue: String },
    #[serde(rename = "list_queues")]
    ListQueues,
    #[serde(rename = "publish")]
    Publish { queue: String, body: Vec<u8> },
    #[serde(rename = "qos")]
    Qos { prefetch: u16 },
    #[serde(rename = "consume")]
    Consume { queue: String },
    #[serde(rename = "ack")]
    Ack { delivery_tag: u64 },
    #[serde(rename = "nack")]
    Nack { delivery_tag: u64, requeue: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "queue_declared")]
    QueueDeclared { queue: QueueInfo },
    #[serde(rename = "queue_deleted")]
    QueueDeleted { queue: String, message_count: usize },
    #[serde(rename = "queue_purged")]
    QueuePurged { queue: String, message_count: usize },
    #[serde(rename = "queues")]
    Queues { queues: Vec<QueueInfo> },
    #[serde(rename = "published")]
    Published { message_id: String },
    #[serde(rename = "qos_ok")]
    QosOk { prefetch: u16 },
    #[serde(rename = "consume_ok")]
    ConsumeOk { consumer_tag: String },
    #[serde(rename = "acked")]
    Acked { delivery_tag: u64 },
    #[serde(rename = "nacked")]
    Nacked { delivery_tag: u64 },
    #[serde(rename = "delivery")]
    Delivery(Delivery),
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    /// Short name of the frame, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::QueueDeclared { .. } => "queue_declared",
            ServerMessage::QueueDeleted { .. } => "queue_deleted",
            ServerMessage::QueuePurged { .. } => "queue_purged",
            ServerMessage::Queues { .. } => "queues",
            ServerMessage::Published { .. } => "published",
            ServerMessage::QosOk { .. } => "qos_ok",
            ServerMessage::ConsumeOk { .. } => "consume_ok",
            ServerMessage::Acked { .. } => "acked",
            ServerMessage::Nacked { .. } => "nacked",
            ServerMessage::Delivery(_) => "delivery",
            ServerMessage::Error { .. } => "error",
        }
    }
}
