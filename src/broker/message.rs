//! Message definitions for the broker
//!
//! `QueuedMessage` is what a queue holds and what the persistence layer
//! writes; `Delivery` is what a consumer receives. Notes on fields:
//! - `seq`: store-wide sequence number; also the on-disk key
//! - `message_id`: opaque unique id assigned by the broker on publish
//! - `published_at`: milliseconds since UNIX epoch, set by the broker
//! - `redelivered`: set once a message returns to its queue unacknowledged
//! - `delivery_tag`: broker-unique per delivery; the handle for ack/nack

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub seq: u64,
    pub message_id: String,
    pub body: Vec<u8>,
    pub published_at: i64,
    #[serde(default)]
    pub redelivered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub queue: String,
    pub delivery_tag: u64,
    pub message_id: String,
    pub redelivered: bool,
    pub content_type: String,
    pub published_at: i64,
    pub body: Vec<u8>,
}
