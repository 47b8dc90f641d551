//! Queue management
//!
//! A `Queue` holds ready messages in FIFO order, the number of its messages
//! currently delivered but not acknowledged, and its registered consumers.
//! Callers must synchronize access (the broker lock does this).

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::broker::message::QueuedMessage;
use crate::client::ClientId;

/// Declaration options. A queue keeps the options it was first declared with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueOptions {
    pub durable: bool,
    pub content_type: String,
}

impl QueueOptions {
    pub fn durable(content_type: impl Into<String>) -> Self {
        Self {
            durable: true,
            content_type: content_type.into(),
        }
    }

    pub fn transient(content_type: impl Into<String>) -> Self {
        Self {
            durable: false,
            content_type: content_type.into(),
        }
    }
}

impl fmt::Display for QueueOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "durable={} content_type={}",
            self.durable, self.content_type
        )
    }
}

/// Snapshot of a queue as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueInfo {
    pub name: String,
    pub durable: bool,
    pub content_type: String,
    /// Ready plus delivered-but-unacknowledged messages.
    pub message_count: usize,
    pub consumer_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumer {
    pub tag: String,
    pub client_id: ClientId,
}

#[derive(Debug)]
pub struct Queue {
    pub name: String,
    pub options: QueueOptions,
    pub ready: VecDeque<QueuedMessage>,
    pub unacked: usize,
    pub consumers: Vec<Consumer>,
    next_consumer: usize,
}

impl Queue {
    pub fn new(name: &str, options: QueueOptions) -> Self {
        Self::restore(name, options, VecDeque::new())
    }

    pub fn restore(name: &str, options: QueueOptions, ready: VecDeque<QueuedMessage>) -> Self {
        Self {
            name: name.to_string(),
            options,
            ready,
            unacked: 0,
            consumers: Vec::new(),
            next_consumer: 0,
        }
    }

    pub fn info(&self) -> QueueInfo {
        QueueInfo {
            name: self.name.clone(),
            durable: self.options.durable,
            content_type: self.options.content_type.clone(),
            message_count: self.ready.len() + self.unacked,
            consumer_count: self.consumers.len(),
        }
    }

    pub fn add_consumer(&mut self, consumer: Consumer) {
        self.consumers.push(consumer);
    }

    /// Drop every consumer owned by `client_id`.
    pub fn remove_client(&mut self, client_id: &str) {
        self.consumers.retain(|c| c.client_id != client_id);
        if self.next_consumer >= self.consumers.len() {
            self.next_consumer = 0;
        }
    }

    /// Round-robin pick of the next consumer accepted by `eligible`, starting
    /// after the one served last. Returns the consumer's client id.
    pub fn next_consumer(&mut self, eligible: impl Fn(&Consumer) -> bool) -> Option<ClientId> {
        let count = self.consumers.len();
        let slot = (0..count)
            .map(|offset| (self.next_consumer + offset) % count)
            .find(|&i| eligible(&self.consumers[i]))?;
        self.next_consumer = (slot + 1) % count;
        Some(self.consumers[slot].client_id.clone())
    }
}
