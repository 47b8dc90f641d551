//! Broker engine
//!
//! This module contains the queue broker responsible for:
//! - declaring, purging and deleting named queues
//! - appending published messages to a queue in FIFO order
//! - pushing ready messages to consumers, round-robin, within each client's
//!   prefetch window
//! - tracking delivered-but-unacknowledged messages until they are acked,
//!   requeued or dead-lettered
//! - persisting durable queues through `QueueStore` so they survive restarts
//!
//! Concurrency and usage notes:
//! - The public API here is synchronous and designed to be held behind a
//!   lock (`Arc<Mutex<Broker>>`) by the transport layer. Pushes to clients go
//!   through unbounded channels, so no network I/O happens under the lock.
//! - A message is stored before it becomes visible to consumers and removed
//!   from storage only when it is acknowledged or dead-lettered.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::broker::message::{Delivery, QueuedMessage};
use crate::broker::queue::{Consumer, Queue, QueueInfo, QueueOptions};
use crate::client::{Client, ClientId};
use crate::persistence::QueueStore;
use crate::transport::message::ServerMessage;
use crate::utils::error::BrokerError;

/// Suffix of the queue that receives messages rejected without requeue.
pub const DEAD_LETTER_SUFFIX: &str = ".dead-letter";

pub fn dead_letter_queue(queue: &str) -> String {
    format!("{queue}{DEAD_LETTER_SUFFIX}")
}

/// Lock a shared broker. A panic while holding the lock leaves the queues
/// in a usable state, so poisoning is ignored.
pub fn lock(broker: &Mutex<Broker>) -> MutexGuard<'_, Broker> {
    broker.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct Unacked {
    queue: String,
    client_id: ClientId,
    message: QueuedMessage,
}

#[derive(Debug)]
pub struct Broker {
    pub queues: HashMap<String, Queue>,
    pub clients: HashMap<ClientId, Client>,
    unacked: HashMap<u64, Unacked>,
    next_delivery_tag: u64,
    store: QueueStore,
}

impl Broker {
    /// Build a broker over `store`, restoring every durable queue found in it
    /// with its unacknowledged messages in publish order.
    pub fn with_store(store: QueueStore) -> Result<Self, BrokerError> {
        let mut queues = HashMap::new();
        for stored in store.load_queues()? {
            info!(
                queue = %stored.name,
                messages = stored.messages.len(),
                "restored durable queue"
            );
            let queue = Queue::restore(&stored.name, stored.options, stored.messages);
            queues.insert(stored.name, queue);
        }

        Ok(Self {
            queues,
            clients: HashMap::new(),
            unacked: HashMap::new(),
            next_delivery_tag: 1,
            store,
        })
    }

    /// A broker whose storage vanishes with it.
    pub fn temporary() -> Result<Self, BrokerError> {
        Self::with_store(QueueStore::temporary()?)
    }

    pub fn flush(&self) -> Result<(), BrokerError> {
        self.store.flush()
    }

    pub fn register_client(&mut self, client: Client) {
        debug!(client = %client.id, "client registered");
        self.clients.insert(client.id.clone(), client);
    }

    /// Create `name` if absent. Redeclaring with identical options is a no-op
    /// that leaves existing messages untouched.
    pub fn declare_queue(
        &mut self,
        name: &str,
        options: QueueOptions,
    ) -> Result<QueueInfo, BrokerError> {
        if let Some(existing) = self.queues.get(name) {
            if existing.options != options {
                return Err(BrokerError::PreconditionFailed {
                    queue: name.to_string(),
                    reason: format!("declared with {}, requested {}", existing.options, options),
                });
            }
            return Ok(existing.info());
        }

        if options.durable {
            self.store.save_queue(name, &options)?;
        }
        let queue = Queue::new(name, options);
        let info = queue.info();
        self.queues.insert(name.to_string(), queue);
        info!(queue = %name, durable = info.durable, "queue declared");
        Ok(info)
    }

    /// Remove a queue with all its messages, including those in flight.
    /// Returns how many messages were discarded.
    pub fn delete_queue(&mut self, name: &str) -> Result<usize, BrokerError> {
        let queue = self
            .queues
            .remove(name)
            .ok_or_else(|| BrokerError::QueueNotFound(name.to_string()))?;

        let in_flight: Vec<u64> = self
            .unacked
            .iter()
            .filter(|(_, entry)| entry.queue == name)
            .map(|(tag, _)| *tag)
            .collect();
        for tag in in_flight {
            if let Some(entry) = self.unacked.remove(&tag) {
                if let Some(client) = self.clients.get_mut(&entry.client_id) {
                    client.in_flight = client.in_flight.saturating_sub(1);
                }
            }
        }

        if queue.options.durable {
            self.store.remove_queue(name)?;
        }
        let discarded = queue.ready.len() + queue.unacked;
        info!(queue = %name, discarded, "queue deleted");
        self.dispatch_all();
        Ok(discarded)
    }

    /// Drop the ready messages of a queue. Deliveries in flight are kept.
    pub fn purge_queue(&mut self, name: &str) -> Result<usize, BrokerError> {
        let queue = self
            .queues
            .get_mut(name)
            .ok_or_else(|| BrokerError::QueueNotFound(name.to_string()))?;
        let durable = queue.options.durable;
        let purged: Vec<QueuedMessage> = queue.ready.drain(..).collect();

        if durable {
            for message in &purged {
                self.store.remove(name, message.seq)?;
            }
        }
        info!(queue = %name, purged = purged.len(), "queue purged");
        Ok(purged.len())
    }

    pub fn queue_info(&self, name: &str) -> Result<QueueInfo, BrokerError> {
        self.queues
            .get(name)
            .map(Queue::info)
            .ok_or_else(|| BrokerError::QueueNotFound(name.to_string()))
    }

    pub fn list_queues(&self) -> Vec<QueueInfo> {
        let mut queues: Vec<QueueInfo> = self.queues.values().map(Queue::info).collect();
        queues.sort_by(|a, b| a.name.cmp(&b.name));
        queues
    }

    /// Append `body` to `queue` and return the broker-assigned message id.
    pub fn publish(&mut self, queue: &str, body: Vec<u8>) -> Result<String, BrokerError> {
        let durable = self
            .queues
            .get(queue)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?
            .options
            .durable;

        let message = QueuedMessage {
            seq: self.store.next_seq()?,
            message_id: Uuid::new_v4().to_string(),
            body,
            published_at: chrono::Utc::now().timestamp_millis(),
            redelivered: false,
        };
        if durable {
            self.store.append(queue, &message)?;
        }

        let message_id = message.message_id.clone();
        if let Some(q) = self.queues.get_mut(queue) {
            q.ready.push_back(message);
        }
        debug!(queue = %queue, message_id = %message_id, "message published");
        self.dispatch(queue);
        Ok(message_id)
    }

    /// Limit how many deliveries `client_id` may hold unacknowledged.
    /// Zero lifts the limit.
    pub fn set_prefetch(&mut self, client_id: &str, prefetch: u16) -> Result<(), BrokerError> {
        let client = self
            .clients
            .get_mut(client_id)
            .ok_or_else(|| BrokerError::UnknownClient(client_id.to_string()))?;
        client.prefetch = prefetch;
        self.dispatch_all();
        Ok(())
    }

    /// Register `client_id` as a consumer of `queue`; returns the consumer tag.
    pub fn consume(&mut self, queue: &str, client_id: &str) -> Result<String, BrokerError> {
        if !self.clients.contains_key(client_id) {
            return Err(BrokerError::UnknownClient(client_id.to_string()));
        }
        let q = self
            .queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;

        let tag = format!("ctag-{}", Uuid::new_v4());
        q.add_consumer(Consumer {
            tag: tag.clone(),
            client_id: client_id.to_string(),
        });
        info!(queue = %queue, client = %client_id, consumer_tag = %tag, "consumer registered");
        self.dispatch(queue);
        Ok(tag)
    }

    /// Settle a delivery positively: the message is gone for good.
    pub fn ack(&mut self, client_id: &str, delivery_tag: u64) -> Result<(), BrokerError> {
        let entry = self.take_unacked(client_id, delivery_tag)?;
        if self.is_durable(&entry.queue) {
            self.store.remove(&entry.queue, entry.message.seq)?;
        }
        debug!(queue = %entry.queue, delivery_tag, "delivery acknowledged");
        self.dispatch_all();
        Ok(())
    }

    /// Settle a delivery negatively. With `requeue` the message returns to
    /// the head of its queue; otherwise it moves to the dead-letter queue.
    pub fn nack(
        &mut self,
        client_id: &str,
        delivery_tag: u64,
        requeue: bool,
    ) -> Result<(), BrokerError> {
        let entry = self.take_unacked(client_id, delivery_tag)?;
        let result = if requeue {
            self.requeue(entry)
        } else {
            self.dead_letter(entry)
        };
        self.dispatch_all();
        result
    }

    /// Forget a disconnected client. Its unacknowledged deliveries go back
    /// to the head of their queues in their original order.
    pub fn cleanup_client(&mut self, client_id: &str) {
        self.clients.remove(client_id);

        let mut tags: Vec<u64> = self
            .unacked
            .iter()
            .filter(|(_, entry)| entry.client_id == client_id)
            .map(|(tag, _)| *tag)
            .collect();
        // Pushing to the front in descending order restores delivery order.
        tags.sort_unstable_by(|a, b| b.cmp(a));

        let requeued = tags.len();
        for tag in tags {
            let Some(entry) = self.unacked.remove(&tag) else {
                continue;
            };
            self.release(&entry);
            if let Err(e) = self.requeue(entry) {
                warn!(client = %client_id, error = %e, "failed to persist requeued message");
            }
        }

        for queue in self.queues.values_mut() {
            queue.remove_client(client_id);
        }

        info!(client = %client_id, requeued, "client cleaned up");
        self.dispatch_all();
    }

    fn is_durable(&self, queue: &str) -> bool {
        self.queues.get(queue).is_some_and(|q| q.options.durable)
    }

    fn take_unacked(&mut self, client_id: &str, delivery_tag: u64) -> Result<Unacked, BrokerError> {
        let owned = self
            .unacked
            .get(&delivery_tag)
            .is_some_and(|entry| entry.client_id == client_id);
        if !owned {
            return Err(BrokerError::UnknownDeliveryTag(delivery_tag));
        }
        let entry = self
            .unacked
            .remove(&delivery_tag)
            .ok_or(BrokerError::UnknownDeliveryTag(delivery_tag))?;
        self.release(&entry);
        Ok(entry)
    }

    fn release(&mut self, entry: &Unacked) {
        if let Some(queue) = self.queues.get_mut(&entry.queue) {
            queue.unacked = queue.unacked.saturating_sub(1);
        }
        if let Some(client) = self.clients.get_mut(&entry.client_id) {
            client.in_flight = client.in_flight.saturating_sub(1);
        }
    }

    fn requeue(&mut self, entry: Unacked) -> Result<(), BrokerError> {
        let mut message = entry.message;
        message.redelivered = true;
        let Some(queue) = self.queues.get_mut(&entry.queue) else {
            return Ok(());
        };
        let durable = queue.options.durable;
        queue.ready.push_front(message.clone());
        debug!(queue = %entry.queue, message_id = %message.message_id, "message requeued");
        if durable {
            // Same key: overwrites the stored copy with the redelivered flag set.
            self.store.append(&entry.queue, &message)?;
        }
        Ok(())
    }

    /// Move a rejected message to `<queue>.dead-letter`. An existing
    /// dead-letter queue is used as declared. On any failure the message goes
    /// back to the head of its source queue, so it is never lost.
    fn dead_letter(&mut self, entry: Unacked) -> Result<(), BrokerError> {
        if !self.queues.contains_key(&entry.queue) {
            return Ok(());
        }
        let target = dead_letter_queue(&entry.queue);
        let message = match self.persist_dead_letter(&entry, &target) {
            Ok(message) => message,
            Err(e) => {
                if let Err(requeue) = self.requeue(entry) {
                    warn!(error = %requeue, "failed to persist requeued message");
                }
                return Err(e);
            }
        };

        warn!(
            queue = %entry.queue,
            dead_letter = %target,
            message_id = %message.message_id,
            "message dead-lettered"
        );
        if let Some(q) = self.queues.get_mut(&target) {
            q.ready.push_back(message);
        }
        Ok(())
    }

    fn persist_dead_letter(
        &mut self,
        entry: &Unacked,
        target: &str,
    ) -> Result<QueuedMessage, BrokerError> {
        if !self.queues.contains_key(target) {
            let content_type = self
                .queues
                .get(&entry.queue)
                .map(|q| q.options.content_type.clone())
                .unwrap_or_default();
            self.declare_queue(target, QueueOptions::durable(content_type))?;
        }

        let message = QueuedMessage {
            seq: self.store.next_seq()?,
            redelivered: false,
            ..entry.message.clone()
        };
        let target_durable = self.is_durable(target);
        if target_durable {
            self.store.append(target, &message)?;
        }
        if self.is_durable(&entry.queue) {
            if let Err(e) = self.store.remove(&entry.queue, entry.message.seq) {
                if target_durable {
                    let _ = self.store.remove(target, message.seq);
                }
                return Err(e);
            }
        }
        Ok(message)
    }

    fn dispatch_all(&mut self) {
        let names: Vec<String> = self.queues.keys().cloned().collect();
        for name in names {
            self.dispatch(&name);
        }
    }

    /// Push ready messages of `queue_name` to consumers with spare capacity.
    fn dispatch(&mut self, queue_name: &str) {
        loop {
            let Some(queue) = self.queues.get_mut(queue_name) else {
                return;
            };
            if queue.ready.is_empty() {
                return;
            }
            let clients = &self.clients;
            let Some(client_id) = queue.next_consumer(|consumer| {
                clients
                    .get(&consumer.client_id)
                    .is_some_and(Client::has_capacity)
            }) else {
                return;
            };
            let Some(message) = queue.ready.pop_front() else {
                return;
            };
            queue.unacked += 1;
            let content_type = queue.options.content_type.clone();

            let delivery_tag = self.next_delivery_tag;
            self.next_delivery_tag += 1;

            let delivery = Delivery {
                queue: queue_name.to_string(),
                delivery_tag,
                message_id: message.message_id.clone(),
                redelivered: message.redelivered,
                content_type,
                published_at: message.published_at,
                body: message.body.clone(),
            };

            if let Some(client) = self.clients.get_mut(&client_id) {
                client.in_flight += 1;
                if let Err(e) = client.sender.send(ServerMessage::Delivery(delivery)) {
                    // Stays unacked; cleanup_client will requeue it.
                    warn!(client = %client_id, error = %e, "failed to push delivery");
                }
            }
            self.unacked.insert(
                delivery_tag,
                Unacked {
                    queue: queue_name.to_string(),
                    client_id,
                    message,
                },
            );
        }
    }
}
