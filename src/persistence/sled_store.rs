//! Persistence layer backed by `sled`
//!
//! Message keys are the big-endian bytes of a sequence number drawn from
//! `Db::generate_id`, which is monotonic across restarts, so iterating a
//! queue tree yields messages in publish order.

use std::collections::VecDeque;
use std::path::Path;
#[cfg(test)]
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use sled::{Db, Tree};
use tracing::debug;

use crate::broker::{QueueOptions, QueuedMessage};
use crate::utils::error::BrokerError;

const QUEUES_TREE: &str = "__queues";

fn message_tree_name(queue: &str) -> String {
    format!("queue:{queue}")
}

/// A durable queue as found on disk.
#[derive(Debug, Clone)]
pub struct StoredQueue {
    pub name: String,
    pub options: QueueOptions,
    pub messages: VecDeque<QueuedMessage>,
}

#[derive(Clone)]
pub struct QueueStore {
    db: Db,
    // Shared by clones, so a test can break a store it handed to a broker.
    #[cfg(test)]
    fail_appends: Arc<AtomicBool>,
}

impl QueueStore {
    /// Open or create a sled database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BrokerError> {
        Ok(Self::from_db(sled::open(path)?))
    }

    /// An in-memory store that is discarded on drop.
    pub fn temporary() -> Result<Self, BrokerError> {
        Ok(Self::from_db(sled::Config::new().temporary(true).open()?))
    }

    fn from_db(db: Db) -> Self {
        Self {
            db,
            #[cfg(test)]
            fail_appends: Arc::default(),
        }
    }

    /// Make every following `append` fail with a storage error.
    #[cfg(test)]
    pub(crate) fn fail_appends(&self, on: bool) {
        self.fail_appends.store(on, Ordering::SeqCst);
    }

    pub fn next_seq(&self) -> Result<u64, BrokerError> {
        Ok(self.db.generate_id()?)
    }

    fn messages(&self, queue: &str) -> Result<Tree, BrokerError> {
        Ok(self.db.open_tree(message_tree_name(queue))?)
    }

    pub fn save_queue(&self, name: &str, options: &QueueOptions) -> Result<(), BrokerError> {
        let meta = self.db.open_tree(QUEUES_TREE)?;
        meta.insert(name.as_bytes(), serde_json::to_vec(options)?)?;
        self.db.flush()?;
        Ok(())
    }

    /// Forget a queue and every message stored for it.
    pub fn remove_queue(&self, name: &str) -> Result<(), BrokerError> {
        let meta = self.db.open_tree(QUEUES_TREE)?;
        meta.remove(name.as_bytes())?;
        self.db.drop_tree(message_tree_name(name))?;
        self.db.flush()?;
        Ok(())
    }

    pub fn load_queues(&self) -> Result<Vec<StoredQueue>, BrokerError> {
        let meta = self.db.open_tree(QUEUES_TREE)?;
        let mut queues = Vec::new();
        for entry in meta.iter() {
            let (key, value) = entry?;
            let name = String::from_utf8_lossy(&key).into_owned();
            let options: QueueOptions = serde_json::from_slice(&value)?;
            let messages = self.load_messages(&name)?;
            debug!(queue = %name, messages = messages.len(), "loaded stored queue");
            queues.push(StoredQueue {
                name,
                options,
                messages,
            });
        }
        Ok(queues)
    }

    pub fn load_messages(&self, queue: &str) -> Result<VecDeque<QueuedMessage>, BrokerError> {
        self.messages(queue)?
            .iter()
            .map(|entry| -> Result<QueuedMessage, BrokerError> {
                let (_, value) = entry?;
                Ok(serde_json::from_slice(&value)?)
            })
            .collect()
    }

    /// Store a message and flush before returning, so an accepted publish
    /// survives a crash.
    pub fn append(&self, queue: &str, message: &QueuedMessage) -> Result<(), BrokerError> {
        #[cfg(test)]
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(sled::Error::Unsupported("appends disabled".to_string()).into());
        }
        let tree = self.messages(queue)?;
        tree.insert(message.seq.to_be_bytes(), serde_json::to_vec(message)?)?;
        tree.flush()?;
        Ok(())
    }

    pub fn remove(&self, queue: &str, seq: u64) -> Result<(), BrokerError> {
        self.messages(queue)?.remove(seq.to_be_bytes())?;
        Ok(())
    }

    pub fn flush(&self) -> Result<(), BrokerError> {
        self.db.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for QueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueStore")
            .field("db", &"sled::Db")
            .finish()
    }
}
