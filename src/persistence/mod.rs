//! The `persistence` module stores durable queues and their messages.
//!
//! It uses `sled` as an embedded key-value store: one metadata tree records
//! every durable queue, and one tree per queue holds the messages that have
//! been published but not yet acknowledged. A broker restart rebuilds its
//! queues from here.

pub mod sled_store;

pub use sled_store::{QueueStore, StoredQueue};

#[cfg(test)]
mod tests;
