//! The `producer` module publishes source records to their queues.
//!
//! Records are taken from the source one at a time, in source order. Each
//! target queue is declared durable the first time it is seen in a run;
//! declaring never touches messages already in the queue.

pub mod publisher;

pub use publisher::{Producer, ProducerReport};
