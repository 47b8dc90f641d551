//! # shelterfeed
//!
//! `shelterfeed` simulates a live feed of animal-shelter adoption listings and
//! delivers them to interested subscribers through durable, species-partitioned
//! queues. It ships its own small queue broker, reachable over WebSockets, so
//! the whole pipeline runs end to end.
//!
//! ## Core Modules
//!
//! - `broker`: durable FIFO queues, round-robin dispatch, prefetch and acknowledgment tracking.
//! - `client`: the broker-side view of a connected client.
//! - `codec`: the structured and numeric envelope shapes.
//! - `config`: layered settings (file, environment, defaults).
//! - `consumer`: interest selection and the consumer connection state machine.
//! - `listing`: domain records and the breed catalog.
//! - `persistence`: the sled-backed store behind durable queues.
//! - `producer`: publishes source records to their queues at a fixed pace.
//! - `source`: reads listing and sample feeds from CSV.
//! - `transport`: the wire protocol, the WebSocket server and client channels.
//! - `utils`: error types and logging setup.

pub mod broker;
pub mod client;
pub mod codec;
pub mod config;
pub mod consumer;
pub mod listing;
pub mod persistence;
pub mod producer;
pub mod source;
pub mod transport;
pub mod utils;
