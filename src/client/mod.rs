//! The `client` module defines the broker-side representation of a connection.
//!
//! It provides the `Client` struct, which encapsulates the state of a single
//! connected client: its identifier, the channel used to push deliveries to
//! it, and its flow-control window.

pub mod session;
pub use session::{Client, ClientId};

#[cfg(test)]
mod tests;
