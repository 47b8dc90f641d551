//! The `transport` module is responsible for moving broker requests and
//! deliveries between processes, primarily via WebSockets.
//!
//! It defines the messaging protocol used between clients and the server,
//! the request handler shared by every transport, the WebSocket server
//! itself, and the client-side `BrokerChannel` with its WebSocket and
//! in-process implementations.

pub mod channel;
pub mod handler;
pub mod local_channel;
pub mod message;
pub mod websocket;
pub mod ws_channel;

pub use channel::BrokerChannel;
pub use handler::handle_client_message;
pub use local_channel::LocalChannel;
pub use ws_channel::WsChannel;

#[cfg(test)]
mod tests;

#[cfg(test)]
mod websocket_tests;
