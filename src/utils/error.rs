//! The `error` module defines the error types used within `shelterfeed`.
//!
//! Errors are split by blast radius:
//! - `SerializationError` and `ValidationError` are scoped to one message or
//!   one source row and never terminate a run on their own.
//! - `BrokerError` is returned by the broker engine and travels to clients as
//!   an `error` frame.
//! - `ChannelError` covers the client side of a broker connection; a
//!   `Connection` variant always names the host and the underlying cause.
//! - `ProducerError` and `ConsumerError` are what the two pipelines hand back
//!   to `main`, which turns them into an exit status.

use thiserror::Error;

use crate::consumer::ConsumerState;
use crate::listing::Species;

#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u32),

    #[error("unexpected envelope kind '{0}'")]
    UnexpectedKind(String),

    #[error("numeric sample must be {expected} bytes, got {actual}")]
    SampleLength { expected: usize, actual: usize },

    #[error("unknown content type '{0}'")]
    UnknownContentType(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("line {line}: expected {expected} columns, found {found}")]
    MissingColumns {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: required field '{field}' is empty")]
    EmptyField { line: u64, field: &'static str },

    #[error("line {line}: invalid {field} '{value}'")]
    InvalidField {
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: '{breed}' is not a known {species} breed")]
    UnknownBreed {
        line: u64,
        species: Species,
        breed: String,
    },

    #[error("line {line}: unreadable row: {reason}")]
    Unreadable { line: u64, reason: String },
}

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("queue '{0}' not found")]
    QueueNotFound(String),

    #[error("queue '{queue}' exists with different options: {reason}")]
    PreconditionFailed { queue: String, reason: String },

    #[error("unknown delivery tag {0}")]
    UnknownDeliveryTag(u64),

    #[error("client '{0}' is not registered")]
    UnknownClient(String),

    #[error("storage failure: {0}")]
    Storage(#[from] sled::Error),

    #[error("stored record is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("connection to broker at {host} failed: {reason}")]
    Connection { host: String, reason: String },

    #[error("broker rejected request: {0}")]
    Broker(String),

    #[error("connection closed by broker")]
    Closed,

    #[error("unexpected reply from broker: {0}")]
    UnexpectedReply(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("cannot open source '{path}': {reason}")]
    Source { path: String, reason: String },

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: ConsumerState,
    },

    #[error("interrupted by operator")]
    UserCancellation,

    #[error("terminal i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

impl ConsumerError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ConsumerError::UserCancellation)
    }
}
