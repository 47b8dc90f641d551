//! The `consumer` module subscribes to listing (or sample) queues and
//! settles every delivery it receives.
//!
//! - `interest`: the operator dialogue choosing species and breed
//! - `session`: the connection state machine and the receive loop
//! - `handler`: decode, log, then ack or dead-letter one delivery
//!
//! `run` ties these together and guarantees the connection is released on
//! every exit path.

pub mod handler;
pub mod interest;
pub mod session;

use std::future::Future;

use tracing::info;

use crate::codec::EnvelopeShape;
use crate::transport::BrokerChannel;
use crate::utils::error::{ChannelError, ConsumerError};

pub use handler::{ConsumerReport, DeliveryHandler};
pub use interest::{Interest, select_interest};
pub use session::{ConsumerSession, ConsumerState, PREFETCH};

/// What a consumer process listens to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub queues: Vec<String>,
    pub shape: EnvelopeShape,
    pub interest: Option<Interest>,
}

impl Subscription {
    /// The species queue of `interest`, with breed matches flagged.
    pub fn listings(interest: Interest) -> Self {
        Self {
            queues: vec![interest.queue()],
            shape: EnvelopeShape::Listing,
            interest: Some(interest),
        }
    }

    pub fn samples(queue: &str) -> Self {
        Self {
            queues: vec![queue.to_string()],
            shape: EnvelopeShape::Sample,
            interest: None,
        }
    }
}

/// Connect, provision, subscribe and consume until `shutdown` resolves.
/// Shutdown is honoured at every step, including a connection attempt that
/// never completes, and is reported as `UserCancellation` if it arrives
/// before consuming starts.
pub async fn run<C, F, S>(
    subscription: &Subscription,
    connect: F,
    shutdown: S,
) -> Result<ConsumerReport, ConsumerError>
where
    C: BrokerChannel,
    F: Future<Output = Result<C, ChannelError>>,
    S: Future<Output = ()>,
{
    let mut session = ConsumerSession::new();
    let outcome = drive(&mut session, subscription, connect, shutdown).await;
    let closed = session.close().await;
    let report = outcome?;
    closed?;
    Ok(report)
}

async fn drive<C, F, S>(
    session: &mut ConsumerSession<C>,
    subscription: &Subscription,
    connect: F,
    shutdown: S,
) -> Result<ConsumerReport, ConsumerError>
where
    C: BrokerChannel,
    F: Future<Output = Result<C, ChannelError>>,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let setup = async {
        session.connect(connect).await?;
        for queue in &subscription.queues {
            session.provision(queue, subscription.shape).await?;
        }
        session.subscribe().await
    };
    tokio::select! {
        biased;
        ready = setup => ready?,
        _ = &mut shutdown => {
            info!(queues = ?subscription.queues, "interrupted before consuming");
            return Err(ConsumerError::UserCancellation);
        }
    }

    let handler = DeliveryHandler::new(subscription.interest.clone());
    session.run_until(shutdown, &handler).await
}
