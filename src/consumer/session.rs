//! Consumer connection lifecycle.
//!
//! `ConsumerSession` walks a broker connection through
//! `Disconnected -> Connected -> Provisioned -> Subscribed -> Consuming -> Closed`
//! and refuses any step taken out of order. `close` is accepted from every
//! state and releases the connection if one is held.

use std::fmt;
use std::future::Future;

use tracing::info;

use crate::broker::{QueueInfo, QueueOptions};
use crate::codec::EnvelopeShape;
use crate::consumer::handler::{ConsumerReport, DeliveryHandler};
use crate::transport::BrokerChannel;
use crate::utils::error::{ChannelError, ConsumerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Disconnected,
    Connected,
    Provisioned,
    Subscribed,
    Consuming,
    Closed,
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsumerState::Disconnected => "disconnected",
            ConsumerState::Connected => "connected",
            ConsumerState::Provisioned => "provisioned",
            ConsumerState::Subscribed => "subscribed",
            ConsumerState::Consuming => "consuming",
            ConsumerState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Unacknowledged deliveries a consumer may hold. The broker pushes nothing
/// more until the one in hand is settled.
pub const PREFETCH: u16 = 1;

pub struct ConsumerSession<C> {
    channel: Option<C>,
    state: ConsumerState,
    queues: Vec<String>,
}

impl<C: BrokerChannel> Default for ConsumerSession<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: BrokerChannel> ConsumerSession<C> {
    pub fn new() -> Self {
        Self {
            channel: None,
            state: ConsumerState::Disconnected,
            queues: Vec::new(),
        }
    }

    pub fn state(&self) -> ConsumerState {
        self.state
    }

    /// Queues provisioned so far, in provisioning order.
    pub fn queues(&self) -> &[String] {
        &self.queues
    }

    fn require(&self, action: &'static str, allowed: &[ConsumerState]) -> Result<(), ConsumerError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ConsumerError::InvalidTransition {
                action,
                state: self.state,
            })
        }
    }

    /// Adopt the channel produced by `connect`. A failed connection leaves
    /// the session disconnected.
    pub async fn connect<F>(&mut self, connect: F) -> Result<(), ConsumerError>
    where
        F: Future<Output = Result<C, ChannelError>>,
    {
        self.require("connect", &[ConsumerState::Disconnected])?;
        self.channel = Some(connect.await?);
        self.state = ConsumerState::Connected;
        Ok(())
    }

    /// Declare `queue` durable for `shape` if it does not exist yet. Never
    /// deletes or purges, so queued messages survive.
    pub async fn provision(
        &mut self,
        queue: &str,
        shape: EnvelopeShape,
    ) -> Result<QueueInfo, ConsumerError> {
        self.require(
            "provision",
            &[ConsumerState::Connected, ConsumerState::Provisioned],
        )?;
        let channel = self.channel.as_mut().ok_or(ChannelError::Closed)?;
        let info = channel
            .declare_queue(queue, QueueOptions::durable(shape.content_type()))
            .await?;
        info!(queue = %queue, messages = info.message_count, "queue provisioned");

        if !self.queues.iter().any(|q| q == queue) {
            self.queues.push(queue.to_string());
        }
        self.state = ConsumerState::Provisioned;
        Ok(info)
    }

    /// Apply the `PREFETCH` window, then register on every provisioned queue.
    pub async fn subscribe(&mut self) -> Result<(), ConsumerError> {
        self.require("subscribe", &[ConsumerState::Provisioned])?;
        let channel = self.channel.as_mut().ok_or(ChannelError::Closed)?;
        channel.qos(PREFETCH).await?;
        for queue in &self.queues {
            let tag = channel.consume(queue).await?;
            info!(queue = %queue, consumer_tag = %tag, prefetch = PREFETCH, "subscribed");
        }
        self.state = ConsumerState::Subscribed;
        Ok(())
    }

    /// Process deliveries until `shutdown` resolves. Shutdown is only
    /// observed between deliveries, so a message being handled is always
    /// settled first.
    pub async fn run_until<S>(
        &mut self,
        shutdown: S,
        handler: &DeliveryHandler,
    ) -> Result<ConsumerReport, ConsumerError>
    where
        S: Future<Output = ()>,
    {
        self.require("consume", &[ConsumerState::Subscribed])?;
        self.state = ConsumerState::Consuming;
        let channel = self.channel.as_mut().ok_or(ChannelError::Closed)?;
        info!(" [*] Ready for work. To exit press CTRL+C");

        tokio::pin!(shutdown);
        let mut report = ConsumerReport::default();
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("User interrupted continuous listening process.");
                    break;
                }
                delivery = channel.next_delivery() => {
                    handler.handle(channel, delivery?, &mut report).await?;
                }
            }
        }
        Ok(report)
    }

    /// Release the connection. Safe to call from any state, any number of times.
    pub async fn close(&mut self) -> Result<(), ConsumerError> {
        if self.state == ConsumerState::Closed {
            return Ok(());
        }
        self.state = ConsumerState::Closed;
        if let Some(mut channel) = self.channel.take() {
            channel.close().await?;
            info!("Closing connection. Goodbye.");
        }
        Ok(())
    }
}
