use tracing::{info, warn};

use crate::broker::Delivery;
use crate::codec::{self, Envelope, EnvelopeShape};
use crate::consumer::Interest;
use crate::listing::FEED_TIMESTAMP_FORMAT;
use crate::transport::BrokerChannel;
use crate::utils::error::ChannelError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    pub acked: usize,
    pub dead_lettered: usize,
    pub matched: usize,
    /// Settlements the broker answered with an `error` reply.
    pub refused: usize,
}

/// Settles each delivery exactly once: ack after a successful decode and
/// log, nack without requeue when the body cannot be decoded.
///
/// A broker refusal of one settlement is logged and consumption goes on.
/// Only connection-level failures end the loop.
#[derive(Debug, Clone, Default)]
pub struct DeliveryHandler {
    interest: Option<Interest>,
}

impl DeliveryHandler {
    pub fn new(interest: Option<Interest>) -> Self {
        Self { interest }
    }

    pub async fn handle<C: BrokerChannel + ?Sized>(
        &self,
        channel: &mut C,
        delivery: Delivery,
        report: &mut ConsumerReport,
    ) -> Result<(), ChannelError> {
        let decoded = EnvelopeShape::from_content_type(&delivery.content_type)
            .and_then(|shape| codec::decode(shape, &delivery.body));

        match decoded {
            Ok(Envelope::Listing(listing)) => {
                info!(
                    queue = %delivery.queue,
                    redelivered = delivery.redelivered,
                    "{} - New Animal: {listing}",
                    listing.posted_at.format(FEED_TIMESTAMP_FORMAT)
                );
                if let Some(interest) = self.interest.as_ref().filter(|i| i.matches(&listing)) {
                    info!(
                        queue = %delivery.queue,
                        "[MATCH] {} the {} at {} ({}, {}) is looking for a home",
                        listing.name,
                        interest.breed,
                        listing.shelter_name,
                        listing.shelter_city,
                        listing.shelter_state
                    );
                    report.matched += 1;
                }
                let outcome = channel.ack(delivery.delivery_tag).await;
                if settled(outcome, &delivery, report)? {
                    report.acked += 1;
                }
            }
            Ok(Envelope::Sample(sample)) => {
                info!(
                    queue = %delivery.queue,
                    timestamp = sample.timestamp,
                    reading = sample.reading,
                    "new sample"
                );
                let outcome = channel.ack(delivery.delivery_tag).await;
                if settled(outcome, &delivery, report)? {
                    report.acked += 1;
                }
            }
            Err(e) => {
                warn!(
                    queue = %delivery.queue,
                    delivery_tag = delivery.delivery_tag,
                    message_id = %delivery.message_id,
                    error = %e,
                    "undecodable message, dead-lettering"
                );
                let outcome = channel.nack(delivery.delivery_tag, false).await;
                if settled(outcome, &delivery, report)? {
                    report.dead_lettered += 1;
                }
            }
        }
        Ok(())
    }
}

fn settled(
    outcome: Result<(), ChannelError>,
    delivery: &Delivery,
    report: &mut ConsumerReport,
) -> Result<bool, ChannelError> {
    match outcome {
        Ok(()) => Ok(true),
        Err(ChannelError::Broker(reason)) => {
            warn!(
                queue = %delivery.queue,
                delivery_tag = delivery.delivery_tag,
                reason = %reason,
                "broker refused settlement"
            );
            report.refused += 1;
            Ok(false)
        }
        Err(e) => Err(e),
    }
}
