use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::broker::QueueOptions;
use crate::codec::{EnvelopeShape, encode_listing, encode_sample};
use crate::listing::AnimalListing;
use crate::source::SampleRow;
use crate::transport::BrokerChannel;
use crate::utils::error::{ChannelError, ProducerError, ValidationError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerReport {
    pub published: usize,
    pub skipped: usize,
}

/// Publishes records over a borrowed channel. The caller owns the
/// connection and closes it whatever the outcome of a run.
pub struct Producer<'a, C: ?Sized> {
    channel: &'a mut C,
    pace: Duration,
    declared: HashSet<String>,
}

impl<'a, C: BrokerChannel + ?Sized> Producer<'a, C> {
    pub fn new(channel: &'a mut C, pace: Duration) -> Self {
        Self {
            channel,
            pace,
            declared: HashSet::new(),
        }
    }

    async fn ensure_queue(&mut self, queue: &str, shape: EnvelopeShape) -> Result<(), ChannelError> {
        if self.declared.contains(queue) {
            return Ok(());
        }
        let info = self
            .channel
            .declare_queue(queue, QueueOptions::durable(shape.content_type()))
            .await?;
        debug!(queue = %queue, messages = info.message_count, "queue ready");
        self.declared.insert(queue.to_string());
        Ok(())
    }

    async fn pause(&self, first: &mut bool) {
        if std::mem::take(first) || self.pace.is_zero() {
            return;
        }
        tokio::time::sleep(self.pace).await;
    }

    /// Publish every valid listing from `source`. Invalid rows and records
    /// that fail to encode are skipped; a broker failure ends the run.
    pub async fn run<I>(&mut self, source: I) -> Result<ProducerReport, ProducerError>
    where
        I: IntoIterator<Item = Result<AnimalListing, ValidationError>>,
    {
        let mut report = ProducerReport::default();
        let mut first = true;

        for record in source {
            let listing = match record {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(error = %e, "skipping malformed row");
                    report.skipped += 1;
                    continue;
                }
            };
            info!("{} - Row ingested: {listing}", listing.posted_at);

            let body = match encode_listing(&listing) {
                Ok(body) => body,
                Err(e) => {
                    warn!(name = %listing.name, error = %e, "skipping record that failed to encode");
                    report.skipped += 1;
                    continue;
                }
            };

            self.pause(&mut first).await;
            let queue = listing.queue_name();
            self.ensure_queue(&queue, EnvelopeShape::Listing).await?;
            let message_id = self.channel.publish(&queue, body).await?;
            info!(queue = %queue, message_id = %message_id, " [x] Sent {}", listing.name);
            report.published += 1;
        }

        info!(
            published = report.published,
            skipped = report.skipped,
            "listing feed finished"
        );
        Ok(report)
    }

    /// Numeric path: publish each channel reading of every row to its
    /// channel queue. Invalid rows are skipped.
    pub async fn run_samples<I>(&mut self, source: I) -> Result<ProducerReport, ProducerError>
    where
        I: IntoIterator<Item = Result<SampleRow, ValidationError>>,
    {
        let mut report = ProducerReport::default();
        let mut first = true;

        for row in source {
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    warn!(error = %e, "skipping malformed row");
                    report.skipped += 1;
                    continue;
                }
            };

            self.pause(&mut first).await;
            for (queue, sample) in row.readings {
                self.ensure_queue(queue, EnvelopeShape::Sample).await?;
                self.channel.publish(queue, encode_sample(&sample)).await?;
                info!(
                    queue = %queue,
                    timestamp = sample.timestamp,
                    reading = sample.reading,
                    " [x] Sent sample"
                );
                report.published += 1;
            }
        }

        info!(
            published = report.published,
            skipped = report.skipped,
            "sample feed finished"
        );
        Ok(report)
    }
}
