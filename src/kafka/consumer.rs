use crate::envelope::EnvelopeCodec;
use crate::kafka::config::{client_config, KafkaConfig};
use crate::log::kflog::Logger;
use crate::metrics::metrics::Metrics;
use crate::sample::SampleData;
use async_trait::async_trait;
use cloudevents::AttributesReader;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::KafkaResult;
use rdkafka::message::OwnedMessage;
use std::sync::Arc;
use tokio::sync::oneshot;

#[async_trait]
pub trait EnvelopeSource: Send + Sync {
    async fn next_envelope(&self) -> KafkaResult<OwnedMessage>;
}

/// Subscribed stream consumer. Offsets are committed by librdkafka's auto-commit.
pub struct KafkaSource {
    consumer: StreamConsumer,
}

impl KafkaSource {
    pub fn new(cfg: &KafkaConfig, topic: &str) -> KafkaResult<KafkaSource> {
        let consumer: StreamConsumer = client_config(&cfg.consumer_hash()).create()?;
        consumer.subscribe(&[topic])?;
        Ok(KafkaSource { consumer })
    }
}

#[async_trait]
impl EnvelopeSource for KafkaSource {
    async fn next_envelope(&self) -> KafkaResult<OwnedMessage> {
        Ok(self.consumer.recv().await?.detach())
    }
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Received(SampleData),
    Empty,
    Rejected,
}

pub struct Subscriber {
    logger: Logger,
    codec: EnvelopeCodec,
    source: Arc<dyn EnvelopeSource>,
    metrics: Arc<Metrics>,
}

impl Subscriber {
    pub fn new(
        logger: Logger,
        codec: EnvelopeCodec,
        source: Arc<dyn EnvelopeSource>,
        metrics: Arc<Metrics>,
    ) -> Subscriber {
        Subscriber {
            logger,
            codec,
            source,
            metrics,
        }
    }

    /// Accepts binary-mode and structured-mode CloudEvents records.
    pub fn handle(&self, message: &OwnedMessage) -> Outcome {
        let event = match self.codec.open(message) {
            Ok(event) => event,
            Err(e) => {
                self.metrics.decode_errors.inc();
                slog::error!(
                    self.logger,
                    "failed to read message envelope";
                    "error" => e.to_string(),
                );
                return Outcome::Rejected;
            }
        };

        match self.codec.decode(&event) {
            Ok(Some(data)) => {
                self.metrics.received_messages.inc();
                slog::info!(
                    self.logger,
                    "message received";
                    "id" => event.id(),
                    "name" => &data.name,
                    "age" => data.age,
                    "company" => &data.company,
                );
                Outcome::Received(data)
            }
            Ok(None) => {
                self.metrics.missing_data.inc();
                slog::warn!(self.logger, "no data in message"; "id" => event.id());
                Outcome::Empty
            }
            Err(e) => {
                self.metrics.decode_errors.inc();
                slog::error!(
                    self.logger,
                    "failed to decode message";
                    "id" => event.id(),
                    "error" => e.to_string(),
                );
                Outcome::Rejected
            }
        }
    }

    pub async fn run(self, mut shutdown_rx: oneshot::Receiver<String>) {
        slog::info!(self.logger, "starting subscriber");
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    slog::info!(self.logger, "shutting down subscriber");
                    return;
                }
                received = self.source.next_envelope() => {
                    match received {
                        Ok(message) => {
                            self.handle(&message);
                        }
                        Err(e) => {
                            slog::error!(
                                self.logger,
                                "failed to receive message";
                                "error" => e.to_string(),
                            );
                        }
                    }
                }
            }
        }
    }
}
