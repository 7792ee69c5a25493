use crate::envelope::{EnvelopeCodec, EnvelopeError};
use crate::kafka::config::{client_config, KafkaConfig};
use crate::log::kflog::Logger;
use crate::metrics::metrics::Metrics;
use crate::sample::{RecordSource, SampleData};
use async_trait::async_trait;
use cloudevents::binding::rdkafka::{FutureRecordExt, MessageRecord};
use rdkafka::config::FromClientConfig;
use rdkafka::error::KafkaResult;
use rdkafka::producer::{FutureProducer, FutureRecord};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

#[async_trait]
pub trait EnvelopeSink: Send + Sync {
    async fn send(&self, topic: &str, record: &MessageRecord) -> KafkaResult<()>;
}

pub struct KafkaSink {
    producer: FutureProducer,
    queue_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl KafkaSink {
    pub fn new(
        cfg: &KafkaConfig,
        queue_timeout: Duration,
        metrics: Arc<Metrics>,
    ) -> KafkaResult<KafkaSink> {
        let producer = FutureProducer::from_config(&client_config(&cfg.producer_hash()))?;
        Ok(KafkaSink {
            producer,
            queue_timeout,
            metrics,
        })
    }
}

#[async_trait]
impl EnvelopeSink for KafkaSink {
    async fn send(&self, topic: &str, record: &MessageRecord) -> KafkaResult<()> {
        let future_record = FutureRecord::<(), Vec<u8>>::to(topic).message_record(record);

        let start = Instant::now();
        let result = self.producer.send(future_record, self.queue_timeout).await;
        self.metrics
            .send_duration
            .observe(start.elapsed().as_micros() as f64 / 1000.0);

        result.map(|_| ()).map_err(|(err, _)| err)
    }
}

/// Outcome of one send, observed by `report_deliveries`.
#[derive(Debug)]
pub struct DeliveryReport {
    pub id: String,
    pub data: SampleData,
    pub result: KafkaResult<()>,
}

pub struct Publisher {
    logger: Logger,
    codec: EnvelopeCodec,
    records: Arc<dyn RecordSource>,
    sink: Arc<dyn EnvelopeSink>,
    topic: String,
    interval: Duration,
    reports: mpsc::UnboundedSender<DeliveryReport>,
}

impl Publisher {
    pub fn new(
        logger: Logger,
        codec: EnvelopeCodec,
        records: Arc<dyn RecordSource>,
        sink: Arc<dyn EnvelopeSink>,
        topic: impl Into<String>,
        interval: Duration,
    ) -> (Publisher, mpsc::UnboundedReceiver<DeliveryReport>) {
        let (reports, reports_rx) = mpsc::unbounded_channel();
        let publisher = Publisher {
            logger,
            codec,
            records,
            sink,
            topic: topic.into(),
            interval,
            reports,
        };
        (publisher, reports_rx)
    }

    /// Builds and encodes one envelope, then hands the send to a new task.
    /// The returned handle resolves once the delivery report is posted.
    pub fn publish_once(&self) -> Result<JoinHandle<()>, EnvelopeError> {
        let data = self.records.next_record();
        let id = Uuid::new_v4().to_string();
        let record = self.codec.encode(&id, &data)?;

        let sink = self.sink.clone();
        let topic = self.topic.clone();
        let reports = self.reports.clone();
        Ok(tokio::spawn(async move {
            let result = sink.send(&topic, &record).await;
            // Fails only once the report handler has stopped.
            reports.send(DeliveryReport { id, data, result }).ok();
        }))
    }

    /// Publishes on every tick until shutdown. Sends may overlap when one
    /// takes longer than the interval.
    pub async fn run(self, mut shutdown_rx: oneshot::Receiver<String>) {
        let mut ticker = tokio::time::interval(self.interval);
        slog::info!(
            self.logger,
            "starting publisher";
            "topic" => &self.topic,
            "interval_ms" => self.interval.as_millis() as u64,
        );

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    slog::info!(self.logger, "shutting down publisher");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.publish_once() {
                        slog::error!(
                            self.logger,
                            "failed to build message";
                            "error" => e.to_string(),
                        );
                    }
                }
            }
        }
    }
}

/// Logs every delivery report until all publishers and their in-flight sends are gone.
pub async fn report_deliveries(
    logger: Logger,
    metrics: Arc<Metrics>,
    mut reports: mpsc::UnboundedReceiver<DeliveryReport>,
) {
    while let Some(report) = reports.recv().await {
        match report.result {
            Ok(()) => {
                metrics.sent_messages.inc();
                slog::info!(
                    logger,
                    "message sent";
                    "id" => &report.id,
                    "name" => &report.data.name,
                    "age" => report.data.age,
                    "company" => &report.data.company,
                );
            }
            Err(err) => {
                metrics.send_errors.inc();
                slog::error!(
                    logger,
                    "failed to send message";
                    "id" => &report.id,
                    "name" => &report.data.name,
                    "age" => report.data.age,
                    "company" => &report.data.company,
                    "error" => err.to_string(),
                );
            }
        }
    }
}
