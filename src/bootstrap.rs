use crate::config::AppConfig;
use crate::envelope::EnvelopeCodec;
use crate::kafka::admin;
use crate::kafka::consumer::{EnvelopeSource, KafkaSource, Subscriber};
use crate::kafka::producer::{self, EnvelopeSink, KafkaSink, Publisher};
use crate::log::kflog::Logger;
use crate::metrics::metrics::{Metrics, Server, ServerConfig};
use crate::sample::{FakeRecords, RecordSource};
use prometheus::Registry;
use rdkafka::error::KafkaError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error("kafka: {0}")]
    Kafka(#[from] KafkaError),
    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("producer interval must be at least one second")]
    ZeroInterval,
}

/// Everything the publishing and subscribing tasks are built from.
pub struct Parts {
    pub codec: EnvelopeCodec,
    pub records: Arc<dyn RecordSource>,
    pub sink: Arc<dyn EnvelopeSink>,
    pub source: Arc<dyn EnvelopeSource>,
    pub metrics: Arc<Metrics>,
    pub topic: String,
    pub interval: Duration,
}

/// The running publisher, subscriber and delivery-report tasks.
pub struct Pipeline {
    publisher_shutdown: oneshot::Sender<String>,
    subscriber_shutdown: oneshot::Sender<String>,
    handles: Vec<JoinHandle<()>>,
}

impl Pipeline {
    pub fn spawn(logger: Logger, parts: Parts) -> Pipeline {
        let (publisher, reports) = Publisher::new(
            logger.clone(),
            parts.codec.clone(),
            parts.records,
            parts.sink,
            parts.topic,
            parts.interval,
        );
        let subscriber = Subscriber::new(
            logger.clone(),
            parts.codec,
            parts.source,
            parts.metrics.clone(),
        );

        let (publisher_shutdown, publisher_shutdown_rx) = oneshot::channel::<String>();
        let (subscriber_shutdown, subscriber_shutdown_rx) = oneshot::channel::<String>();

        let handles = vec![
            tokio::spawn(producer::report_deliveries(
                logger,
                parts.metrics,
                reports,
            )),
            tokio::spawn(publisher.run(publisher_shutdown_rx)),
            tokio::spawn(subscriber.run(subscriber_shutdown_rx)),
        ];

        Pipeline {
            publisher_shutdown,
            subscriber_shutdown,
            handles,
        }
    }

    /// Stops both loops and waits for in-flight sends to be reported.
    pub async fn shutdown(self, logger: &Logger) {
        self.publisher_shutdown.send(String::from("shutdown")).ok();
        self.subscriber_shutdown.send(String::from("shutdown")).ok();
        for handle in self.handles {
            if let Err(e) = handle.await {
                slog::error!(logger, "pipeline task failed"; "error" => e.to_string());
            }
        }
    }
}

pub async fn run(cfg: &AppConfig, logger: Logger) -> Result<(), BootstrapError> {
    let kafka_config = cfg.get_kafka_config();
    let topic_config = cfg.get_topic_config();
    let producer_config = cfg.get_producer_config();
    if producer_config.interval().is_zero() {
        return Err(BootstrapError::ZeroInterval);
    }

    let registry = Arc::new(Registry::new());
    let metrics = Arc::new(Metrics::new(&registry)?);

    admin::declare_topic(&logger, &kafka_config, &topic_config).await;

    let sink = KafkaSink::new(
        &kafka_config,
        producer_config.send_timeout(),
        metrics.clone(),
    )?;
    let source = KafkaSource::new(&kafka_config, &topic_config.name)?;

    let metrics_server = Server::new(ServerConfig {
        port: cfg.get_metrics_config().port(),
    });
    let (shutdown_metrics_tx, shutdown_metrics_rx) = oneshot::channel::<String>();
    let metrics_shutdown_rx =
        metrics_server.start_server(logger.clone(), registry, shutdown_metrics_rx);

    let interval = producer_config.interval();
    let pipeline = Pipeline::spawn(
        logger.clone(),
        Parts {
            codec: EnvelopeCodec::new(producer_config.source, producer_config.event_type),
            records: Arc::new(FakeRecords),
            sink: Arc::new(sink),
            source: Arc::new(source),
            metrics,
            topic: topic_config.name,
            interval,
        },
    );

    if let Err(e) = tokio::signal::ctrl_c().await {
        slog::error!(logger, "failed to listen for shutdown signal"; "error" => e.to_string());
    }
    slog::info!(logger, "shutting down application");
    pipeline.shutdown(&logger).await;
    shutdown_metrics_tx.send(String::from("shutdown")).ok();
    metrics_shutdown_rx.await.ok();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::memory::{FixedRecords, MemoryTopic};
    use crate::log::kflog::capture;
    use crate::sample::SampleData;

    #[tokio::test(start_paused = true)]
    async fn test_published_record_is_logged_by_subscriber() {
        let (logger, buffer) = capture::logger();
        let registry = Registry::new();
        let metrics = Arc::new(Metrics::new(&registry).unwrap());
        let topic = Arc::new(MemoryTopic::new("main-topic"));

        let pipeline = Pipeline::spawn(
            logger.clone(),
            Parts {
                codec: EnvelopeCodec::new("https://1v0dev/producer", "com.dev1v0.producer"),
                records: Arc::new(FixedRecords(SampleData::new("Jane Doe", 42, "Acme"))),
                sink: topic.clone(),
                source: topic,
                metrics: metrics.clone(),
                topic: "main-topic".to_string(),
                interval: Duration::from_secs(5),
            },
        );

        // Two ticks: one immediately and one after five seconds.
        tokio::time::sleep(Duration::from_secs(6)).await;
        pipeline.shutdown(&logger).await;

        let lines = buffer.lines();
        let sent: Vec<&String> = lines.iter().filter(|l| l.contains("message sent")).collect();
        let received: Vec<&String> = lines
            .iter()
            .filter(|l| l.contains("message received"))
            .collect();
        assert_eq!(sent.len(), 2);
        assert_eq!(received.len(), 2);

        for line in sent.iter().chain(received.iter()) {
            assert!(line.contains("\"name\":\"Jane Doe\""));
            assert!(line.contains("\"age\":42"));
            assert!(line.contains("\"company\":\"Acme\""));
        }

        let id_of = |line: &str| -> String {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            v["id"].as_str().unwrap().to_string()
        };
        let mut sent_ids: Vec<String> = sent.iter().map(|l| id_of(l.as_str())).collect();
        let mut received_ids: Vec<String> = received.iter().map(|l| id_of(l.as_str())).collect();
        sent_ids.sort();
        received_ids.sort();
        assert_eq!(sent_ids, received_ids);
        assert_ne!(sent_ids[0], sent_ids[1]);

        assert_eq!(metrics.sent_messages.get(), 2);
        assert_eq!(metrics.received_messages.get(), 2);
    }
}
