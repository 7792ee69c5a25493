use crate::kafka::config::{KafkaConfig, TopicConfig};
use config::{Config, ConfigError};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    output_file: String,

    #[serde(default)]
    kafka: KafkaConfig,

    #[serde(default)]
    topic: TopicConfig,

    #[serde(default)]
    producer: ProducerConfig,

    #[serde(default)]
    metrics: MetricsConfig,
}

impl AppConfig {
    /// Loads the config file when one is given; otherwise every setting keeps its default.
    pub fn load(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
        match config_path {
            None => Ok(AppConfig::default()),
            Some(path) => AppConfig::initialize_config(path),
        }
    }

    fn initialize_config(config_path: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::with_name(config_path))
            .build()?
            .try_deserialize()
    }

    pub fn get_output_file(&self) -> String {
        self.output_file.clone()
    }

    pub fn get_kafka_config(&self) -> KafkaConfig {
        self.kafka.clone()
    }

    pub fn get_topic_config(&self) -> TopicConfig {
        self.topic.clone()
    }

    pub fn get_producer_config(&self) -> ProducerConfig {
        self.producer.clone()
    }

    pub fn get_metrics_config(&self) -> MetricsConfig {
        self.metrics.clone()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub interval_secs: u64,
    pub send_timeout_ms: u64,
    pub source: String,
    pub event_type: String,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        ProducerConfig {
            interval_secs: ProducerConfig::DEFAULT_INTERVAL_SECS,
            send_timeout_ms: ProducerConfig::DEFAULT_SEND_TIMEOUT_MS,
            source: ProducerConfig::DEFAULT_SOURCE.to_string(),
            event_type: ProducerConfig::DEFAULT_EVENT_TYPE.to_string(),
        }
    }
}

impl ProducerConfig {
    const DEFAULT_INTERVAL_SECS: u64 = 5;

    const DEFAULT_SEND_TIMEOUT_MS: u64 = 1000;

    const DEFAULT_SOURCE: &'static str = "https://1v0dev/producer";

    const DEFAULT_EVENT_TYPE: &'static str = "com.dev1v0.producer";

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "MetricsConfig::default_port")]
    port: Option<u16>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        MetricsConfig {
            port: MetricsConfig::default_port(),
        }
    }
}

impl MetricsConfig {
    const DEFAULT_METRICS_PORT: u16 = 8088;

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(MetricsConfig::DEFAULT_METRICS_PORT)
    }

    fn default_port() -> Option<u16> {
        Some(MetricsConfig::DEFAULT_METRICS_PORT)
    }
}
