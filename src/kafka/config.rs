use serde::Deserialize;
use std::collections::HashMap;

const DEFAULT_BROKER: &str = "localhost:9092";
const DEFAULT_GROUP_ID: &str = "group";
const DEFAULT_AUTO_OFFSET_RESET: &str = "earliest";
const DEFAULT_MESSAGE_TIMEOUT_MS: u32 = 5000;

const DEFAULT_TOPIC_NAME: &str = "main-topic";
const DEFAULT_TOPIC_PARTITIONS: i32 = 1;
const DEFAULT_TOPIC_REPLICATION_FACTOR: i32 = 1;

/// Connection settings shared by the producer, the consumer and the admin client.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub group_id: String,
    pub auto_offset_reset: String,
    pub message_timeout_ms: u32,
    pub user: String,
    pub password: String,
}

impl Default for KafkaConfig {
    fn default() -> Self {
        KafkaConfig {
            brokers: vec![DEFAULT_BROKER.to_string()],
            group_id: DEFAULT_GROUP_ID.to_string(),
            auto_offset_reset: DEFAULT_AUTO_OFFSET_RESET.to_string(),
            message_timeout_ms: DEFAULT_MESSAGE_TIMEOUT_MS,
            user: String::new(),
            password: String::new(),
        }
    }
}

impl KafkaConfig {
    fn common(&self) -> HashMap<String, String> {
        let mut mp: HashMap<String, String> = HashMap::new();
        mp.insert(String::from("bootstrap.servers"), self.brokers.join(","));
        if !self.user.is_empty() {
            mp.insert(String::from("sasl.username"), self.user.clone());
        }
        if !self.password.is_empty() {
            mp.insert(String::from("sasl.password"), self.password.clone());
        }
        mp
    }

    pub fn producer_hash(&self) -> HashMap<String, String> {
        let mut mp = self.common();
        mp.insert(
            String::from("message.timeout.ms"),
            self.message_timeout_ms.to_string(),
        );
        mp
    }

    pub fn consumer_hash(&self) -> HashMap<String, String> {
        let mut mp = self.common();
        mp.insert(String::from("group.id"), self.group_id.clone());
        mp.insert(
            String::from("auto.offset.reset"),
            self.auto_offset_reset.clone(),
        );
        mp
    }

    pub fn admin_hash(&self) -> HashMap<String, String> {
        self.common()
    }
}

pub fn client_config(settings: &HashMap<String, String>) -> rdkafka::ClientConfig {
    let mut client_config = rdkafka::ClientConfig::new();
    for (k, v) in settings.iter() {
        client_config.set(k, v);
    }
    client_config
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopicConfig {
    pub name: String,
    pub partitions: i32,
    pub replication_factor: i32,
}

impl Default for TopicConfig {
    fn default() -> Self {
        TopicConfig {
            name: DEFAULT_TOPIC_NAME.to_string(),
            partitions: DEFAULT_TOPIC_PARTITIONS,
            replication_factor: DEFAULT_TOPIC_REPLICATION_FACTOR,
        }
    }
}
