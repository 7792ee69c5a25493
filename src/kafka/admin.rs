use crate::kafka::config::{client_config, KafkaConfig, TopicConfig};
use crate::log::kflog::Logger;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::{KafkaError, KafkaResult, RDKafkaErrorCode};
use std::time::Duration;

const OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, PartialEq, Eq)]
pub enum TopicStatus {
    Created,
    AlreadyExists,
}

/// Creating a topic that already exists is not an error.
pub fn topic_status(result: TopicResult) -> KafkaResult<TopicStatus> {
    match result {
        Ok(_) => Ok(TopicStatus::Created),
        Err((_, RDKafkaErrorCode::TopicAlreadyExists)) => Ok(TopicStatus::AlreadyExists),
        Err((_, code)) => Err(KafkaError::AdminOp(code)),
    }
}

pub async fn ensure_topic(
    cfg: &KafkaConfig,
    topic: &TopicConfig,
) -> KafkaResult<TopicStatus> {
    let admin: AdminClient<DefaultClientContext> = client_config(&cfg.admin_hash()).create()?;
    let new_topic = NewTopic::new(
        &topic.name,
        topic.partitions,
        TopicReplication::Fixed(topic.replication_factor),
    );
    let options = AdminOptions::new().operation_timeout(Some(OPERATION_TIMEOUT));

    let result = admin
        .create_topics(&[new_topic], &options)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| KafkaError::AdminOpCreation(format!("no result for topic {}", topic.name)))?;

    topic_status(result)
}

/// Declares the topic and logs the outcome. A failure is not fatal: the
/// clients still start and the broker may auto-create the topic on first use.
pub async fn declare_topic(
    logger: &Logger,
    cfg: &KafkaConfig,
    topic: &TopicConfig,
) -> Option<TopicStatus> {
    log_declaration(logger, &topic.name, ensure_topic(cfg, topic).await)
}

pub fn log_declaration(
    logger: &Logger,
    topic: &str,
    result: KafkaResult<TopicStatus>,
) -> Option<TopicStatus> {
    match result {
        Ok(status) => {
            slog::info!(
                logger,
                "topic declared";
                "topic" => topic,
                "status" => format!("{:?}", status),
            );
            Some(status)
        }
        Err(e) => {
            slog::error!(
                logger,
                "failed to declare topic";
                "topic" => topic,
                "error" => e.to_string(),
            );
            None
        }
    }
}
