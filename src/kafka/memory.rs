//! In-memory stand-ins for the kafka clients, used by tests.

use crate::kafka::consumer::EnvelopeSource;
use crate::kafka::producer::EnvelopeSink;
use crate::sample::{RecordSource, SampleData};
use async_trait::async_trait;
use cloudevents::binding::rdkafka::{FutureRecordExt, MessageRecord};
use rdkafka::error::{KafkaError, KafkaResult, RDKafkaErrorCode};
use rdkafka::message::{Header, Headers, Message, OwnedHeaders, OwnedMessage, Timestamp};
use rdkafka::producer::FutureRecord;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

/// What a broker would hand a consumer for `record` written to `topic`.
pub fn to_message(topic: &str, record: &MessageRecord, offset: i64) -> OwnedMessage {
    let future_record = FutureRecord::<(), Vec<u8>>::to(topic).message_record(record);
    OwnedMessage::new(
        future_record.payload.cloned(),
        None,
        topic.to_string(),
        Timestamp::NotAvailable,
        0,
        offset,
        future_record.headers.clone(),
    )
}

/// A structured-mode record: the whole event as JSON in the payload.
pub fn structured_message(topic: &str, event: serde_json::Value) -> OwnedMessage {
    let headers = OwnedHeaders::new().insert(Header {
        key: "content-type",
        value: Some("application/cloudevents+json"),
    });
    OwnedMessage::new(
        Some(event.to_string().into_bytes()),
        None,
        topic.to_string(),
        Timestamp::NotAvailable,
        0,
        0,
        Some(headers),
    )
}

pub fn with_payload(message: &OwnedMessage, payload: Option<&[u8]>) -> OwnedMessage {
    OwnedMessage::new(
        payload.map(|p| p.to_vec()),
        None,
        message.topic().to_string(),
        message.timestamp(),
        message.partition(),
        message.offset(),
        message.headers().cloned(),
    )
}

pub fn header(message: &OwnedMessage, name: &str) -> Option<String> {
    message
        .headers()?
        .iter()
        .find(|h| h.key == name)
        .and_then(|h| h.value)
        .map(|v| String::from_utf8_lossy(v).into_owned())
}

pub struct FixedRecords(pub SampleData);

impl RecordSource for FixedRecords {
    fn next_record(&self) -> SampleData {
        self.0.clone()
    }
}

/// Keeps every accepted record as the message a consumer would read back.
#[derive(Default)]
pub struct MemorySink {
    sent: Mutex<Vec<OwnedMessage>>,
    fail: bool,
}

impl MemorySink {
    pub fn failing() -> MemorySink {
        MemorySink {
            sent: Mutex::new(vec![]),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OwnedMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EnvelopeSink for MemorySink {
    async fn send(&self, topic: &str, record: &MessageRecord) -> KafkaResult<()> {
        if self.fail {
            return Err(KafkaError::MessageProduction(
                RDKafkaErrorCode::MessageTimedOut,
            ));
        }
        let mut sent = self.sent.lock().unwrap();
        let offset = sent.len() as i64;
        sent.push(to_message(topic, record, offset));
        Ok(())
    }
}

/// Replays a fixed list of receive results, then signals `drained` and blocks forever.
pub struct QueueSource {
    queue: Mutex<VecDeque<KafkaResult<OwnedMessage>>>,
    drained: Mutex<Option<oneshot::Sender<()>>>,
}

impl QueueSource {
    pub fn new(items: Vec<KafkaResult<OwnedMessage>>) -> (QueueSource, oneshot::Receiver<()>) {
        let (drained_tx, drained_rx) = oneshot::channel();
        let source = QueueSource {
            queue: Mutex::new(items.into_iter().collect()),
            drained: Mutex::new(Some(drained_tx)),
        };
        (source, drained_rx)
    }
}

#[async_trait]
impl EnvelopeSource for QueueSource {
    async fn next_envelope(&self) -> KafkaResult<OwnedMessage> {
        let next = self.queue.lock().unwrap().pop_front();
        if let Some(item) = next {
            return item;
        }

        let drained = self.drained.lock().unwrap().take();
        if let Some(tx) = drained {
            tx.send(()).ok();
        }
        std::future::pending().await
    }
}

/// A single-partition topic: whatever the sink accepts the source yields, in order.
pub struct MemoryTopic {
    name: String,
    offset: Mutex<i64>,
    tx: mpsc::UnboundedSender<OwnedMessage>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<OwnedMessage>>,
}

impl MemoryTopic {
    pub fn new(name: &str) -> MemoryTopic {
        let (tx, rx) = mpsc::unbounded_channel();
        MemoryTopic {
            name: name.to_string(),
            offset: Mutex::new(0),
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }
}

#[async_trait]
impl EnvelopeSink for MemoryTopic {
    async fn send(&self, topic: &str, record: &MessageRecord) -> KafkaResult<()> {
        if topic != self.name {
            return Err(KafkaError::MessageProduction(
                RDKafkaErrorCode::UnknownTopicOrPartition,
            ));
        }
        let message = {
            let mut offset = self.offset.lock().unwrap();
            *offset += 1;
            to_message(topic, record, *offset - 1)
        };
        self.tx
            .send(message)
            .map_err(|_| KafkaError::MessageProduction(RDKafkaErrorCode::BrokerDestroy))
    }
}

#[async_trait]
impl EnvelopeSource for MemoryTopic {
    async fn next_envelope(&self) -> KafkaResult<OwnedMessage> {
        match self.rx.lock().await.recv().await {
            Some(message) => Ok(message),
            None => std::future::pending().await,
        }
    }
}
