use crate::sample::SampleData;
use cloudevents::binding::rdkafka::{MessageExt, MessageRecord};
use cloudevents::event::EventBuilderError;
use cloudevents::{Data, Event, EventBuilder, EventBuilderV10};
use rdkafka::message::OwnedMessage;

pub const DATA_CONTENT_TYPE: &str = "application/json";
pub const NAME_EXTENSION: &str = "name";

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("failed to serialize record: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("failed to build event: {0}")]
    Build(#[from] EventBuilderError),
    #[error("malformed envelope: {0}")]
    Wire(#[from] cloudevents::message::Error),
}

/// Wraps `SampleData` into CloudEvents and back. The kafka record shape
/// (binary mode on write; binary or structured mode on read) comes from the
/// SDK's rdkafka binding.
#[derive(Debug, Clone)]
pub struct EnvelopeCodec {
    source: String,
    event_type: String,
}

impl EnvelopeCodec {
    pub fn new(source: impl Into<String>, event_type: impl Into<String>) -> EnvelopeCodec {
        EnvelopeCodec {
            source: source.into(),
            event_type: event_type.into(),
        }
    }

    pub fn to_event(&self, id: &str, data: &SampleData) -> Result<Event, EnvelopeError> {
        let bytes = serde_json::to_vec(data).map_err(EnvelopeError::Encode)?;
        let event = EventBuilderV10::new()
            .id(id)
            .source(self.source.clone())
            .ty(self.event_type.clone())
            .data(DATA_CONTENT_TYPE, bytes)
            .extension(NAME_EXTENSION, data.name.clone())
            .build()?;
        Ok(event)
    }

    pub fn encode(&self, id: &str, data: &SampleData) -> Result<MessageRecord, EnvelopeError> {
        Ok(MessageRecord::from_event(self.to_event(id, data)?)?)
    }

    pub fn open(&self, message: &OwnedMessage) -> Result<Event, EnvelopeError> {
        Ok(message.to_event()?)
    }

    /// `Ok(None)` when the event has no data at all.
    pub fn decode(&self, event: &Event) -> Result<Option<SampleData>, EnvelopeError> {
        let data = match event.data() {
            None => return Ok(None),
            Some(data) => data,
        };

        let parsed = match data {
            Data::Binary(bytes) => serde_json::from_slice(bytes),
            Data::String(s) => serde_json::from_str(s),
            Data::Json(value) => serde_json::from_value(value.clone()),
        };
        parsed.map(Some).map_err(EnvelopeError::Decode)
    }
}
