//! Body serialization strategies

use crate::error::{ClientError, ClientResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt::Debug;
use std::sync::Arc;

/// Object-safe codec working on a JSON value tree
///
/// Implement this to plug an arbitrary wire format into a handle.
pub trait BodyCodec: Send + Sync + Debug {
    fn content_type(&self) -> &str;

    fn encode(&self, value: &JsonValue) -> ClientResult<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> ClientResult<JsonValue>;
}

/// Which codec a handle converts bodies with
#[derive(Debug, Clone)]
pub enum SerializationStrategy {
    /// Decode through an intermediate value tree; an empty body reads as `null`
    JsonTree,
    /// Decode straight into the target type; an empty body is an error
    Typed,
    Custom(Arc<dyn BodyCodec>),
}

impl SerializationStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            SerializationStrategy::JsonTree => "json_tree",
            SerializationStrategy::Typed => "typed",
            SerializationStrategy::Custom(_) => "custom",
        }
    }

    /// Same strategy, comparing custom codecs by identity
    pub fn same_as(&self, other: &SerializationStrategy) -> bool {
        match (self, other) {
            (SerializationStrategy::Custom(a), SerializationStrategy::Custom(b)) => {
                Arc::ptr_eq(a, b)
            }
            (a, b) => a.name() == b.name(),
        }
    }
}

#[derive(Debug, Default)]
pub struct JsonTreeCodec;

impl BodyCodec for JsonTreeCodec {
    fn content_type(&self) -> &str {
        "application/json"
    }

    fn encode(&self, value: &JsonValue) -> ClientResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> ClientResult<JsonValue> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JsonValue::Null);
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[derive(Debug, Default)]
pub struct YamlCodec;

impl BodyCodec for YamlCodec {
    fn content_type(&self) -> &str {
        "application/yaml"
    }

    fn encode(&self, value: &JsonValue) -> ClientResult<Vec<u8>> {
        Ok(serde_yaml::to_string(value)?.into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> ClientResult<JsonValue> {
        Ok(serde_yaml::from_slice(bytes)?)
    }
}

#[derive(Debug)]
enum CodecKind {
    Tree(Arc<dyn BodyCodec>),
    Typed,
}

/// The converter a handle holds
#[derive(Debug)]
pub struct Codec {
    strategy: SerializationStrategy,
    kind: CodecKind,
}

impl Codec {
    pub fn json_tree() -> Self {
        Self {
            strategy: SerializationStrategy::JsonTree,
            kind: CodecKind::Tree(Arc::new(JsonTreeCodec)),
        }
    }

    pub fn typed() -> Self {
        Self {
            strategy: SerializationStrategy::Typed,
            kind: CodecKind::Typed,
        }
    }

    pub fn custom(codec: Arc<dyn BodyCodec>) -> Self {
        Self {
            strategy: SerializationStrategy::Custom(codec.clone()),
            kind: CodecKind::Tree(codec),
        }
    }

    pub fn strategy(&self) -> &SerializationStrategy {
        &self.strategy
    }

    pub fn content_type(&self) -> &str {
        match &self.kind {
            CodecKind::Tree(codec) => codec.content_type(),
            CodecKind::Typed => "application/json",
        }
    }

    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> ClientResult<Vec<u8>> {
        match &self.kind {
            CodecKind::Tree(codec) => codec.encode(&serde_json::to_value(value)?),
            CodecKind::Typed => Ok(serde_json::to_vec(value)?),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> ClientResult<T> {
        match &self.kind {
            CodecKind::Tree(codec) => Ok(serde_json::from_value(codec.decode(bytes)?)?),
            CodecKind::Typed => {
                if bytes.is_empty() {
                    return Err(ClientError::Serialization(serde::de::Error::custom(
                        "empty response body",
                    )));
                }
                Ok(serde_json::from_slice(bytes)?)
            }
        }
    }
}
