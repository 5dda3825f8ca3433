use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Opaque message identifier as the broker reports it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accepts the numeric ids the broker emits as well as string ids.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A managed object in the broker model, e.g. a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Model type name (`queue`, `exchange`, ...).
    pub kind: String,
    /// Names from the root of the hierarchy down to the object itself.
    pub path: Vec<String>,
}

impl ObjectRef {
    pub fn new(kind: impl Into<String>, path: Vec<String>) -> Self {
        Self {
            kind: kind.into(),
            path,
        }
    }

    pub fn queue(virtual_host_node: &str, virtual_host: &str, queue: &str) -> Self {
        Self::new(
            "queue",
            vec![
                virtual_host_node.to_string(),
                virtual_host.to_string(),
                queue.to_string(),
            ],
        )
    }

    /// Last path element, if any.
    pub fn name(&self) -> Option<&str> {
        self.path.last().map(String::as_str)
    }
}

/// Identifies one message instance on one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReference {
    pub id: MessageId,
    pub size_bytes: u64,
    pub mime_type: Option<String>,
}

impl MessageReference {
    pub fn new(id: impl Into<MessageId>) -> Self {
        Self {
            id: id.into(),
            size_bytes: 0,
            mime_type: None,
        }
    }
}

/// Whether header attributes are requested alongside the message info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchScope {
    HeadersIncluded,
    HeadersExcluded,
}

impl FetchScope {
    pub fn includes_headers(self) -> bool {
        matches!(self, Self::HeadersIncluded)
    }
}

/// Message info as returned by one metadata fetch. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageMetadata {
    reference: MessageReference,
    attributes: IndexMap<String, Value>,
}

impl MessageMetadata {
    pub const ID: &'static str = "id";
    pub const SIZE: &'static str = "size";
    pub const MIME_TYPE: &'static str = "mimeType";

    /// Interpret a `getMessageInfoById` response body.
    pub fn from_json(value: Value) -> Result<Self, ApiError> {
        let Value::Object(map) = value else {
            return Err(ApiError::Parse("message info is not a JSON object".into()));
        };
        let attributes: IndexMap<String, Value> = map.into_iter().collect();

        let id = attributes
            .get(Self::ID)
            .and_then(MessageId::from_json)
            .ok_or_else(|| ApiError::Parse("message info has no id".into()))?;
        let size_bytes = attributes
            .get(Self::SIZE)
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let mime_type = attributes
            .get(Self::MIME_TYPE)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        Ok(Self {
            reference: MessageReference {
                id,
                size_bytes,
                mime_type,
            },
            attributes,
        })
    }

    pub fn from_json_str(body: &str) -> Result<Self, ApiError> {
        let value = serde_json::from_str(body).map_err(|e| ApiError::Parse(e.to_string()))?;
        Self::from_json(value)
    }

    pub fn reference(&self) -> &MessageReference {
        &self.reference
    }

    pub fn id(&self) -> &MessageId {
        &self.reference.id
    }

    pub fn size_bytes(&self) -> u64 {
        self.reference.size_bytes
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.reference.mime_type.as_deref()
    }

    /// Attributes in the order the broker reported them.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Body returned by a limited content fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPayload {
    pub bytes: Vec<u8>,
    /// Full size as declared by the server, when it reports one.
    pub declared_size: Option<u64>,
}

impl ContentPayload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            declared_size: None,
        }
    }
}
