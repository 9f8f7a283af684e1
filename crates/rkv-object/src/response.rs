//! Response shapes the transport hands to [`DataObject::populate`](crate::DataObject::populate).

use rkv_types::{Metadata, VectorClock, VersionTag};
use serde_json::Value;

use crate::error::{ObjectError, ObjectResult};

/// One stored version: its metadata and its encoded payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Content {
    pub metadata: Metadata,
    pub value: Vec<u8>,
}

impl Content {
    pub fn new(metadata: Metadata, value: impl Into<Vec<u8>>) -> Self {
        Self {
            metadata,
            value: value.into(),
        }
    }
}

/// What the server said about a key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectResponse {
    /// The key does not exist.
    NotFound,
    /// The key has conflicting versions; only their tags were sent.
    Siblings(Vec<VersionTag>),
    /// One or more versions sharing a vector clock. More than one entry
    /// means the versions are concurrent siblings; the first is primary.
    Versions {
        vclock: VectorClock,
        contents: Vec<Content>,
    },
}

impl ObjectResponse {
    /// Shorthand for a single, non-conflicting version.
    pub fn single(vclock: impl Into<VectorClock>, content: Content) -> Self {
        Self::Versions {
            vclock: vclock.into(),
            contents: vec![content],
        }
    }

    /// Interpret a loosely typed response, as produced by transports that
    /// speak JSON:
    ///
    /// - `null` is not-found,
    /// - an array of strings is a list of version tags,
    /// - `[vclock, [[metadata, payload], ...]]` is a set of versions, where
    ///   `payload` is a string or an array of byte values.
    ///
    /// Anything else is a [`ObjectError::MalformedResponse`].
    pub fn from_json(raw: &Value) -> ObjectResult<Self> {
        match raw {
            Value::Null => Ok(Self::NotFound),
            Value::Array(items) if items.iter().all(Value::is_string) => Ok(Self::Siblings(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(VersionTag::from)
                    .collect(),
            )),
            Value::Array(items) if items.len() == 2 => {
                let vclock = items[0].as_str().ok_or_else(|| {
                    ObjectError::MalformedResponse(format!("vclock is not a string: {}", items[0]))
                })?;
                let entries = items[1].as_array().ok_or_else(|| {
                    ObjectError::MalformedResponse(format!("contents is not a list: {}", items[1]))
                })?;
                let contents = entries
                    .iter()
                    .map(content_from_json)
                    .collect::<ObjectResult<Vec<_>>>()?;
                Ok(Self::Versions {
                    vclock: VectorClock::from(vclock),
                    contents,
                })
            }
            other => Err(ObjectError::MalformedResponse(format!(
                "do not know how to handle {}",
                json_kind(other)
            ))),
        }
    }
}

fn content_from_json(entry: &Value) -> ObjectResult<Content> {
    let pair = entry
        .as_array()
        .filter(|p| p.len() == 2)
        .ok_or_else(|| ObjectError::MalformedResponse(format!("content is not a pair: {entry}")))?;
    let metadata: Metadata = serde_json::from_value(pair[0].clone())
        .map_err(|e| ObjectError::MalformedResponse(format!("bad metadata: {e}")))?;
    let value = match &pair[1] {
        Value::String(s) => s.as_bytes().to_vec(),
        bytes @ Value::Array(_) => serde_json::from_value::<Vec<u8>>(bytes.clone())
            .map_err(|e| ObjectError::MalformedResponse(format!("bad payload bytes: {e}")))?,
        other => {
            return Err(ObjectError::MalformedResponse(format!(
                "payload is a {}",
                json_kind(other)
            )))
        }
    };
    Ok(Content { metadata, value })
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
