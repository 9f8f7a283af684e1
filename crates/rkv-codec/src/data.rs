use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CodecError, CodecResult};

/// An object payload as the application sees it.
#[derive(Clone, Debug, PartialEq)]
pub enum Data {
    /// Raw bytes: binary objects, or stored bytes no codec could interpret.
    Binary(Vec<u8>),
    /// Plain text.
    Text(String),
    /// A structured JSON document.
    Json(serde_json::Value),
}

impl Data {
    /// Serialize any value into a JSON payload.
    pub fn json<T: Serialize>(value: &T) -> CodecResult<Self> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// Deserialize a JSON payload into a typed value.
    pub fn to_typed<T: DeserializeOwned>(&self) -> CodecResult<T> {
        match self {
            Self::Json(v) => {
                serde_json::from_value(v.clone()).map_err(|e| CodecError::Decode(e.to_string()))
            }
            Self::Text(s) => serde_json::from_str(s).map_err(|e| CodecError::Decode(e.to_string())),
            Self::Binary(b) => {
                serde_json::from_slice(b).map_err(|e| CodecError::Decode(e.to_string()))
            }
        }
    }

    /// The payload as bytes, if it is already bytes or text.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(b) => Some(b),
            Self::Text(s) => Some(s.as_bytes()),
            Self::Json(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of the variant, for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Binary(_) => "binary",
            Self::Text(_) => "text",
            Self::Json(_) => "json",
        }
    }
}

impl From<Vec<u8>> for Data {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<&[u8]> for Data {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

impl From<String> for Data {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Data {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Data {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}
