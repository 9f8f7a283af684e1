use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rkv_types::{CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT};
use tracing::{debug, warn};

use crate::codec::{Codec, JsonCodec, TextCodec};
use crate::data::Data;
use crate::error::{CodecError, CodecResult};

/// Reduce a content type to its lowercase media type, dropping parameters.
///
/// `"Application/JSON; charset=utf-8"` becomes `"application/json"`.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Content-type keyed table of codecs.
///
/// Cloning is cheap: codecs are shared behind `Arc`.
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: HashMap<String, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// A registry with the JSON and plain text codecs installed.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(CONTENT_TYPE_JSON, JsonCodec);
        registry.register(CONTENT_TYPE_TEXT, TextCodec);
        registry
    }

    /// A registry with no codecs; every lookup falls back.
    pub fn empty() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// Install (or replace) the codec for a content type.
    pub fn register(&mut self, content_type: &str, codec: impl Codec + 'static) {
        self.codecs
            .insert(normalize_content_type(content_type), Arc::new(codec));
    }

    /// Remove the codec for a content type. Returns `true` if one was installed.
    pub fn unregister(&mut self, content_type: &str) -> bool {
        self.codecs
            .remove(&normalize_content_type(content_type))
            .is_some()
    }

    /// Look up the codec for a content type.
    pub fn get(&self, content_type: &str) -> Option<Arc<dyn Codec>> {
        self.codecs.get(&normalize_content_type(content_type)).cloned()
    }

    pub fn contains(&self, content_type: &str) -> bool {
        self.codecs.contains_key(&normalize_content_type(content_type))
    }

    /// Encode a payload for storage under `content_type`.
    ///
    /// Without a registered codec, text and raw bytes are stored as-is and
    /// any other payload is rejected.
    pub fn encode(&self, data: &Data, content_type: Option<&str>) -> CodecResult<Vec<u8>> {
        let content_type = content_type.unwrap_or_default();
        if let Some(codec) = self.get(content_type) {
            return codec.encode(data);
        }
        match data.as_bytes() {
            Some(bytes) => {
                debug!(content_type, kind = data.kind(), "no encoder registered, storing raw bytes");
                Ok(bytes.to_vec())
            }
            None => Err(CodecError::UnencodableData {
                content_type: content_type.to_string(),
            }),
        }
    }

    /// Decode stored bytes read under `content_type`.
    ///
    /// Never fails: an unknown content type, or bytes the registered codec
    /// rejects, yield [`Data::Binary`] holding the input unchanged.
    pub fn decode(&self, bytes: &[u8], content_type: Option<&str>) -> Data {
        let content_type = content_type.unwrap_or_default();
        let Some(codec) = self.get(content_type) else {
            return Data::Binary(bytes.to_vec());
        };
        match codec.decode(bytes) {
            Ok(data) => data,
            Err(e) => {
                warn!(content_type, error = %e, "decoder rejected stored bytes, keeping raw payload");
                Data::Binary(bytes.to_vec())
            }
        }
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&String> = self.codecs.keys().collect();
        types.sort();
        f.debug_struct("CodecRegistry")
            .field("content_types", &types)
            .finish()
    }
}
