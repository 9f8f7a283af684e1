use crate::data::Data;
use crate::error::{CodecError, CodecResult};

/// Converts between application values and stored bytes for one content type.
pub trait Codec: Send + Sync {
    /// Encode a value into the bytes sent to the server.
    fn encode(&self, data: &Data) -> CodecResult<Vec<u8>>;

    /// Decode bytes read from the server into a value.
    fn decode(&self, bytes: &[u8]) -> CodecResult<Data>;
}

/// `application/json` codec backed by `serde_json`.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, data: &Data) -> CodecResult<Vec<u8>> {
        match data {
            Data::Json(v) => serde_json::to_vec(v).map_err(|e| CodecError::Encode(e.to_string())),
            Data::Text(s) => serde_json::to_vec(s).map_err(|e| CodecError::Encode(e.to_string())),
            Data::Binary(_) => Err(CodecError::Encode(
                "binary payload cannot be encoded as JSON".into(),
            )),
        }
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Data> {
        serde_json::from_slice(bytes)
            .map(Data::Json)
            .map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// `text/plain` codec: UTF-8 in, UTF-8 out.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextCodec;

impl Codec for TextCodec {
    fn encode(&self, data: &Data) -> CodecResult<Vec<u8>> {
        match data {
            Data::Text(s) => Ok(s.as_bytes().to_vec()),
            Data::Binary(b) => Ok(b.clone()),
            Data::Json(serde_json::Value::String(s)) => Ok(s.as_bytes().to_vec()),
            Data::Json(_) => Err(CodecError::Encode(
                "structured JSON cannot be stored as text/plain".into(),
            )),
        }
    }

    fn decode(&self, bytes: &[u8]) -> CodecResult<Data> {
        String::from_utf8(bytes.to_vec())
            .map(Data::Text)
            .map_err(|e| CodecError::Decode(e.to_string()))
    }
}
