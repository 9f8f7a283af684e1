use thiserror::Error;

/// Errors from the encode/decode pipeline.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// No codec is registered for the content type and the payload is not
    /// plain text or raw bytes.
    #[error("no encoder for non-string data with content type {content_type}")]
    UnencodableData { content_type: String },

    /// A registered codec rejected the value.
    #[error("encode failed: {0}")]
    Encode(String),

    /// A registered codec rejected the bytes.
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
