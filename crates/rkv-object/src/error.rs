use rkv_codec::CodecError;
use thiserror::Error;

/// Failures reported by a [`Transport`](crate::Transport).
///
/// Returned as-is to the caller of `store`, `reload`, `delete` or `sibling`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("server unavailable: {0}")]
    Unavailable(String),

    /// The server answered with something the transport could not use.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The request did not complete in time.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The transport does not implement the requested operation.
    #[error("operation not supported by this transport: {0}")]
    Unsupported(String),
}

/// Result alias for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors from data object operations.
#[derive(Debug, Error)]
pub enum ObjectError {
    /// Encoding was requested, no codec is registered for the content type,
    /// and the payload is not plain text or raw bytes.
    #[error("no encoder for non-string data with content type {content_type}")]
    UnencodableData { content_type: String },

    /// A raw response had a shape other than not-found, a version tag list,
    /// or a (vclock, contents) pair.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The operation needs a key and the object has none yet.
    #[error("object in bucket {bucket} has no key")]
    MissingKey { bucket: String },

    /// Sibling index past the end of the sibling set.
    #[error("sibling index {index} out of range (count {count})")]
    SiblingIndexOutOfRange { index: usize, count: usize },

    /// A map/reduce job was assembled inconsistently.
    #[error("invalid map/reduce job: {0}")]
    InvalidMapReduce(String),

    /// Configuration could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Codec failure other than a missing encoder.
    #[error("codec error: {0}")]
    Codec(CodecError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<CodecError> for ObjectError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::UnencodableData { content_type } => Self::UnencodableData { content_type },
            other => Self::Codec(other),
        }
    }
}

/// Result alias for data object operations.
pub type ObjectResult<T> = Result<T, ObjectError>;
