//! The interface between the object model and the wire.

use rkv_types::{Metadata, Quorum, VectorClock, VersionTag};
use serde_json::Value;

use crate::error::{TransportError, TransportResult};
use crate::response::ObjectResponse;

/// A write of one object version.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutRequest {
    pub bucket: String,
    /// `None` asks the server to assign a key.
    pub key: Option<String>,
    /// Clock of the version this write descends from, `None` for a fresh write.
    pub vclock: Option<VectorClock>,
    pub metadata: Metadata,
    /// Encoded payload.
    pub value: Vec<u8>,
    pub w: Quorum,
    pub dw: Quorum,
    /// Whether the reply should carry the stored versions.
    pub return_body: bool,
}

/// What the server sent back for a write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PutReply {
    /// Key the server stored under; set when it assigned one.
    pub key: Option<String>,
    /// Stored versions, present when the body was requested.
    pub body: Option<ObjectResponse>,
}

/// A read of one key, or of one specific version of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetRequest {
    pub bucket: String,
    pub key: String,
    pub r: Quorum,
    pub vtag: Option<VersionTag>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteRequest {
    pub bucket: String,
    pub key: String,
    pub rw: Quorum,
}

/// Issues requests against the store.
///
/// Implementations own connection handling, retries and wire parsing. Each
/// method is one round trip. Errors are returned as-is to the caller of the
/// object operation that issued the request.
pub trait Transport: Send + Sync {
    /// Write a version.
    fn put(&self, request: &PutRequest) -> TransportResult<PutReply>;

    /// Read a key, or one version of it when `vtag` is set.
    fn get(&self, request: &GetRequest) -> TransportResult<ObjectResponse>;

    /// Delete a key.
    fn delete(&self, request: &DeleteRequest) -> TransportResult<()>;

    /// Run a map/reduce job rendered as JSON.
    fn map_reduce(&self, _job: &Value) -> TransportResult<Value> {
        Err(TransportError::Unsupported("map/reduce".into()))
    }
}
