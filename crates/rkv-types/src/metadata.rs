use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::VersionTag;
use crate::link::LinkSet;

/// Content type of JSON documents. New objects default to it.
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// Content type of plain text.
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
/// Content type of opaque binary objects.
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Metadata of one stored version.
///
/// Every version returned by the server carries its own metadata, so
/// siblings may disagree on content type or links.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Declared media type of the payload. Selects the codec.
    #[serde(rename = "content-type", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Character set, when the server reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    /// Server-assigned tag of this version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vtag: Option<VersionTag>,
    /// Last-modified timestamp as the server formats it.
    #[serde(rename = "last-modified", default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    /// Links to other objects.
    #[serde(default, skip_serializing_if = "LinkSet::is_empty")]
    pub links: LinkSet,
    /// Application-defined metadata entries.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub usermeta: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata with only a content type set.
    pub fn with_content_type(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            ..Self::default()
        }
    }

    /// Builder-style helper for attaching a user metadata entry.
    pub fn with_usermeta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.usermeta.insert(key.into(), value.into());
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}
