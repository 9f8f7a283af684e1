use std::collections::BTreeMap;
use std::path::Path;

use rkv_types::link::DEFAULT_LINK_PREFIX;
use rkv_types::Quorum;
use serde::{Deserialize, Serialize};

use crate::error::{ObjectError, ObjectResult};

/// Quorum defaults applied when an operation does not name one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketProps {
    /// Read quorum.
    pub r: Quorum,
    /// Write quorum.
    pub w: Quorum,
    /// Durable write quorum.
    pub dw: Quorum,
    /// Delete quorum.
    pub rw: Quorum,
}

impl Default for BucketProps {
    fn default() -> Self {
        Self {
            r: Quorum::N(2),
            w: Quorum::N(2),
            dw: Quorum::N(2),
            rw: Quorum::N(2),
        }
    }
}

/// Per-bucket quorum overrides. Unset fields inherit the client defaults.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<Quorum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub w: Option<Quorum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dw: Option<Quorum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rw: Option<Quorum>,
}

impl BucketOverride {
    fn apply(&self, base: BucketProps) -> BucketProps {
        BucketProps {
            r: self.r.unwrap_or(base.r),
            w: self.w.unwrap_or(base.w),
            dw: self.dw.unwrap_or(base.dw),
            rw: self.rw.unwrap_or(base.rw),
        }
    }
}

/// Client-wide configuration.
///
/// ```toml
/// link_prefix = "riak"
///
/// [defaults]
/// r = "quorum"
/// w = 2
///
/// [buckets.sessions]
/// w = "one"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// URL prefix used when formatting link headers.
    pub link_prefix: String,
    /// Whether new objects run their payload through the codec registry.
    pub encode_data: bool,
    /// Quorums for buckets without overrides.
    pub defaults: BucketProps,
    /// Overrides keyed by bucket name.
    pub buckets: BTreeMap<String, BucketOverride>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            link_prefix: DEFAULT_LINK_PREFIX.to_string(),
            encode_data: true,
            defaults: BucketProps::default(),
            buckets: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Parse from TOML text. Missing fields take their defaults.
    pub fn from_toml_str(text: &str) -> ObjectResult<Self> {
        toml::from_str(text).map_err(|e| ObjectError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ObjectResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> ObjectResult<String> {
        toml::to_string(self).map_err(|e| ObjectError::Config(e.to_string()))
    }

    /// Effective quorums for one bucket.
    pub fn props_for(&self, bucket: &str) -> BucketProps {
        match self.buckets.get(bucket) {
            Some(over) => over.apply(self.defaults),
            None => self.defaults,
        }
    }
}
