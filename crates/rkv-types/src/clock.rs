use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque causality token attached to a stored object.
///
/// The client never interprets a vector clock. It is received from the
/// server on reads and writes and must be handed back verbatim on the next
/// write so the server can tell a descendant write from a concurrent one.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VectorClock(String);

impl VectorClock {
    /// Wrap a token exactly as the server sent it.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token as received.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume and return the raw token.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VectorClock({})", self.0)
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VectorClock {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for VectorClock {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl PartialEq<&str> for VectorClock {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Lightweight identifier of one sibling version.
///
/// Returned by the server when it reports conflicting versions without
/// their contents; each tag can be fetched individually later.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionTag({})", self.0)
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for VersionTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}
