//! Typed references between stored objects.
//!
//! A [`Link`] is a (bucket, key, tag) triple. Links travel in the object's
//! metadata and on the HTTP interface as `Link` header entries of the form
//! `</riak/bucket/key>; riaktag="tag"`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Default URL prefix used when formatting link headers.
pub const DEFAULT_LINK_PREFIX: &str = "riak";

/// A reference from one object to another.
///
/// Two links are equal only when bucket, key and tag are all equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Bucket of the target object.
    pub bucket: String,
    /// Key of the target object.
    pub key: String,
    /// Relationship tag.
    pub tag: String,
}

impl Link {
    /// Create a link. An absent tag defaults to the target bucket name.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, tag: Option<&str>) -> Self {
        let bucket = bucket.into();
        let tag = tag.map(str::to_string).unwrap_or_else(|| bucket.clone());
        Self {
            bucket,
            key: key.into(),
            tag,
        }
    }

    /// Parse a single header entry such as `</riak/people/bob>; riaktag="friend"`.
    pub fn from_header_entry(entry: &str) -> TypeResult<Self> {
        let caps = header_regex()
            .captures(entry.trim())
            .ok_or_else(|| TypeError::InvalidLinkHeader(entry.trim().to_string()))?;
        Ok(Self {
            bucket: caps[2].to_string(),
            key: caps[3].to_string(),
            tag: caps[4].to_string(),
        })
    }

    /// Parse a full comma-separated `Link` header.
    ///
    /// Entries that are not object links (for instance the `rel="up"` link
    /// to the bucket itself) are skipped.
    pub fn parse_header(header: &str) -> Vec<Self> {
        header
            .split(',')
            .filter_map(|entry| Self::from_header_entry(entry).ok())
            .collect()
    }

    /// Format as a header entry under the given URL prefix.
    pub fn to_header(&self, prefix: &str) -> String {
        format!(
            "</{}/{}/{}>; riaktag=\"{}\"",
            prefix, self.bucket, self.key, self.tag
        )
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.bucket, self.key, self.tag)
    }
}

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^</([^/]+)/([^/]+)/([^/]+)>; ?riaktag="([^"]+)"$"#)
            .expect("link header pattern is valid")
    })
}

/// Ordered collection of links with no two equal entries.
///
/// Adding a link that is already present moves it to the end instead of
/// duplicating it. Removal preserves the order of the remaining links.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkSet {
    links: Vec<Link>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a link, first removing any equal link.
    pub fn add(&mut self, link: Link) {
        self.remove(&link);
        self.links.push(link);
    }

    /// Remove an equal link. Returns `true` if one was present.
    pub fn remove(&mut self, link: &Link) -> bool {
        let before = self.links.len();
        self.links.retain(|l| l != link);
        self.links.len() != before
    }

    pub fn contains(&self, link: &Link) -> bool {
        self.links.contains(link)
    }

    pub fn as_slice(&self) -> &[Link] {
        &self.links
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Link> {
        self.links.iter()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn clear(&mut self) {
        self.links.clear();
    }
}

impl FromIterator<Link> for LinkSet {
    fn from_iter<I: IntoIterator<Item = Link>>(iter: I) -> Self {
        let mut set = Self::new();
        for link in iter {
            set.add(link);
        }
        set
    }
}

impl Extend<Link> for LinkSet {
    fn extend<I: IntoIterator<Item = Link>>(&mut self, iter: I) {
        for link in iter {
            self.add(link);
        }
    }
}

impl<'a> IntoIterator for &'a LinkSet {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.iter()
    }
}
