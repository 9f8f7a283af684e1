//! The data object: one logical record and its conflicting versions.

use std::fmt;

use rkv_codec::Data;
use rkv_types::{Link, Metadata, VectorClock};
use serde_json::Value;
use tracing::debug;

use crate::bucket::Bucket;
use crate::client::Client;
use crate::error::{ObjectError, ObjectResult};
use crate::response::ObjectResponse;
use crate::siblings::{SharedSiblingGroup, SiblingSlot, SiblingVersion};

/// A group handle plus the slot this object occupies in it.
///
/// `slot` is `None` when the object holds no version of its own, which is
/// the case after the server answered with a bare list of version tags.
#[derive(Clone, Debug)]
pub(crate) struct Membership {
    pub(crate) group: SharedSiblingGroup,
    pub(crate) slot: Option<usize>,
}

/// A single logical record of a bucket.
///
/// Holds the key, metadata, payload and vector clock of one version. When
/// the server reports concurrent versions, this object is the primary and
/// the others are reachable through [`sibling`](Self::sibling) and
/// [`siblings`](Self::siblings).
///
/// A `DataObject` is a plain value owned by one caller at a time. The only
/// state it shares with other objects is its sibling group.
#[derive(Clone)]
pub struct DataObject {
    pub(crate) bucket: Bucket,
    pub(crate) key: Option<String>,
    pub(crate) encode_data: bool,
    pub(crate) vclock: Option<VectorClock>,
    pub(crate) metadata: Metadata,
    pub(crate) data: Option<Data>,
    pub(crate) exists: bool,
    pub(crate) siblings: Option<Membership>,
}

impl DataObject {
    pub(crate) fn new(bucket: Bucket, key: Option<String>) -> Self {
        Self {
            bucket,
            key,
            encode_data: true,
            vclock: None,
            metadata: Metadata::new(),
            data: None,
            exists: false,
            siblings: None,
        }
    }

    // ---- Identity ----

    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    pub fn client(&self) -> &Client {
        self.bucket.client()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub(crate) fn require_key(&self) -> ObjectResult<String> {
        self.key.clone().ok_or_else(|| ObjectError::MissingKey {
            bucket: self.bucket.name().to_string(),
        })
    }

    /// Whether the last read or write found a stored version.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// The causality token of the last read or write, if any.
    pub fn vclock(&self) -> Option<&VectorClock> {
        self.vclock.as_ref()
    }

    // ---- Payload ----

    pub fn data(&self) -> Option<&Data> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: impl Into<Data>) -> &mut Self {
        self.data = Some(data.into());
        self
    }

    /// Whether the payload runs through the bucket's codec registry.
    pub fn encode_data(&self) -> bool {
        self.encode_data
    }

    pub fn set_encode_data(&mut self, encode: bool) -> &mut Self {
        self.encode_data = encode;
        self
    }

    /// The payload as the bytes to send to the server.
    ///
    /// An object with no payload encodes to an empty body.
    pub fn encoded_data(&self) -> ObjectResult<Vec<u8>> {
        let Some(data) = &self.data else {
            return Ok(Vec::new());
        };
        if self.encode_data {
            return Ok(self.bucket.codecs().encode(data, self.content_type())?);
        }
        data.as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ObjectError::UnencodableData {
                content_type: self.content_type().unwrap_or_default().to_string(),
            })
    }

    /// Set the payload from stored bytes. Set the metadata first: the
    /// content type selects the decoder.
    pub fn set_encoded_data(&mut self, bytes: &[u8]) -> &mut Self {
        let data = if self.encode_data {
            self.bucket.codecs().decode(bytes, self.content_type())
        } else {
            Data::Binary(bytes.to_vec())
        };
        self.data = Some(data);
        self
    }

    // ---- Metadata ----

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    pub fn set_metadata(&mut self, metadata: Metadata) -> &mut Self {
        self.metadata = metadata;
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.metadata.content_type()
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) -> &mut Self {
        self.metadata.content_type = Some(content_type.into());
        self
    }

    // ---- Links ----

    /// Add a link, replacing an equal one.
    pub fn add_link(&mut self, link: Link) -> &mut Self {
        self.metadata.links.add(link);
        self
    }

    /// Add a link to another object. The tag defaults to the target's
    /// bucket name.
    pub fn add_link_to(&mut self, target: &DataObject, tag: Option<&str>) -> ObjectResult<&mut Self> {
        let link = target.link_to_self(tag)?;
        Ok(self.add_link(link))
    }

    /// Remove an equal link; absent links are ignored.
    pub fn remove_link(&mut self, link: &Link) -> &mut Self {
        self.metadata.links.remove(link);
        self
    }

    pub fn remove_link_to(&mut self, target: &DataObject, tag: Option<&str>) -> ObjectResult<&mut Self> {
        let link = target.link_to_self(tag)?;
        Ok(self.remove_link(&link))
    }

    pub fn links(&self) -> &[Link] {
        self.metadata.links.as_slice()
    }

    /// Append the links found in a `Link` header.
    pub fn populate_links(&mut self, header: &str) -> &mut Self {
        self.metadata.links.extend(Link::parse_header(header));
        self
    }

    /// Render the links as a `Link` header using the client's link prefix.
    pub fn link_header(&self) -> String {
        let prefix = &self.client().config().link_prefix;
        self.links()
            .iter()
            .map(|l| l.to_header(prefix))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn link_to_self(&self, tag: Option<&str>) -> ObjectResult<Link> {
        Ok(Link::new(self.bucket.name(), self.require_key()?, tag))
    }

    // ---- State ----

    /// Reset to the non-existent state: no payload, no vector clock, no
    /// siblings. Metadata is kept.
    pub fn clear(&mut self) -> &mut Self {
        self.data = None;
        self.exists = false;
        self.vclock = None;
        self.siblings = None;
        self
    }

    /// Replace this object's state with a server response.
    ///
    /// Always clears first. A [`ObjectResponse::Versions`] with several
    /// contents makes the first one this object's version and the rest
    /// siblings sharing one [`SharedSiblingGroup`].
    pub fn populate(&mut self, response: ObjectResponse) -> &mut Self {
        self.clear();
        match response {
            ObjectResponse::NotFound => {}
            ObjectResponse::Siblings(tags) => {
                debug!(bucket = self.bucket.name(), key = ?self.key, count = tags.len(), "populated version tags");
                self.set_siblings(SharedSiblingGroup::from_tags(tags), None);
            }
            ObjectResponse::Versions { vclock, contents } => {
                self.vclock = Some(vclock);
                let mut contents = contents.into_iter();
                let Some(first) = contents.next() else {
                    return self;
                };
                self.exists = true;
                self.metadata = first.metadata;
                self.set_encoded_data(&first.value);

                let mut slots = vec![SiblingSlot::Loaded(self.snapshot())];
                for content in contents {
                    let mut sibling = self.template();
                    sibling.exists = true;
                    sibling.metadata = content.metadata;
                    sibling.set_encoded_data(&content.value);
                    slots.push(SiblingSlot::Loaded(sibling.snapshot()));
                }
                if slots.len() > 1 {
                    debug!(bucket = self.bucket.name(), key = ?self.key, count = slots.len(), "populated conflicting versions");
                }
                self.set_siblings(SharedSiblingGroup::new(slots), Some(0));
            }
        }
        self
    }

    /// Populate from a loosely typed JSON response.
    pub fn populate_json(&mut self, raw: &Value) -> ObjectResult<&mut Self> {
        let response = ObjectResponse::from_json(raw)?;
        Ok(self.populate(response))
    }

    // ---- Siblings ----

    /// Join a sibling group, occupying `own_slot` if given.
    ///
    /// This object is always presented first in its sibling view. A group
    /// with at most one slot means there is no conflict, and the object
    /// ends up with no siblings at all.
    pub fn set_siblings(&mut self, group: SharedSiblingGroup, own_slot: Option<usize>) -> &mut Self {
        let own_slot = own_slot.filter(|&s| s < group.len());
        self.siblings = if group.len() > 1 {
            Some(Membership {
                group,
                slot: own_slot,
            })
        } else {
            None
        };
        self
    }

    /// The shared group, when this object is part of a conflict.
    pub fn sibling_group(&self) -> Option<&SharedSiblingGroup> {
        self.siblings.as_ref().map(|m| &m.group)
    }

    /// Number of versions other than this one.
    pub fn sibling_count(&self) -> usize {
        match &self.siblings {
            Some(m) => m.group.len() - usize::from(m.slot.is_some()),
            None => 0,
        }
    }

    pub fn has_siblings(&self) -> bool {
        self.sibling_count() > 0
    }

    /// Whether both objects stand for the same slot of the same group.
    pub fn is_same_sibling(&self, other: &DataObject) -> bool {
        match (&self.siblings, &other.siblings) {
            (Some(a), Some(b)) => a.group.ptr_eq(&b.group) && a.slot.is_some() && a.slot == b.slot,
            _ => false,
        }
    }

    /// Map sibling number `index` (this object excluded) to a group slot.
    pub(crate) fn group_index(&self, index: usize) -> ObjectResult<(SharedSiblingGroup, usize)> {
        let count = self.sibling_count();
        let out_of_range = ObjectError::SiblingIndexOutOfRange { index, count };
        let membership = self.siblings.as_ref().ok_or(out_of_range)?;
        let slot = (0..membership.group.len())
            .filter(|&s| Some(s) != membership.slot)
            .nth(index)
            .ok_or(ObjectError::SiblingIndexOutOfRange { index, count })?;
        Ok((membership.group.clone(), slot))
    }

    /// This object's version, as stored in a sibling slot.
    pub(crate) fn snapshot(&self) -> SiblingVersion {
        SiblingVersion {
            vclock: self.vclock.clone(),
            metadata: self.metadata.clone(),
            data: self.data.clone(),
            exists: self.exists,
        }
    }

    /// A detached copy sharing identity and codec settings but no group.
    fn template(&self) -> DataObject {
        DataObject {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
            encode_data: self.encode_data,
            vclock: self.vclock.clone(),
            metadata: Metadata::new(),
            data: None,
            exists: false,
            siblings: None,
        }
    }

    /// Build the member object for a loaded slot.
    pub(crate) fn member(&self, version: SiblingVersion, group: SharedSiblingGroup, slot: usize) -> DataObject {
        let mut obj = self.template();
        obj.vclock = version.vclock;
        obj.metadata = version.metadata;
        obj.data = version.data;
        obj.exists = version.exists;
        obj.siblings = Some(Membership {
            group,
            slot: Some(slot),
        });
        obj
    }
}

impl fmt::Debug for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataObject")
            .field("bucket", &self.bucket.name())
            .field("key", &self.key)
            .field("exists", &self.exists)
            .field("vclock", &self.vclock)
            .field("content_type", &self.content_type())
            .field("data", &self.data)
            .field("sibling_count", &self.sibling_count())
            .finish()
    }
}
