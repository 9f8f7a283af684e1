//! The sibling list shared by every member of a conflict group.
//!
//! When the server returns N concurrent versions of a key, the client builds
//! one [`SharedSiblingGroup`] holding N slots. Every [`DataObject`] built
//! from the group holds a handle to the same slots, so resolving a pending
//! slot through any member is visible to all of them.
//!
//! Members are independent owned values: they share the slot list, never
//! each other's fields.
//!
//! [`DataObject`]: crate::DataObject

use std::fmt;
use std::sync::{Arc, RwLock};

use rkv_codec::Data;
use rkv_types::{Metadata, VectorClock, VersionTag};

/// Contents of a materialized sibling.
#[derive(Clone, Debug, PartialEq)]
pub struct SiblingVersion {
    pub vclock: Option<VectorClock>,
    pub metadata: Metadata,
    pub data: Option<Data>,
    pub exists: bool,
}

/// One entry of a sibling group.
#[derive(Clone, Debug, PartialEq)]
pub enum SiblingSlot {
    /// Known only by its tag; fetched on first access.
    Pending(VersionTag),
    /// Contents already on the client.
    Loaded(SiblingVersion),
}

impl SiblingSlot {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// Reference-counted, mutably shared list of sibling slots.
///
/// Slot order is fixed at construction. Each member object records which
/// slot it occupies (if any) and presents the group with itself first.
#[derive(Clone, Default)]
pub struct SharedSiblingGroup {
    slots: Arc<RwLock<Vec<SiblingSlot>>>,
}

impl SharedSiblingGroup {
    pub fn new(slots: Vec<SiblingSlot>) -> Self {
        Self {
            slots: Arc::new(RwLock::new(slots)),
        }
    }

    /// A group of pending slots, one per tag.
    pub fn from_tags(tags: impl IntoIterator<Item = VersionTag>) -> Self {
        Self::new(tags.into_iter().map(SiblingSlot::Pending).collect())
    }

    pub fn len(&self) -> usize {
        self.slots.read().expect("sibling group lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of the slot at `index`.
    pub fn slot(&self, index: usize) -> Option<SiblingSlot> {
        self.slots
            .read()
            .expect("sibling group lock poisoned")
            .get(index)
            .cloned()
    }

    /// Number of slots still waiting to be fetched.
    pub fn pending_count(&self) -> usize {
        self.slots
            .read()
            .expect("sibling group lock poisoned")
            .iter()
            .filter(|s| s.is_pending())
            .count()
    }

    /// Replace the slot at `index` with fetched contents.
    ///
    /// Every member of the group observes the change.
    pub fn resolve(&self, index: usize, version: SiblingVersion) {
        let mut slots = self.slots.write().expect("sibling group lock poisoned");
        if let Some(slot) = slots.get_mut(index) {
            *slot = SiblingSlot::Loaded(version);
        }
    }

    /// Whether two handles refer to the same group.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slots, &other.slots)
    }

    /// Number of objects holding this group.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.slots)
    }
}

impl fmt::Debug for SharedSiblingGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSiblingGroup")
            .field("len", &self.len())
            .field("pending", &self.pending_count())
            .finish()
    }
}
