//! Foundation types for rkv.
//!
//! This crate provides the small value types shared by every other rkv
//! crate. None of them perform I/O; they are assembled, compared and stored
//! by the object model in `rkv-object`.
//!
//! # Key Types
//!
//! - [`VectorClock`] -- Opaque causality token handed back to the server on writes
//! - [`VersionTag`] -- Identifier for one sibling version, fetched on demand
//! - [`Quorum`] -- Replica count for r/w/dw/rw parameters
//! - [`Link`] / [`LinkSet`] -- Typed (bucket, key, tag) references between objects
//! - [`Metadata`] -- Content type, links and free-form entries of one version

pub mod clock;
pub mod error;
pub mod link;
pub mod metadata;
pub mod quorum;

pub use clock::{VectorClock, VersionTag};
pub use error::{TypeError, TypeResult};
pub use link::{Link, LinkSet};
pub use metadata::{Metadata, CONTENT_TYPE_BINARY, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT};
pub use quorum::Quorum;
