//! Client-side object model for rkv.
//!
//! A [`DataObject`] is one record of a bucket as seen by the client: its key,
//! metadata, decoded payload and the vector clock of the version it was read
//! at. When the server holds concurrent versions of a key, the object exposes
//! them as siblings that share one [`SharedSiblingGroup`].
//!
//! # Round Trips
//!
//! Every state change that talks to the server goes through the
//! [`Transport`] trait, one request per call:
//!
//! - [`DataObject::store`] -- write, handing back the vector clock
//! - [`DataObject::reload`] -- re-read the key or one version of it
//! - [`DataObject::delete`] -- delete and clear locally
//! - [`DataObject::sibling`] -- fetch a sibling known only by its tag
//!
//! # Backends
//!
//! - [`InMemoryTransport`] -- single-process store with server-side
//!   causality rules, for tests and simulation
//!
//! # Rules
//!
//! 1. A failed `store` leaves the object as it was.
//! 2. `reload` clears before reading; `delete` clears whatever the outcome.
//! 3. Each sibling is fetched at most once per group.
//! 4. Transport errors reach the caller unchanged.

pub mod bucket;
pub mod client;
pub mod config;
pub mod error;
pub mod mapreduce;
pub mod memory;
pub mod object;
pub mod ops;
pub mod response;
pub mod siblings;
pub mod transport;

pub use bucket::Bucket;
pub use client::{Client, ResolveLink};
pub use config::{BucketOverride, BucketProps, ClientConfig};
pub use error::{ObjectError, ObjectResult, TransportError, TransportResult};
pub use mapreduce::{Function, MapReduce, Phase};
pub use memory::{InMemoryTransport, TransportCall};
pub use object::DataObject;
pub use response::{Content, ObjectResponse};
pub use siblings::{SharedSiblingGroup, SiblingSlot, SiblingVersion};
pub use transport::{DeleteRequest, GetRequest, PutReply, PutRequest, Transport};
