//! Encode/decode pipeline for rkv payloads.
//!
//! Objects hold application values ([`Data`]); the server stores bytes.
//! A [`CodecRegistry`] maps content types to [`Codec`] implementations and
//! applies the fallback rules when no codec is registered:
//!
//! - **encode** is strict: text and raw bytes pass through, anything else
//!   without a codec is rejected with [`CodecError::UnencodableData`].
//! - **decode** is permissive: bytes the client cannot interpret are kept
//!   as [`Data::Binary`] for the application to handle.

pub mod codec;
pub mod data;
pub mod error;
pub mod registry;

pub use codec::{Codec, JsonCodec, TextCodec};
pub use data::Data;
pub use error::{CodecError, CodecResult};
pub use registry::{normalize_content_type, CodecRegistry};
