use thiserror::Error;

/// Errors from parsing or constructing foundation types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// A quorum value could not be parsed.
    #[error("invalid quorum value: {0}")]
    InvalidQuorum(String),

    /// A link header entry did not match `</prefix/bucket/key>; riaktag="tag"`.
    #[error("invalid link header: {0}")]
    InvalidLinkHeader(String),
}

/// Result alias for foundation type operations.
pub type TypeResult<T> = Result<T, TypeError>;
