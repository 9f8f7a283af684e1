use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Number of replicas that must answer a read, write, durable write or
/// delete before the server reports success.
///
/// Symbolic values are resolved by the server against the bucket's
/// replication factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "QuorumRepr", into = "QuorumRepr")]
pub enum Quorum {
    /// A single replica.
    One,
    /// A majority of replicas.
    Quorum,
    /// Every replica.
    All,
    /// Whatever the server has configured for the bucket.
    Default,
    /// An explicit replica count.
    N(u32),
}

impl Quorum {
    /// The symbolic or numeric wire representation.
    pub fn as_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Quorum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::One => write!(f, "one"),
            Self::Quorum => write!(f, "quorum"),
            Self::All => write!(f, "all"),
            Self::Default => write!(f, "default"),
            Self::N(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for Quorum {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one" => Ok(Self::One),
            "quorum" => Ok(Self::Quorum),
            "all" => Ok(Self::All),
            "default" => Ok(Self::Default),
            other => other
                .parse::<u32>()
                .map(Self::N)
                .map_err(|_| TypeError::InvalidQuorum(s.to_string())),
        }
    }
}

impl From<u32> for Quorum {
    fn from(n: u32) -> Self {
        Self::N(n)
    }
}

/// Serde shape: either a symbolic name or a bare integer.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum QuorumRepr {
    Count(u32),
    Named(String),
}

impl TryFrom<QuorumRepr> for Quorum {
    type Error = TypeError;

    fn try_from(repr: QuorumRepr) -> Result<Self, Self::Error> {
        match repr {
            QuorumRepr::Count(n) => Ok(Self::N(n)),
            QuorumRepr::Named(name) => name.parse(),
        }
    }
}

impl From<Quorum> for QuorumRepr {
    fn from(q: Quorum) -> Self {
        match q {
            Quorum::N(n) => Self::Count(n),
            other => Self::Named(other.to_string()),
        }
    }
}
