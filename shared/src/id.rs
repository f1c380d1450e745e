use serde::{Deserialize, Serialize};
use std::fmt;

/// A video or user identifier as it appears on the wire.
///
/// The browser app sends database row ids as numbers in some places and as
/// strings in others, so both forms are accepted and echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Int(i64),
    Text(String),
}

impl Id {
    /// Canonical string form used to key rooms.
    /// `42` and `"42"` map to the same key.
    pub fn room_key(&self) -> String {
        match self {
            Id::Int(n) => n.to_string(),
            Id::Text(s) => s.clone(),
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Int(n) => write!(f, "{}", n),
            Id::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Id {
    fn from(n: i64) -> Self {
        Id::Int(n)
    }
}

impl From<i32> for Id {
    fn from(n: i32) -> Self {
        Id::Int(n.into())
    }
}

impl From<u32> for Id {
    fn from(n: u32) -> Self {
        Id::Int(n.into())
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::Text(s.to_string())
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::Text(s)
    }
}

impl std::str::FromStr for Id {
    type Err = std::convert::Infallible;

    /// Parses digits as `Id::Int`, anything else as `Id::Text`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>().map(Id::Int).unwrap_or_else(|_| Id::Text(s.to_string())))
    }
}
