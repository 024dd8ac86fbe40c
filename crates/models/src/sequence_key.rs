use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of entity kinds that draw public IDs from the counter store.
///
/// One counter row exists per key; the canonical string form below is the
/// row's primary key. Adding an entity kind means adding a variant here —
/// there is no open-ended key space.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKey {
    Club,
    Deal,
    News,
    Entity,
    Role,
    Permission,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sequence key: {0}")]
pub struct InvalidSequenceKey(pub String);

impl SequenceKey {
    pub const ALL: [SequenceKey; 6] = [
        SequenceKey::Club,
        SequenceKey::Deal,
        SequenceKey::News,
        SequenceKey::Entity,
        SequenceKey::Role,
        SequenceKey::Permission,
    ];

    /// Canonical lowercase form, used as the counter row's primary key.
    pub fn as_str(&self) -> &'static str {
        match self {
            SequenceKey::Club => "club",
            SequenceKey::Deal => "deal",
            SequenceKey::News => "news",
            SequenceKey::Entity => "entity",
            SequenceKey::Role => "role",
            SequenceKey::Permission => "permission",
        }
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SequenceKey {
    type Err = InvalidSequenceKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "club" => Ok(SequenceKey::Club),
            "deal" => Ok(SequenceKey::Deal),
            "news" => Ok(SequenceKey::News),
            "entity" => Ok(SequenceKey::Entity),
            "role" => Ok(SequenceKey::Role),
            "permission" => Ok(SequenceKey::Permission),
            other => Err(InvalidSequenceKey(other.to_string())),
        }
    }
}
