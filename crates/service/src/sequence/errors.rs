use thiserror::Error;

use models::sequence_key::InvalidSequenceKey;

/// Business errors for sequence allocation
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("unknown sequence key: {0}")]
    InvalidKey(String),
    #[error("counter store unavailable: {0}")]
    StoreUnavailable(String),
}

impl SequenceError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            SequenceError::InvalidKey(_) => 2001,
            SequenceError::StoreUnavailable(_) => 2101,
        }
    }

    pub(crate) fn store(e: sea_orm::DbErr) -> Self {
        SequenceError::StoreUnavailable(e.to_string())
    }
}

impl From<InvalidSequenceKey> for SequenceError {
    fn from(e: InvalidSequenceKey) -> Self {
        SequenceError::InvalidKey(e.0)
    }
}
