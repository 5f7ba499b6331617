use ulid::Ulid;

use crate::model::Ms;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(Ulid),
    /// `start` must be before `end`, inside the accepted range and at most a day long.
    InvalidSpan { start: Ms, end: Ms },
    /// A required text column was blank.
    Blank(&'static str),
    LimitExceeded(&'static str),
    WalError(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound(id) => write!(f, "not found: {id}"),
            StoreError::InvalidSpan { start, end } => {
                write!(f, "invalid time range [{start}, {end})")
            }
            StoreError::Blank(column) => write!(f, "{column} must not be empty"),
            StoreError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
            StoreError::WalError(e) => write!(f, "WAL error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}
