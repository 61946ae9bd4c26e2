// shared/src/lib.rs

use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("value @ key '{0}' - not found")]
    NotFound(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("write failure: {0}")]
    WriteFailure(String),
    #[error("key must not be empty")]
    InvalidKey,
    #[error("internal: {0}")]
    Internal(String),
}

impl Error {
    /// Absence is an ordinary outcome; callers use this to tell it apart from a failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A record key, case-folded to uppercase for storage and lookup.
///
/// Construction rejects empty keys, and normalizing an already normalized
/// key leaves it unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref();
        if raw.is_empty() {
            return Err(Error::InvalidKey);
        }
        Ok(Self(raw.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Key {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Key::new(value)
    }
}

impl TryFrom<String> for Key {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Key::new(value)
    }
}

pub mod config;
