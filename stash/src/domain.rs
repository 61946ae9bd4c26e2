use shared::{Key, Result};
use std::fmt;
use std::time::Duration;

/// Sentinel a backend hands back from `initialise` once it is ready for traffic
pub const READINESS_TOKEN: &str = "PONG";

/// Structured record payload
pub type ValueMap = serde_json::Map<String, serde_json::Value>;

/// A record value: either a scalar string or a structured mapping, never both
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Scalar(String),
    Map(ValueMap),
}

impl Value {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(m) => Some(m),
            Value::Scalar(_) => None,
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Scalar(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Scalar(value.to_string())
    }
}

impl From<ValueMap> for Value {
    fn from(value: ValueMap) -> Self {
        Value::Map(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub key: Key,
    pub value: Value,
}

impl Record {
    pub fn new(key: impl AsRef<str>, value: impl Into<Value>) -> Result<Self> {
        Ok(Self {
            key: Key::new(key)?,
            value: value.into(),
        })
    }
}

/// A scalar record that is deleted once `ttl` has elapsed after it is stored
#[derive(Clone, Debug, PartialEq)]
pub struct ExpiringRecord {
    pub key: Key,
    pub value: String,
    pub ttl: Duration,
}

impl ExpiringRecord {
    pub fn new(key: impl AsRef<str>, value: impl Into<String>, ttl: Duration) -> Result<Self> {
        Ok(Self {
            key: Key::new(key)?,
            value: value.into(),
            ttl,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    InProcess,
    KeyValue,
    Document,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendKind::InProcess => "in-process",
            BackendKind::KeyValue => "key-value",
            BackendKind::Document => "document",
        };
        f.write_str(name)
    }
}

pub mod response {

    #[derive(Clone, Debug)]
    pub struct PutResponse {
        pub stored: bool,
        pub message: String,
    }

    impl PutResponse {
        pub fn new(stored: bool, message: impl Into<String>) -> Self {
            Self {
                stored,
                message: message.into(),
            }
        }
    }

    /// A successful read. Absent keys never produce a response; they come
    /// back as `Error::NotFound`, so `found` is always true here.
    #[derive(Clone, Debug)]
    pub struct GetResponse<V> {
        pub found: bool,
        pub value: V,
    }

    impl<V> GetResponse<V> {
        pub fn new(value: V) -> Self {
            Self { found: true, value }
        }
    }

    /// `deleted` reports success and holds even when nothing was stored;
    /// `existed` tells whether a value was actually removed
    #[derive(Clone, Debug)]
    pub struct DeleteResponse {
        pub deleted: bool,
        pub existed: bool,
    }

    impl DeleteResponse {
        pub fn new(existed: bool) -> Self {
            Self {
                deleted: true,
                existed,
            }
        }
    }
}
