//! Primary keys for persisted entities.
//!
//! A key is opaque on the wire: readers keep it as a string until the
//! concrete entity type is known, then parse it against that type's
//! [`KeyFormat`].

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How the primary key of an entity type is represented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyFormat {
    /// 64-bit integer keys (identity columns).
    #[default]
    Int,
    /// UUID keys.
    Guid,
    /// Free-form string keys.
    Text,
}

impl fmt::Display for KeyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Guid => "guid",
            Self::Text => "text",
        };
        f.write_str(name)
    }
}

/// The primary key of a saved entity.
///
/// Serializes to its primitive form: a JSON number for [`PrimaryKey::Int`],
/// a string otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PrimaryKey {
    Int(i64),
    Guid(Uuid),
    Text(String),
}

impl PrimaryKey {
    /// Parses a key from its wire string against the given format.
    pub fn parse(s: &str, format: KeyFormat) -> Result<Self, Error> {
        match format {
            KeyFormat::Int => s.trim().parse::<i64>().map(Self::Int).map_err(|_| {
                Error::InvalidKey {
                    format,
                    value: s.to_string(),
                }
            }),
            KeyFormat::Guid => Ok(Self::Guid(Uuid::parse_str(s)?)),
            KeyFormat::Text => {
                if s.is_empty() {
                    return Err(Error::InvalidKey {
                        format,
                        value: String::new(),
                    });
                }
                Ok(Self::Text(s.to_string()))
            }
        }
    }

    /// Returns the primitive JSON form used on the wire.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Guid(v) => serde_json::Value::String(v.to_string()),
            Self::Text(v) => serde_json::Value::String(v.clone()),
        }
    }
}

impl From<i64> for PrimaryKey {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<Uuid> for PrimaryKey {
    fn from(value: Uuid) -> Self {
        Self::Guid(value)
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Guid(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}
