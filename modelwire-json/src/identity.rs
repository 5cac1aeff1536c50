//! The identity header: the leading `Type`/`id`/`isNew`/`ticks`/`toStr`
//! fields of an entity object.

use crate::error::{json_type, JsonError, Result};
use modelwire_types::Ticks;
use serde_json::Value;
use std::fmt;
use std::iter::Peekable;
use std::str::FromStr;

const HEADER_FIELDS: [&str; 5] = ["toStr", "id", "isNew", "Type", "ticks"];

/// Identity fields parsed from the head of a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityInfo {
    pub type_name: String,
    /// Kept as a string until the concrete type's key format is known.
    pub id: Option<String>,
    pub is_new: Option<bool>,
    pub ticks: Option<Ticks>,
    pub to_str: Option<String>,
}

impl IdentityInfo {
    /// Consumes header fields, in any order, up to the first field outside
    /// the header set. That field stays in `fields`.
    pub fn read<I>(fields: &mut Peekable<I>, path: &str) -> Result<Self>
    where
        I: Iterator<Item = (String, Value)>,
    {
        let mut type_name = None;
        let mut info = IdentityInfo::default();

        while let Some((name, value)) =
            fields.next_if(|(name, _)| HEADER_FIELDS.contains(&name.as_str()))
        {
            match name.as_str() {
                "toStr" => info.to_str = read_string(value, "toStr", path)?,
                "id" => info.id = read_string(value, "id", path)?,
                "isNew" => info.is_new = read_bool(value, path)?,
                "Type" => type_name = read_string(value, "Type", path)?,
                _ => info.ticks = read_ticks(value, path)?,
            }
        }

        info.type_name = type_name.ok_or_else(|| JsonError::MalformedHeader {
            path: path.to_string(),
            reason: "expected member 'Type' not found".to_string(),
        })?;
        Ok(info)
    }

    /// Rejects a header that claims to be new but carries an id.
    pub fn assert_is_new_id(&self, path: &str) -> Result<()> {
        if let (Some(true), Some(id)) = (self.is_new, &self.id) {
            return Err(JsonError::MalformedHeader {
                path: path.to_string(),
                reason: format!(
                    "an entity of type '{}' is new but has id '{id}'",
                    self.to_str.as_deref().unwrap_or(&self.type_name)
                ),
            });
        }
        Ok(())
    }

    pub fn is_new(&self) -> bool {
        self.is_new == Some(true)
    }
}

impl fmt::Display for IdentityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.type_name)?;
        if self.is_new() {
            f.write_str("New")?;
        } else if let Some(id) = &self.id {
            f.write_str(id)?;
        }
        if let Some(ticks) = self.ticks {
            write!(f, " (Ticks {ticks})")?;
        }
        write!(f, ": {}", self.to_str.as_deref().unwrap_or_default())
    }
}

fn malformed(path: &str, field: &str, expected: &str, value: &Value) -> JsonError {
    JsonError::MalformedHeader {
        path: path.to_string(),
        reason: format!("'{field}' must be {expected}, found {}", json_type(value)),
    }
}

/// Strings pass through, numbers and booleans are stringified, null is absent.
fn read_string(value: Value, field: &str, path: &str) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        other => Err(malformed(path, field, "a string", &other)),
    }
}

fn read_bool(value: Value, path: &str) -> Result<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b)),
        other => Err(malformed(path, "isNew", "a boolean", &other)),
    }
}

fn read_ticks(value: Value, path: &str) -> Result<Option<Ticks>> {
    match read_string(value, "ticks", path)? {
        None => Ok(None),
        Some(raw) => Ticks::from_str(&raw)
            .map(Some)
            .map_err(|err| JsonError::MalformedHeader {
                path: path.to_string(),
                reason: err.to_string(),
            }),
    }
}
