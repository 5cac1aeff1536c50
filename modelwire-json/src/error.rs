//! Error types for reading and writing entity JSON.

use modelwire_model::StoreError;
use thiserror::Error;

/// Coarse classification of a [`JsonError`], for mapping to request-level
/// status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing `Type`, or `isNew` together with an `id`.
    MalformedHeader,
    /// Unknown type where one was required, or a type not assignable to the
    /// declared one.
    TypeResolution,
    /// An entity that is neither new nor identified.
    MissingIdentity,
    /// An embedded value with no matching in-memory instance to update.
    MissingReattachTarget,
    /// A wire field the type does not declare.
    UnknownProperty,
    /// A write vetoed by the write gate.
    UnauthorizedWrite,
    /// An `id` that does not parse against the type's key format.
    InvalidKey,
    /// The entity store failed.
    Store,
    /// A property value that does not fit its declared type.
    Value,
    /// JSON that is not shaped like an entity object.
    Syntax,
}

/// Error during entity JSON conversion. Every variant aborts the current graph.
#[derive(Debug, Error)]
pub enum JsonError {
    #[error("malformed header at {path}: {reason}")]
    MalformedHeader { path: String, reason: String },

    #[error("{reason} ({path})")]
    TypeResolution { path: String, reason: String },

    #[error("missing id and isNew for {identity} ({path})")]
    MissingIdentity { path: String, identity: String },

    #[error("missing isNew for {identity} because {reason}")]
    MissingReattachTarget { identity: String, reason: String },

    #[error("type {type_name} has no property {property:?}")]
    UnknownProperty {
        type_name: &'static str,
        property: String,
    },

    #[error("unauthorized write to {route}: {reason}")]
    UnauthorizedWrite { route: String, reason: String },

    #[error("invalid id: {0}")]
    InvalidKey(#[from] modelwire_types::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("property error: {0}")]
    Property(#[from] modelwire_model::Error),

    #[error("expected {expected} at {path}, found {found}")]
    Syntax {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl JsonError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            JsonError::MalformedHeader { .. } => ErrorKind::MalformedHeader,
            JsonError::TypeResolution { .. } => ErrorKind::TypeResolution,
            JsonError::MissingIdentity { .. } => ErrorKind::MissingIdentity,
            JsonError::MissingReattachTarget { .. } => ErrorKind::MissingReattachTarget,
            JsonError::UnknownProperty { .. } => ErrorKind::UnknownProperty,
            JsonError::UnauthorizedWrite { .. } => ErrorKind::UnauthorizedWrite,
            JsonError::InvalidKey(_) => ErrorKind::InvalidKey,
            JsonError::Store(_) => ErrorKind::Store,
            JsonError::Property(_) => ErrorKind::Value,
            JsonError::Syntax { .. } | JsonError::Json(_) => ErrorKind::Syntax,
        }
    }
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, JsonError>;

/// Names the JSON type of a value, for syntax errors.
pub(crate) fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
