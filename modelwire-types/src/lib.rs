//! Core identity types for modelwire.
//!
//! This crate defines the small, schema-agnostic values that every layer of
//! the entity model agrees on:
//! - Primary keys and the per-type key format they are parsed against
//! - Ticks, the optimistic-concurrency version stamp carried by entities
//!
//! Everything that knows about properties, routes or JSON lives in
//! `modelwire-model` and `modelwire-json`.

mod key;
mod ticks;

pub use key::{KeyFormat, PrimaryKey};
pub use ticks::Ticks;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid {format} key: {value:?}")]
    InvalidKey { format: KeyFormat, value: String },

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid ticks: {0}")]
    InvalidTicks(String),
}
