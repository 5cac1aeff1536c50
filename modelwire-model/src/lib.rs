//! Core entity model for modelwire.
//!
//! Defines the types the JSON converter walks over:
//! - [`Modifiable`] / [`Entity`]: domain objects, with or without identity
//! - [`PropertyTable`] / [`PropertyMap`]: per-type property accessors, built
//!   once and cached process-wide by [`get_converters`]
//! - [`PropertyRoute`]: the schema path of a field, used for authorization
//! - [`TypeRegistry`]: name ⇄ type lookup plus storage metadata
//! - [`EntityStore`]: the load-by-key boundary to persistence
//!
//! Nothing here knows about the wire format; that lives in `modelwire-json`.

mod entity;
mod mixin;
mod property;
mod registry;
mod route;
mod store;

pub use entity::{short_type_name, Describe, Entity, EntityHeader, Modifiable, Reflect, TypeKey};
pub use mixin::MixinSet;
pub use property::{
    get_converters, PropertyAccess, PropertyConverter, PropertyMap, PropertyRef, PropertyShape,
    PropertyTable, PropertyValue,
};
pub use registry::{EntityOptions, RegistryBuilder, TypeInfo, TypeKind, TypeRegistry};
pub use route::{PropertyRoute, RouteSegment};
pub use store::{EntityStore, MemoryStore, StoreError};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the model layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("property {property} expects {expected}, got {found}")]
    TypeMismatch {
        property: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("property {property} is declared on {owner}, not on the given value")]
    OwnerMismatch {
        owner: &'static str,
        property: &'static str,
    },

    #[error("invalid value for property {property}: {source}")]
    Value {
        property: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("type name {0:?} is registered twice")]
    DuplicateTypeName(String),

    #[error("type {0} is registered twice")]
    DuplicateType(&'static str),

    #[error("type {ty} must be registered before it can be assignable to {base}")]
    UnregisteredType {
        ty: &'static str,
        base: &'static str,
    },

    #[error("type {ty} must be registered as an entity before it can carry mixin {mixin}")]
    MixinOwner {
        ty: &'static str,
        mixin: &'static str,
    },

    #[error("mixin {0} must be registered as a mixin before an entity can carry it")]
    UnregisteredMixin(&'static str),
}
