//! JSON wire protocol for modelwire entity graphs.
//!
//! Entities are written as a JSON object led by an identity header
//! (`Type`, `id`, `ticks`, `toStr`), followed by one field per readable
//! property and an optional `mixins` block. Reading resolves the header to a
//! fresh instance, a reattached in-memory instance, an instance loaded from
//! the [`EntityStore`](modelwire_model::EntityStore), or an embedded value
//! reused in place, then assigns the remaining fields.
//!
//! Access is checked per property route:
//! - read gate vetoes drop the property from the output
//! - write gate vetoes fail the read with [`JsonError::UnauthorizedWrite`]
//!
//! ```ignore
//! let registry = Arc::new(
//!     TypeRegistry::builder()
//!         .entity::<PersonEntity>(EntityOptions::default())
//!         .embedded::<Address>()
//!         .mixin::<AuditMixin>()
//!         .entity_mixin::<PersonEntity, AuditMixin>()
//!         .build()?,
//! );
//! let converter = EntityConverter::builder(registry)
//!     .store(store)
//!     .gates(AccessPolicy::load_from("access.toml").into_gates())
//!     .build();
//!
//! let json = converter.write(&person)?;
//! converter.read_into(json, &mut person)?;
//! let fresh: PersonEntity = converter.read(other_json)?;
//! ```

mod converter;
mod error;
mod gates;
mod identity;
mod policy;

pub use converter::{ConverterBuilder, EntityConverter};
pub use error::{ErrorKind, JsonError, Result};
pub use gates::{AccessGates, RouteGate};
pub use identity::IdentityInfo;
pub use policy::{AccessPolicy, PolicyConfig, PolicyMode};
