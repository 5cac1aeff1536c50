//! Type registry: wire name ⇄ Rust type, plus the storage metadata the
//! converter needs (key format, version column) and the mixins each entity
//! type carries.
//!
//! Populated once at startup through [`RegistryBuilder`] and shared
//! read-only afterwards.

use crate::entity::{Entity, Modifiable, TypeKey};
use crate::mixin::MixinSet;
use crate::route::PropertyRoute;
use crate::{Error, Result};
use modelwire_types::KeyFormat;
use serde::{Deserialize, Serialize};
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Storage metadata of an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityOptions {
    pub key: KeyFormat,
    /// Whether the table carries a ticks column for optimistic concurrency.
    pub versioned: bool,
}

impl Default for EntityOptions {
    fn default() -> Self {
        Self {
            key: KeyFormat::Int,
            versioned: true,
        }
    }
}

impl EntityOptions {
    #[must_use]
    pub fn key(mut self, key: KeyFormat) -> Self {
        self.key = key;
        self
    }

    #[must_use]
    pub fn unversioned(mut self) -> Self {
        self.versioned = false;
        self
    }
}

/// What a registered type is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Entity(EntityOptions),
    Embedded,
    Mixin,
}

/// A mixin declared on an entity type.
#[derive(Debug, Clone, Copy)]
struct MixinDecl {
    key: TypeKey,
    attach: fn(&mut MixinSet),
}

/// A registered type.
#[derive(Debug)]
pub struct TypeInfo {
    key: TypeKey,
    name: String,
    kind: TypeKind,
    factory: fn() -> Box<dyn Modifiable>,
    assignable_to: Vec<TypeId>,
    mixins: Vec<MixinDecl>,
}

fn construct<T: Modifiable + Default>() -> Box<dyn Modifiable> {
    Box::new(T::default())
}

fn attach_default<M: Modifiable + Clone + Default>(mixins: &mut MixinSet) {
    mixins.ensure::<M>();
}

impl TypeInfo {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Registered name: the clean name for entities, the raw name otherwise.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_entity(&self) -> bool {
        matches!(self.kind, TypeKind::Entity(_))
    }

    /// Storage metadata, for entity types only.
    pub fn entity_options(&self) -> Option<EntityOptions> {
        match self.kind {
            TypeKind::Entity(options) => Some(options),
            TypeKind::Embedded | TypeKind::Mixin => None,
        }
    }

    /// Whether a value of this type may be stored where `expected` is declared.
    pub fn is_assignable_to(&self, expected: TypeKey) -> bool {
        self.key == expected || self.assignable_to.contains(&expected.id())
    }

    /// The mixins every instance of this entity type carries, in declaration order.
    pub fn mixins(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.mixins.iter().map(|decl| decl.key)
    }

    /// Attaches a default value for every declared mixin the entity lacks.
    /// Mixins already present keep their values.
    pub fn attach_mixins(&self, entity: &mut dyn Entity) {
        for decl in &self.mixins {
            (decl.attach)(entity.mixins_mut());
        }
    }

    /// A fresh default instance, with its declared mixins attached.
    pub fn new_instance(&self) -> Box<dyn Modifiable> {
        let mut value = (self.factory)();
        if let Some(entity) = value.as_entity_mut() {
            self.attach_mixins(entity);
        }
        value
    }
}

/// Strips a trailing `Entity` suffix: `PersonEntity` ⇒ `Person`.
fn clean_name(raw: &str) -> &str {
    match raw.strip_suffix("Entity") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => raw,
    }
}

/// Name ⇄ type lookup for every type the converter may meet.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_name: HashMap<String, Arc<TypeInfo>>,
    by_id: HashMap<TypeId, Arc<TypeInfo>>,
}

impl TypeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Resolves a wire `Type` string. Unknown names yield `None`.
    pub fn try_get_type(&self, name: &str) -> Option<&TypeInfo> {
        self.by_name.get(name).map(Arc::as_ref)
    }

    pub fn get(&self, key: TypeKey) -> Option<&TypeInfo> {
        self.by_id.get(&key.id()).map(Arc::as_ref)
    }

    /// The clean name a registered entity type is written with.
    pub fn try_get_clean_name(&self, key: TypeKey) -> Option<&str> {
        self.get(key).filter(|info| info.is_entity()).map(TypeInfo::name)
    }

    /// The route root for `key`: registered entities are shown by their clean
    /// name (`PersonEntity` ⇒ `Person`), other types by their raw name.
    pub fn root_route(&self, key: TypeKey) -> PropertyRoute {
        match self.try_get_clean_name(key) {
            Some(name) => PropertyRoute::named(key, name),
            None => PropertyRoute::root(key),
        }
    }

    /// Attaches the declared mixins of the entity's registered type.
    /// Unregistered types are left unchanged.
    pub fn attach_mixins(&self, entity: &mut dyn Entity) {
        if let Some(info) = self.get(entity.type_key()) {
            info.attach_mixins(entity);
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> + '_ {
        self.by_id.values().map(Arc::as_ref)
    }
}

/// Collects registrations; [`build`](Self::build) validates them.
#[derive(Default)]
pub struct RegistryBuilder {
    types: Vec<TypeInfo>,
    assignable: Vec<(TypeKey, TypeKey)>,
    mixins: Vec<(TypeKey, MixinDecl)>,
}

impl RegistryBuilder {
    /// Registers an entity under its clean name.
    #[must_use]
    pub fn entity<T: Entity + Default>(self, options: EntityOptions) -> Self {
        let key = TypeKey::of::<T>();
        self.entity_named::<T>(clean_name(key.name()), options)
    }

    /// Registers an entity under an explicit name.
    #[must_use]
    pub fn entity_named<T: Entity + Default>(mut self, name: &str, options: EntityOptions) -> Self {
        self.types.push(TypeInfo {
            key: TypeKey::of::<T>(),
            name: name.to_string(),
            kind: TypeKind::Entity(options),
            factory: construct::<T>,
            assignable_to: Vec::new(),
            mixins: Vec::new(),
        });
        self
    }

    /// Registers an embedded value type under its raw name.
    #[must_use]
    pub fn embedded<T: Modifiable + Default>(mut self) -> Self {
        self.types.push(Self::raw::<T>(TypeKind::Embedded));
        self
    }

    /// Registers a mixin type under its raw name.
    #[must_use]
    pub fn mixin<T: Modifiable + Default>(mut self) -> Self {
        self.types.push(Self::raw::<T>(TypeKind::Mixin));
        self
    }

    /// Declares `T` assignable to the marker or base type `B`.
    #[must_use]
    pub fn assignable<T: Modifiable, B: ?Sized + 'static>(mut self) -> Self {
        self.assignable.push((TypeKey::of::<T>(), TypeKey::of::<B>()));
        self
    }

    /// Declares that every `T` carries a mixin `M`. Both must be registered,
    /// `T` as an entity and `M` as a mixin.
    #[must_use]
    pub fn entity_mixin<T: Entity, M: Modifiable + Clone + Default>(mut self) -> Self {
        self.mixins.push((
            TypeKey::of::<T>(),
            MixinDecl {
                key: TypeKey::of::<M>(),
                attach: attach_default::<M>,
            },
        ));
        self
    }

    fn raw<T: Modifiable + Default>(kind: TypeKind) -> TypeInfo {
        let key = TypeKey::of::<T>();
        TypeInfo {
            key,
            name: key.name().to_string(),
            kind,
            factory: construct::<T>,
            assignable_to: Vec::new(),
            mixins: Vec::new(),
        }
    }

    pub fn build(mut self) -> Result<TypeRegistry> {
        for (ty, base) in std::mem::take(&mut self.assignable) {
            let info = self
                .types
                .iter_mut()
                .find(|info| info.key == ty)
                .ok_or(Error::UnregisteredType {
                    ty: ty.name(),
                    base: base.name(),
                })?;
            info.assignable_to.push(base.id());
        }

        for (owner, decl) in std::mem::take(&mut self.mixins) {
            let is_mixin = self
                .types
                .iter()
                .any(|info| info.key == decl.key && info.kind == TypeKind::Mixin);
            if !is_mixin {
                return Err(Error::UnregisteredMixin(decl.key.name()));
            }
            let info = self
                .types
                .iter_mut()
                .find(|info| info.key == owner && info.is_entity())
                .ok_or(Error::MixinOwner {
                    ty: owner.name(),
                    mixin: decl.key.name(),
                })?;
            if !info.mixins.iter().any(|known| known.key == decl.key) {
                info.mixins.push(decl);
            }
        }

        let mut registry = TypeRegistry::default();
        for info in self.types {
            let info = Arc::new(info);
            if registry.by_id.contains_key(&info.key.id()) {
                return Err(Error::DuplicateType(info.key.name()));
            }
            if registry.by_name.contains_key(&info.name) {
                return Err(Error::DuplicateTypeName(info.name.clone()));
            }
            registry.by_name.insert(info.name.clone(), Arc::clone(&info));
            registry.by_id.insert(info.key.id(), info);
        }
        debug!(types = registry.len(), "type registry built");
        Ok(registry)
    }
}
