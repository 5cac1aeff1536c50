//! Entity ⇄ JSON conversion.
//!
//! Writing emits the identity header, then every readable property, then the
//! `mixins` block. Reading parses the header, resolves the base instance
//! (new, reattached, loaded from the store, or an embedded value reused in
//! place) and assigns every remaining field through the property accessors.
//! Existing values are borrowed, never consumed: a failed read leaves them
//! usable.
//!
//! Each nested call receives the [`PropertyRoute`] of the value it handles;
//! gates are asked about that route once per property. Root routes of
//! registered entities are shown by their clean name.

use crate::error::{json_type, JsonError, Result};
use crate::gates::AccessGates;
use crate::identity::IdentityInfo;
use modelwire_model::{
    EntityStore, MemoryStore, Modifiable, PropertyConverter, PropertyRef, PropertyRoute,
    PropertyShape, PropertyValue, TypeInfo, TypeKey, TypeRegistry,
};
use modelwire_types::PrimaryKey;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, trace, warn};

const MIXINS: &str = "mixins";

/// Reads and writes entity graphs as JSON.
///
/// Cheap to share between threads; each call keeps its own route state.
#[derive(Clone)]
pub struct EntityConverter {
    registry: Arc<TypeRegistry>,
    store: Arc<dyn EntityStore>,
    gates: AccessGates,
}

/// Assembles an [`EntityConverter`].
pub struct ConverterBuilder {
    registry: Arc<TypeRegistry>,
    store: Option<Arc<dyn EntityStore>>,
    gates: AccessGates,
}

impl ConverterBuilder {
    /// The store used to load entities that are not reattached.
    /// Defaults to an empty [`MemoryStore`].
    #[must_use]
    pub fn store(mut self, store: Arc<dyn EntityStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Defaults to [`AccessGates::allow_all`].
    #[must_use]
    pub fn gates(mut self, gates: AccessGates) -> Self {
        self.gates = gates;
        self
    }

    pub fn build(self) -> EntityConverter {
        EntityConverter {
            registry: self.registry,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryStore::new())),
            gates: self.gates,
        }
    }
}

/// Outcome of resolving a header's `Type` against the declared type.
struct Resolved<'r> {
    key: TypeKey,
    info: Option<&'r TypeInfo>,
}

/// The instance a read assigns properties into.
enum Base<'a> {
    /// The caller's value, reattached or reused in place.
    Existing(&'a mut dyn Modifiable),
    /// A new or loaded instance.
    Fresh(Box<dyn Modifiable>),
}

/// What a read did to the existing value.
enum Outcome {
    Updated,
    Replaced(Box<dyn Modifiable>),
}

fn into_typed<T: Modifiable>(value: Box<dyn Modifiable>) -> Result<T> {
    let expected = TypeKey::of::<T>();
    let found = value.type_key();
    value
        .into_any()
        .downcast::<T>()
        .map(|typed| *typed)
        .map_err(|_| JsonError::TypeResolution {
            path: expected.name().to_string(),
            reason: format!("resolved type '{found}' is not '{expected}'"),
        })
}

fn location(route: Option<&PropertyRoute>, expected: TypeKey) -> String {
    match route {
        Some(route) => route.to_string(),
        None => expected.name().to_string(),
    }
}

fn expect_object(json: Value, path: &str) -> Result<Map<String, Value>> {
    match json {
        Value::Object(map) => Ok(map),
        other => Err(JsonError::Syntax {
            path: path.to_string(),
            expected: "object",
            found: json_type(&other),
        }),
    }
}

impl EntityConverter {
    pub fn builder(registry: Arc<TypeRegistry>) -> ConverterBuilder {
        ConverterBuilder {
            registry,
            store: None,
            gates: AccessGates::allow_all(),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn gates(&self) -> &AccessGates {
        &self.gates
    }

    // ── Write ────────────────────────────────────────────────────

    /// Writes a value rooted at its own type.
    pub fn write(&self, value: &dyn Modifiable) -> Result<Value> {
        self.write_object(value, None)
    }

    /// Writes a value that sits at `route` in an enclosing graph.
    pub fn write_at(&self, value: &dyn Modifiable, route: &PropertyRoute) -> Result<Value> {
        self.write_object(value, Some(route))
    }

    pub fn write_string(&self, value: &dyn Modifiable) -> Result<String> {
        Ok(serde_json::to_string(&self.write(value)?)?)
    }

    fn write_object(&self, value: &dyn Modifiable, route: Option<&PropertyRoute>) -> Result<Value> {
        let key = value.type_key();
        let route = self.route_or_root(route, key);
        let mut out = Map::new();

        match value.as_entity() {
            Some(entity) => {
                let type_name = self.registry.try_get_clean_name(key).unwrap_or_else(|| {
                    warn!(type_name = key.name(), "writing unregistered entity type");
                    key.name()
                });
                out.insert("Type".into(), Value::String(type_name.to_string()));
                out.insert(
                    "id".into(),
                    entity.id().map_or(Value::Null, PrimaryKey::to_json),
                );
                if entity.is_new() {
                    out.insert("isNew".into(), Value::Bool(true));
                }
                let versioned = self
                    .registry
                    .get(key)
                    .and_then(TypeInfo::entity_options)
                    .is_some_and(|options| options.versioned);
                if versioned {
                    out.insert("ticks".into(), Value::String(entity.ticks().to_string()));
                }
            }
            None => {
                out.insert("Type".into(), Value::String(key.name().to_string()));
            }
        }

        if !value.is_mixin() {
            out.insert("toStr".into(), Value::String(value.to_string()));
        }

        for pc in value.converters().iter() {
            self.write_property(&mut out, value, pc, &route)?;
        }

        if let Some(entity) = value.as_entity() {
            if !entity.mixins().is_empty() {
                let mut mixins = Map::new();
                for mixin in entity.mixins().iter() {
                    let mixin_key = mixin.type_key();
                    let mixin_route = route.add_mixin(mixin_key);
                    mixins.insert(
                        mixin_key.name().to_string(),
                        self.write_object(mixin, Some(&mixin_route))?,
                    );
                }
                out.insert(MIXINS.into(), Value::Object(mixins));
            }
        }

        Ok(Value::Object(out))
    }

    fn write_property(
        &self,
        out: &mut Map<String, Value>,
        value: &dyn Modifiable,
        pc: &PropertyConverter,
        parent: &PropertyRoute,
    ) -> Result<()> {
        let route = parent.add(pc);
        if let Some(reason) = self.gates.can_read(&route) {
            trace!(%route, %reason, "property omitted by read gate");
            return Ok(());
        }

        let json = match pc.get(value)? {
            PropertyRef::Value(json) => json,
            PropertyRef::Object(None) => Value::Null,
            PropertyRef::Object(Some(nested)) => self.write_object(nested, Some(&route))?,
        };
        out.insert(pc.wire_name().to_string(), json);
        Ok(())
    }

    // ── Read ─────────────────────────────────────────────────────

    /// Reads a value of type `T` that has no in-memory counterpart.
    ///
    /// The header must describe a new value or an entity the store can load;
    /// other embedded values need an existing instance
    /// (see [`read_into`](Self::read_into)).
    pub fn read<T: Modifiable>(&self, json: Value) -> Result<T> {
        let expected = TypeKey::of::<T>();
        match self.read_object(json, expected, None, None)? {
            Outcome::Replaced(value) => into_typed(value),
            Outcome::Updated => Err(JsonError::MissingReattachTarget {
                identity: expected.name().to_string(),
                reason: "existing value is null".to_string(),
            }),
        }
    }

    /// Reads on top of `target`, the in-memory value the JSON describes.
    ///
    /// An entity with the same key and an embedded value are updated in
    /// place; a new or loaded entity replaces `target` once it has been read
    /// completely. On error `target` stays valid, possibly with some fields
    /// already assigned.
    pub fn read_into<T: Modifiable>(&self, json: Value, target: &mut T) -> Result<()> {
        let expected = TypeKey::of::<T>();
        let existing = Some(&mut *target as &mut dyn Modifiable);
        if let Outcome::Replaced(value) = self.read_object(json, expected, existing, None)? {
            *target = into_typed(value)?;
        }
        Ok(())
    }

    pub fn read_str<T: Modifiable>(&self, json: &str) -> Result<T> {
        self.read(serde_json::from_str(json)?)
    }

    /// Reads a value whose declared type is `expected`, possibly polymorphic,
    /// into `slot`. The current content of `slot` is the existing value.
    pub fn read_dyn(&self, json: Value, expected: TypeKey, slot: &mut Option<Box<dyn Modifiable>>) -> Result<()> {
        self.read_slot(json, expected, slot, None)
    }

    /// Like [`read_dyn`](Self::read_dyn) for a value that sits at `route` in
    /// an enclosing graph.
    pub fn read_at(
        &self,
        json: Value,
        expected: TypeKey,
        slot: &mut Option<Box<dyn Modifiable>>,
        route: &PropertyRoute,
    ) -> Result<()> {
        self.read_slot(json, expected, slot, Some(route))
    }

    fn read_slot(
        &self,
        json: Value,
        expected: TypeKey,
        slot: &mut Option<Box<dyn Modifiable>>,
        route: Option<&PropertyRoute>,
    ) -> Result<()> {
        let existing = slot.as_mut().map(|value| &mut **value as &mut dyn Modifiable);
        if let Outcome::Replaced(value) = self.read_object(json, expected, existing, route)? {
            *slot = Some(value);
        }
        Ok(())
    }

    fn read_object(
        &self,
        json: Value,
        expected: TypeKey,
        existing: Option<&mut dyn Modifiable>,
        route: Option<&PropertyRoute>,
    ) -> Result<Outcome> {
        let path = location(route, expected);
        let mut fields = expect_object(json, &path)?.into_iter().peekable();

        let identity = IdentityInfo::read(&mut fields, &path)?;
        identity.assert_is_new_id(&path)?;

        let resolved = self.get_entity_type(&identity.type_name, expected, &path)?;
        match self.get_entity(&identity, &resolved, existing, &path)? {
            Base::Existing(target) => {
                let route = self.route_or_root(route, target.type_key());
                self.read_properties(fields, target, &route)?;
                Ok(Outcome::Updated)
            }
            Base::Fresh(mut value) => {
                let route = self.route_or_root(route, value.type_key());
                self.read_properties(fields, value.as_mut(), &route)?;
                Ok(Outcome::Replaced(value))
            }
        }
    }

    fn route_or_root(&self, route: Option<&PropertyRoute>, key: TypeKey) -> PropertyRoute {
        route.cloned().unwrap_or_else(|| self.registry.root_route(key))
    }

    /// Reads a header and properties on top of `target` without identity
    /// resolution. Used for mixins, whose instances are fixed on the entity.
    fn read_in_place(&self, json: Value, target: &mut dyn Modifiable, route: &PropertyRoute) -> Result<()> {
        let path = route.to_string();
        let mut fields = expect_object(json, &path)?.into_iter().peekable();

        let identity = IdentityInfo::read(&mut fields, &path)?;
        identity.assert_is_new_id(&path)?;

        let target_key = target.type_key();
        let resolved = self.get_entity_type(&identity.type_name, target_key, &path)?;
        if resolved.key != target_key {
            return Err(JsonError::MissingReattachTarget {
                identity: identity.to_string(),
                reason: format!("the attached value is a '{target_key}'"),
            });
        }

        self.read_properties(fields, target, route)
    }

    /// Maps a wire `Type` to a concrete type assignable to `expected`.
    fn get_entity_type(&self, type_name: &str, expected: TypeKey, path: &str) -> Result<Resolved<'_>> {
        match self.registry.try_get_type(type_name) {
            None => {
                if type_name == expected.name() {
                    return Err(JsonError::TypeResolution {
                        path: path.to_string(),
                        reason: format!(
                            "type '{type_name}' is not an Entity and is not the expected type ('{expected}')"
                        ),
                    });
                }
                Ok(Resolved {
                    key: expected,
                    info: self.registry.get(expected),
                })
            }
            Some(info) => {
                if !info.is_assignable_to(expected) {
                    return Err(JsonError::TypeResolution {
                        path: path.to_string(),
                        reason: format!("type '{}' is not assignable to '{expected}'", info.name()),
                    });
                }
                Ok(Resolved {
                    key: info.key(),
                    info: Some(info),
                })
            }
        }
    }

    /// Obtains the instance the properties will be written into.
    fn get_entity<'a>(
        &self,
        identity: &IdentityInfo,
        resolved: &Resolved<'_>,
        existing: Option<&'a mut dyn Modifiable>,
        path: &str,
    ) -> Result<Base<'a>> {
        if identity.is_new() {
            let info = resolved.info.ok_or_else(|| JsonError::TypeResolution {
                path: path.to_string(),
                reason: format!("cannot create an instance of unregistered type '{}'", resolved.key),
            })?;
            return Ok(Base::Fresh(info.new_instance()));
        }

        let entity_type = resolved
            .info
            .and_then(|info| Some((info, info.entity_options()?)));
        let Some((info, options)) = entity_type else {
            return Self::reuse_embedded(identity, resolved, existing, path);
        };

        let raw_id = identity.id.as_deref().ok_or_else(|| JsonError::MissingIdentity {
            path: path.to_string(),
            identity: identity.to_string(),
        })?;
        let id = PrimaryKey::parse(raw_id, options.key)?;

        if let Some(current) = existing.filter(|value| value.type_key() == resolved.key) {
            if let Some(entity) = current.as_entity_mut().filter(|entity| entity.id() == Some(&id)) {
                debug!(%identity, "reattaching existing entity");
                info.attach_mixins(entity);
                if let Some(ticks) = identity.ticks {
                    entity.set_ticks(ticks);
                }
                return Ok(Base::Existing(current));
            }
        }

        debug!(%identity, "loading entity from store");
        let mut loaded = self.store.retrieve(info, &id)?;
        if let Some(entity) = loaded.as_entity_mut() {
            info.attach_mixins(entity);
            if let Some(ticks) = identity.ticks {
                entity.set_ticks(ticks);
            }
        }
        Ok(Base::Fresh(loaded))
    }

    /// Embedded values are identified by position: the existing value is the
    /// one being read. Entities never take this path.
    fn reuse_embedded<'a>(
        identity: &IdentityInfo,
        resolved: &Resolved<'_>,
        existing: Option<&'a mut dyn Modifiable>,
        path: &str,
    ) -> Result<Base<'a>> {
        if resolved.info.is_none() && identity.id.is_some() {
            return Err(JsonError::TypeResolution {
                path: path.to_string(),
                reason: format!("cannot resolve id of '{identity}': '{}' is not registered", resolved.key),
            });
        }
        let current = existing.ok_or_else(|| JsonError::MissingReattachTarget {
            identity: identity.to_string(),
            reason: "existing value is null".to_string(),
        })?;
        if current.type_key() != resolved.key {
            return Err(JsonError::MissingReattachTarget {
                identity: identity.to_string(),
                reason: format!("existing value has a different type ('{}')", current.type_key()),
            });
        }
        if current.as_entity().is_some() {
            return Err(JsonError::TypeResolution {
                path: path.to_string(),
                reason: format!("'{}' is an entity but is not registered as one", resolved.key),
            });
        }
        Ok(Base::Existing(current))
    }

    fn read_properties(
        &self,
        fields: impl Iterator<Item = (String, Value)>,
        target: &mut dyn Modifiable,
        route: &PropertyRoute,
    ) -> Result<()> {
        let converters = target.converters();
        let type_name = target.type_key().name();

        for (name, json) in fields {
            if let Some(pc) = converters.get(&name) {
                self.set_property(json, target, pc, route)?;
            } else if name == MIXINS && target.as_entity().is_some() {
                self.read_mixins(json, target, route)?;
            } else {
                return Err(JsonError::UnknownProperty {
                    type_name,
                    property: name,
                });
            }
        }
        Ok(())
    }

    fn set_property(
        &self,
        json: Value,
        target: &mut dyn Modifiable,
        pc: &PropertyConverter,
        parent: &PropertyRoute,
    ) -> Result<()> {
        let route = parent.add(pc);
        self.gates.assert_can_write(&route)?;

        let PropertyShape::Object { expected } = pc.shape() else {
            pc.set(target, PropertyValue::Value(json))?;
            return Ok(());
        };

        let mut slot = match pc.take(target)? {
            PropertyValue::Object(prior) => prior,
            PropertyValue::Value(_) => None,
        };
        let read = if json.is_null() {
            slot = None;
            Ok(())
        } else {
            self.read_slot(json, expected, &mut slot, Some(&route))
        };
        // The slot goes back even when the nested read failed.
        pc.set(target, PropertyValue::Object(slot))?;
        read
    }

    fn read_mixins(&self, json: Value, target: &mut dyn Modifiable, route: &PropertyRoute) -> Result<()> {
        let type_name = target.type_key().name();
        let path = route.to_string();
        let mixins = expect_object(json, &path)?;
        let Some(entity) = target.as_entity_mut() else {
            return Err(JsonError::UnknownProperty {
                type_name,
                property: MIXINS.to_string(),
            });
        };

        for (name, mixin_json) in mixins {
            let Some(mixin) = entity.mixins_mut().get_by_name_mut(&name) else {
                return Err(JsonError::UnknownProperty {
                    type_name,
                    property: format!("{MIXINS}.{name}"),
                });
            };
            let mixin_route = route.add_mixin(mixin.type_key());
            self.read_in_place(mixin_json, mixin, &mixin_route)?;
        }
        Ok(())
    }
}
