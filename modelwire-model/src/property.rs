//! Per-type property accessors.
//!
//! Every [`Describe`] type declares its properties once as lens pairs
//! (`fn(&T) -> &V`, `fn(&mut T) -> &mut V`). [`get_converters`] turns that
//! declaration into a [`PropertyMap`] keyed by wire name and keeps it for the
//! life of the process.

use crate::entity::{Describe, Modifiable, TypeKey};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::trace;

/// What kind of value a property holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyShape {
    /// A plain serde value (numbers, strings, collections of them...).
    Value,
    /// A nested domain object, entity or embedded, possibly polymorphic.
    Object { expected: TypeKey },
}

/// Borrowed view of a property's current value.
pub enum PropertyRef<'a> {
    Value(serde_json::Value),
    Object(Option<&'a dyn Modifiable>),
}

/// Owned property value, as taken out of or put back into an owner.
pub enum PropertyValue {
    Value(serde_json::Value),
    Object(Option<Box<dyn Modifiable>>),
}

impl PropertyValue {
    fn describe(&self) -> String {
        match self {
            Self::Value(_) => "a plain value".to_string(),
            Self::Object(None) => "null".to_string(),
            Self::Object(Some(obj)) => obj.type_key().name().to_string(),
        }
    }
}

/// Type-erased get/take/set over one property of one owner type.
pub trait PropertyAccess: Send + Sync {
    fn shape(&self) -> PropertyShape;
    fn get<'a>(&self, owner: &'a dyn Any) -> Result<PropertyRef<'a>>;
    fn take(&self, owner: &mut dyn Any) -> Result<PropertyValue>;
    fn set(&self, owner: &mut dyn Any, value: PropertyValue) -> Result<()>;
}

fn owner_ref<'a, T: 'static>(owner: &'a dyn Any, property: &'static str) -> Result<&'a T> {
    owner.downcast_ref::<T>().ok_or(Error::OwnerMismatch {
        owner: crate::short_type_name::<T>(),
        property,
    })
}

fn owner_mut<'a, T: 'static>(owner: &'a mut dyn Any, property: &'static str) -> Result<&'a mut T> {
    owner.downcast_mut::<T>().ok_or(Error::OwnerMismatch {
        owner: crate::short_type_name::<T>(),
        property,
    })
}

struct ValueAccess<T, V> {
    name: &'static str,
    get: fn(&T) -> &V,
    get_mut: fn(&mut T) -> &mut V,
}

impl<T, V> PropertyAccess for ValueAccess<T, V>
where
    T: Send + Sync + 'static,
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn shape(&self) -> PropertyShape {
        PropertyShape::Value
    }

    fn get<'a>(&self, owner: &'a dyn Any) -> Result<PropertyRef<'a>> {
        let owner = owner_ref::<T>(owner, self.name)?;
        let value = serde_json::to_value((self.get)(owner)).map_err(|source| Error::Value {
            property: self.name,
            source,
        })?;
        Ok(PropertyRef::Value(value))
    }

    fn take(&self, owner: &mut dyn Any) -> Result<PropertyValue> {
        match self.get(owner)? {
            PropertyRef::Value(value) => Ok(PropertyValue::Value(value)),
            PropertyRef::Object(_) => Ok(PropertyValue::Value(serde_json::Value::Null)),
        }
    }

    fn set(&self, owner: &mut dyn Any, value: PropertyValue) -> Result<()> {
        let PropertyValue::Value(json) = value else {
            return Err(Error::TypeMismatch {
                property: self.name,
                expected: crate::short_type_name::<V>(),
                found: value.describe(),
            });
        };
        let parsed: V = serde_json::from_value(json).map_err(|source| Error::Value {
            property: self.name,
            source,
        })?;
        *(self.get_mut)(owner_mut::<T>(owner, self.name)?) = parsed;
        Ok(())
    }
}

struct ObjectAccess<T, E> {
    name: &'static str,
    get: fn(&T) -> &Option<E>,
    get_mut: fn(&mut T) -> &mut Option<E>,
}

impl<T, E> PropertyAccess for ObjectAccess<T, E>
where
    T: Send + Sync + 'static,
    E: Modifiable,
{
    fn shape(&self) -> PropertyShape {
        PropertyShape::Object {
            expected: TypeKey::of::<E>(),
        }
    }

    fn get<'a>(&self, owner: &'a dyn Any) -> Result<PropertyRef<'a>> {
        let owner = owner_ref::<T>(owner, self.name)?;
        Ok(PropertyRef::Object(
            (self.get)(owner).as_ref().map(|e| e as &dyn Modifiable),
        ))
    }

    fn take(&self, owner: &mut dyn Any) -> Result<PropertyValue> {
        let owner = owner_mut::<T>(owner, self.name)?;
        Ok(PropertyValue::Object(
            (self.get_mut)(owner)
                .take()
                .map(|e| Box::new(e) as Box<dyn Modifiable>),
        ))
    }

    fn set(&self, owner: &mut dyn Any, value: PropertyValue) -> Result<()> {
        let mismatch = |found: String| Error::TypeMismatch {
            property: self.name,
            expected: crate::short_type_name::<E>(),
            found,
        };
        let next = match value {
            PropertyValue::Object(None) => None,
            PropertyValue::Object(Some(obj)) => {
                let found = obj.type_key().name().to_string();
                let typed = obj.into_any().downcast::<E>().map_err(|_| mismatch(found))?;
                Some(*typed)
            }
            other @ PropertyValue::Value(_) => return Err(mismatch(other.describe())),
        };
        *(self.get_mut)(owner_mut::<T>(owner, self.name)?) = next;
        Ok(())
    }
}

struct DynObjectAccess<T> {
    name: &'static str,
    expected: TypeKey,
    get: fn(&T) -> &Option<Box<dyn Modifiable>>,
    get_mut: fn(&mut T) -> &mut Option<Box<dyn Modifiable>>,
}

impl<T> PropertyAccess for DynObjectAccess<T>
where
    T: Send + Sync + 'static,
{
    fn shape(&self) -> PropertyShape {
        PropertyShape::Object {
            expected: self.expected,
        }
    }

    fn get<'a>(&self, owner: &'a dyn Any) -> Result<PropertyRef<'a>> {
        let owner = owner_ref::<T>(owner, self.name)?;
        Ok(PropertyRef::Object((self.get)(owner).as_deref()))
    }

    fn take(&self, owner: &mut dyn Any) -> Result<PropertyValue> {
        let owner = owner_mut::<T>(owner, self.name)?;
        Ok(PropertyValue::Object((self.get_mut)(owner).take()))
    }

    fn set(&self, owner: &mut dyn Any, value: PropertyValue) -> Result<()> {
        let PropertyValue::Object(next) = value else {
            return Err(Error::TypeMismatch {
                property: self.name,
                expected: self.expected.name(),
                found: value.describe(),
            });
        };
        *(self.get_mut)(owner_mut::<T>(owner, self.name)?) = next;
        Ok(())
    }
}

/// One declared property: its names plus the accessor pair.
pub struct PropertyConverter {
    name: &'static str,
    wire_name: String,
    access: Box<dyn PropertyAccess>,
}

impl PropertyConverter {
    pub fn new(name: &'static str, access: Box<dyn PropertyAccess>) -> Self {
        Self {
            name,
            wire_name: first_lower(name),
            access,
        }
    }

    /// Declared name, as used in property routes.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name used on the wire: the declared name with its first character lower-cased.
    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub fn shape(&self) -> PropertyShape {
        self.access.shape()
    }

    pub fn get<'a>(&self, owner: &'a dyn Modifiable) -> Result<PropertyRef<'a>> {
        self.access.get(owner.as_any())
    }

    /// Moves the current value out, leaving the property empty.
    pub fn take(&self, owner: &mut dyn Modifiable) -> Result<PropertyValue> {
        self.access.take(owner.as_any_mut())
    }

    pub fn set(&self, owner: &mut dyn Modifiable, value: PropertyValue) -> Result<()> {
        self.access.set(owner.as_any_mut(), value)
    }
}

impl fmt::Display for PropertyConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for PropertyConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyConverter")
            .field("name", &self.name)
            .field("wire_name", &self.wire_name)
            .field("shape", &self.shape())
            .finish()
    }
}

fn first_lower(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Builder handed to [`Describe::describe`].
pub struct PropertyTable<T> {
    entries: Vec<PropertyConverter>,
    _owner: PhantomData<fn(T)>,
}

impl<T: Describe> PropertyTable<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            _owner: PhantomData,
        }
    }

    /// Declares a plain serde-encoded property.
    pub fn value<V>(&mut self, name: &'static str, get: fn(&T) -> &V, get_mut: fn(&mut T) -> &mut V) -> &mut Self
    where
        V: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.push(name, Box::new(ValueAccess { name, get, get_mut }))
    }

    /// Declares a nested entity or embedded object of a concrete type.
    pub fn object<E: Modifiable>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> &Option<E>,
        get_mut: fn(&mut T) -> &mut Option<E>,
    ) -> &mut Self {
        self.push(name, Box::new(ObjectAccess { name, get, get_mut }))
    }

    /// Declares a nested object whose runtime type is any registered type
    /// assignable to the marker `B`.
    pub fn polymorphic<B: ?Sized + 'static>(
        &mut self,
        name: &'static str,
        get: fn(&T) -> &Option<Box<dyn Modifiable>>,
        get_mut: fn(&mut T) -> &mut Option<Box<dyn Modifiable>>,
    ) -> &mut Self {
        let expected = TypeKey::of::<B>();
        self.push(
            name,
            Box::new(DynObjectAccess {
                name,
                expected,
                get,
                get_mut,
            }),
        )
    }

    fn push(&mut self, name: &'static str, access: Box<dyn PropertyAccess>) -> &mut Self {
        self.entries.push(PropertyConverter::new(name, access));
        self
    }
}

/// The properties of one type, in declaration order, indexed by wire name.
#[derive(Debug)]
pub struct PropertyMap {
    entries: Vec<PropertyConverter>,
    index: HashMap<String, usize>,
}

impl PropertyMap {
    fn build<T: Describe>() -> Self {
        let mut table = PropertyTable::<T>::new();
        T::describe(&mut table);
        let index = table
            .entries
            .iter()
            .enumerate()
            .map(|(i, pc)| (pc.wire_name.clone(), i))
            .collect();
        Self {
            entries: table.entries,
            index,
        }
    }

    /// Looks up a property by exact wire name.
    pub fn get(&self, wire_name: &str) -> Option<&PropertyConverter> {
        self.index.get(wire_name).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyConverter> + '_ {
        self.entries.iter()
    }

    pub fn wire_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|pc| pc.wire_name())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type ConverterCache = RwLock<HashMap<TypeId, Arc<PropertyMap>>>;

static CONVERTERS: OnceLock<ConverterCache> = OnceLock::new();

/// Returns the property map of `T`, building and caching it on first use.
///
/// Concurrent first calls may each build the map; the first insert wins and
/// every caller gets that instance.
pub fn get_converters<T: Describe>() -> Arc<PropertyMap> {
    let cache = CONVERTERS.get_or_init(Default::default);
    let type_id = TypeId::of::<T>();

    if let Some(map) = cache
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&type_id)
    {
        return Arc::clone(map);
    }

    let built = Arc::new(PropertyMap::build::<T>());
    trace!(
        type_name = crate::short_type_name::<T>(),
        properties = built.len(),
        "built property map"
    );
    let mut guard = cache.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(guard.entry(type_id).or_insert(built))
}
