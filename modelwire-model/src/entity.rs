use crate::mixin::MixinSet;
use crate::property::{get_converters, PropertyMap, PropertyTable};
use modelwire_types::{PrimaryKey, Ticks};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Returns the unqualified name of a type (`app::model::Person` ⇒ `Person`).
///
/// Generic arguments are dropped.
pub fn short_type_name<T: ?Sized + 'static>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = match full.find('<') {
        Some(pos) => &full[..pos],
        None => full,
    };
    match base.rfind("::") {
        Some(pos) => &base[pos + 2..],
        None => base,
    }
}

/// Runtime identity of a Rust type plus its raw (unqualified) name.
///
/// Also used for abstract marker types that polymorphic properties expect.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name::<T>(),
        }
    }

    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The raw type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Declares the properties of a type.
///
/// Implemented once per domain type; the table is built on first use and
/// cached for the life of the process.
pub trait Describe: Sized + Send + Sync + 'static {
    fn describe(props: &mut PropertyTable<Self>);
}

/// Object-safe access to a value's type and property table.
///
/// Blanket-implemented for every [`Describe`] type.
pub trait Reflect: Any + Send + Sync {
    fn type_key(&self) -> TypeKey;
    fn converters(&self) -> Arc<PropertyMap>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Describe> Reflect for T {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn converters(&self) -> Arc<PropertyMap> {
        get_converters::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A domain object that can be read and written field by field.
///
/// `Display` provides the human-readable string sent as `toStr`.
pub trait Modifiable: Reflect + fmt::Display {
    /// Returns the entity view of this value, if it has identity.
    fn as_entity(&self) -> Option<&dyn Entity> {
        None
    }

    fn as_entity_mut(&mut self) -> Option<&mut dyn Entity> {
        None
    }

    /// Mixins are written without `toStr`.
    fn is_mixin(&self) -> bool {
        false
    }
}

impl fmt::Debug for dyn Modifiable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_key(), self)
    }
}

/// A persisted, identity-bearing domain object.
pub trait Entity: Modifiable {
    fn header(&self) -> &EntityHeader;
    fn header_mut(&mut self) -> &mut EntityHeader;

    /// `None` while the entity has never been saved.
    fn id(&self) -> Option<&PrimaryKey> {
        self.header().id()
    }

    fn is_new(&self) -> bool {
        self.header().id().is_none()
    }

    fn ticks(&self) -> Ticks {
        self.header().ticks()
    }

    fn set_ticks(&mut self, ticks: Ticks) {
        self.header_mut().set_ticks(ticks);
    }

    fn mixins(&self) -> &MixinSet {
        self.header().mixins()
    }

    fn mixins_mut(&mut self) -> &mut MixinSet {
        self.header_mut().mixins_mut()
    }
}

/// Identity, version and mixins shared by every entity.
#[derive(Debug, Default, Clone)]
pub struct EntityHeader {
    id: Option<PrimaryKey>,
    ticks: Ticks,
    mixins: MixinSet,
}

impl EntityHeader {
    /// Header of an unsaved entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Header of an entity loaded from storage.
    #[must_use]
    pub fn saved(id: PrimaryKey, ticks: Ticks) -> Self {
        Self {
            id: Some(id),
            ticks,
            mixins: MixinSet::new(),
        }
    }

    pub fn id(&self) -> Option<&PrimaryKey> {
        self.id.as_ref()
    }

    pub fn ticks(&self) -> Ticks {
        self.ticks
    }

    pub fn set_ticks(&mut self, ticks: Ticks) {
        self.ticks = ticks;
    }

    pub fn mixins(&self) -> &MixinSet {
        &self.mixins
    }

    /// Mixin values; which mixins are present is decided by the entity type's
    /// registration.
    pub fn mixins_mut(&mut self) -> &mut MixinSet {
        &mut self.mixins
    }
}
