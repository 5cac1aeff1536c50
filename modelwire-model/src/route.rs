use crate::entity::TypeKey;
use crate::property::PropertyConverter;
use std::fmt;
use std::sync::Arc;

/// One step of a [`PropertyRoute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteSegment {
    /// A declared property, by declared name.
    Property(&'static str),
    /// The root of a mixin attached to the entity at this point.
    Mixin(TypeKey),
}

/// Position of a value in the schema tree: a root type followed by property
/// and mixin segments.
///
/// Routes are immutable; [`add`](Self::add) and [`add_mixin`](Self::add_mixin)
/// return an extended copy. Displayed as `Person.Address.City` or
/// `Person[AuditMixin].CreatedBy`, where the root is shown by its display
/// name: the raw type name unless built with [`named`](Self::named).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyRoute {
    root: TypeKey,
    root_name: Arc<str>,
    segments: Arc<[RouteSegment]>,
}

impl PropertyRoute {
    /// A root displayed by the raw type name.
    pub fn root(root: TypeKey) -> Self {
        Self::named(root, root.name())
    }

    /// A root displayed by `name`, e.g. the clean name an entity type is
    /// registered under.
    pub fn named(root: TypeKey, name: &str) -> Self {
        Self {
            root,
            root_name: Arc::from(name),
            segments: Arc::from(Vec::new()),
        }
    }

    pub fn root_of<T: ?Sized + 'static>() -> Self {
        Self::root(TypeKey::of::<T>())
    }

    #[must_use]
    pub fn add(&self, property: &PropertyConverter) -> Self {
        self.extend(RouteSegment::Property(property.name()))
    }

    #[must_use]
    pub fn add_mixin(&self, mixin: TypeKey) -> Self {
        self.extend(RouteSegment::Mixin(mixin))
    }

    fn extend(&self, segment: RouteSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend_from_slice(&self.segments);
        segments.push(segment);
        Self {
            root: self.root,
            root_name: Arc::clone(&self.root_name),
            segments: Arc::from(segments),
        }
    }

    pub fn root_type(&self) -> TypeKey {
        self.root
    }

    pub fn segments(&self) -> &[RouteSegment] {
        &self.segments
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for PropertyRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.root_name)?;
        for segment in self.segments.iter() {
            match segment {
                RouteSegment::Property(name) => write!(f, ".{name}")?,
                RouteSegment::Mixin(mixin) => write!(f, "[{}]", mixin.name())?,
            }
        }
        Ok(())
    }
}
