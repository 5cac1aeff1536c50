use crate::entity::{Modifiable, TypeKey};
use std::fmt;

/// A mixin value that can be cloned along with its entity.
trait MixinValue: Send + Sync {
    fn as_modifiable(&self) -> &dyn Modifiable;
    fn as_modifiable_mut(&mut self) -> &mut dyn Modifiable;
    fn clone_box(&self) -> Box<dyn MixinValue>;
}

impl<M: Modifiable + Clone> MixinValue for M {
    fn as_modifiable(&self) -> &dyn Modifiable {
        self
    }

    fn as_modifiable_mut(&mut self) -> &mut dyn Modifiable {
        self
    }

    fn clone_box(&self) -> Box<dyn MixinValue> {
        Box::new(self.clone())
    }
}

/// The mixins attached to an entity, indexed by mixin type.
///
/// Which mixins an entity type carries is declared once on the registry
/// ([`RegistryBuilder::entity_mixin`](crate::RegistryBuilder::entity_mixin))
/// and attached by [`TypeInfo::attach_mixins`](crate::TypeInfo::attach_mixins).
/// There is no detach. Iteration follows declaration order.
#[derive(Default)]
pub struct MixinSet {
    items: Vec<Box<dyn MixinValue>>,
}

impl MixinSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a default `M` unless one is already present.
    pub(crate) fn ensure<M: Modifiable + Clone + Default>(&mut self) {
        if self.position(TypeKey::of::<M>()).is_none() {
            self.items.push(Box::new(M::default()));
        }
    }

    fn position(&self, key: TypeKey) -> Option<usize> {
        self.items
            .iter()
            .position(|m| m.as_modifiable().type_key() == key)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get<M: Modifiable>(&self) -> Option<&M> {
        self.items
            .iter()
            .find_map(|m| m.as_modifiable().as_any().downcast_ref::<M>())
    }

    pub fn get_mut<M: Modifiable>(&mut self) -> Option<&mut M> {
        self.items
            .iter_mut()
            .find_map(|m| m.as_modifiable_mut().as_any_mut().downcast_mut::<M>())
    }

    /// Looks up a mixin by its raw type name, as used for `mixins` keys.
    pub fn get_by_name_mut(&mut self, name: &str) -> Option<&mut dyn Modifiable> {
        self.items
            .iter_mut()
            .map(|m| m.as_modifiable_mut())
            .find(|m| m.type_key().name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Modifiable> + '_ {
        self.items.iter().map(|m| m.as_modifiable())
    }
}

impl Clone for MixinSet {
    fn clone(&self) -> Self {
        Self {
            items: self.items.iter().map(|m| m.clone_box()).collect(),
        }
    }
}

impl fmt::Debug for MixinSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
