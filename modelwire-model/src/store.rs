//! Load-by-key boundary to persistence.

use crate::entity::{Entity, Modifiable, TypeKey};
use crate::registry::TypeInfo;
use modelwire_types::PrimaryKey;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::trace;

/// Persistence errors surfaced to the converter unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{type_name} with id {id} not found")]
    NotFound { type_name: String, id: PrimaryKey },

    #[error("entity {type_name} has no id and cannot be stored")]
    Unsaved { type_name: &'static str },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Loads saved entities by key.
///
/// Called synchronously, at most once per unresolved entity reference.
pub trait EntityStore: Send + Sync {
    fn retrieve(&self, info: &TypeInfo, id: &PrimaryKey) -> Result<Box<dyn Modifiable>, StoreError>;
}

type Loader = Arc<dyn Fn() -> Box<dyn Modifiable> + Send + Sync>;

/// An in-process store that hands out clones of the entities put into it.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<(TypeId, PrimaryKey), Loader>>,
    loads: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a saved entity, replacing any previous one with the same key.
    pub fn insert<T: Entity + Clone>(&self, entity: T) -> Result<(), StoreError> {
        let id = entity.id().cloned().ok_or(StoreError::Unsaved {
            type_name: TypeKey::of::<T>().name(),
        })?;
        let loader: Loader = Arc::new(move || Box::new(entity.clone()));
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((TypeId::of::<T>(), id), loader);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of successful and failed `retrieve` calls so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl EntityStore for MemoryStore {
    fn retrieve(&self, info: &TypeInfo, id: &PrimaryKey) -> Result<Box<dyn Modifiable>, StoreError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        let loader = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(info.key().id(), id.clone()))
            .cloned()
            .ok_or_else(|| {
                trace!(type_name = info.name(), %id, "memory store miss");
                StoreError::NotFound {
                    type_name: info.name().to_string(),
                    id: id.clone(),
                }
            })?;
        Ok(loader())
    }
}
