//! In-memory document store.
//!
//! Backs library tests and embedding applications that manage their own
//! durability. Documents are held as serialized YAML so the store
//! behaves exactly like the file store, including the optimistic
//! revision check; a single mutex makes each versioned save an atomic
//! check-and-write.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::core::entity::Entity;
use crate::core::identity::EntityId;
use crate::sampling::{RegimeKey, RegimeRecord};

use super::{DocumentStore, StoreError, NEW_RECORD};

/// Lock-guarded in-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, String>>,
    regimes: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_version(found: Option<u64>, expected: u64) -> Result<(), StoreError> {
        match found {
            None if expected == NEW_RECORD => Ok(()),
            None => Err(StoreError::Conflict { expected, found: 0 }),
            Some(v) if v == expected => Ok(()),
            Some(v) => Err(StoreError::Conflict { expected, found: v }),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn save<T: Entity>(&self, entity: &T) -> Result<(), StoreError> {
        let yaml = serde_yml::to_string(entity).map_err(|e| StoreError::Yaml(e.to_string()))?;
        self.docs
            .lock()
            .expect("store lock poisoned")
            .insert(entity.id().to_string(), yaml);
        Ok(())
    }

    fn save_versioned<T: Entity>(&self, entity: &T, expected: u64) -> Result<(), StoreError> {
        let yaml = serde_yml::to_string(entity).map_err(|e| StoreError::Yaml(e.to_string()))?;
        let mut docs = self.docs.lock().expect("store lock poisoned");

        let found = match docs.get(&entity.id().to_string()) {
            Some(stored) => Some(
                serde_yml::from_str::<T>(stored)
                    .map_err(|e| StoreError::Yaml(e.to_string()))?
                    .version(),
            ),
            None => None,
        };
        Self::check_version(found, expected)?;

        docs.insert(entity.id().to_string(), yaml);
        Ok(())
    }

    fn load<T: Entity>(&self, id: &EntityId) -> Result<T, StoreError> {
        let docs = self.docs.lock().expect("store lock poisoned");
        let yaml = docs.get(&id.to_string()).ok_or_else(|| StoreError::NotFound {
            kind: T::PREFIX,
            key: id.to_string(),
        })?;
        serde_yml::from_str(yaml).map_err(|e| StoreError::Yaml(e.to_string()))
    }

    fn list<T: Entity>(&self) -> Result<Vec<T>, StoreError> {
        let docs = self.docs.lock().expect("store lock poisoned");
        let mut entities = Vec::new();
        for (id, yaml) in docs.iter() {
            if id.starts_with(&format!("{}-", T::PREFIX)) {
                if let Ok(entity) = serde_yml::from_str::<T>(yaml) {
                    entities.push(entity);
                }
            }
        }
        Ok(entities)
    }

    fn load_regime(&self, key: &RegimeKey) -> Result<Option<RegimeRecord>, StoreError> {
        let regimes = self.regimes.lock().expect("store lock poisoned");
        match regimes.get(&key.slug()) {
            Some(yaml) => serde_yml::from_str(yaml)
                .map(Some)
                .map_err(|e| StoreError::Yaml(e.to_string())),
            None => Ok(None),
        }
    }

    fn save_regime(&self, record: &RegimeRecord, expected: u64) -> Result<(), StoreError> {
        let yaml = serde_yml::to_string(record).map_err(|e| StoreError::Yaml(e.to_string()))?;
        let mut regimes = self.regimes.lock().expect("store lock poisoned");

        let found = match regimes.get(&record.key.slug()) {
            Some(stored) => Some(
                serde_yml::from_str::<RegimeRecord>(stored)
                    .map_err(|e| StoreError::Yaml(e.to_string()))?
                    .version,
            ),
            None => None,
        };
        Self::check_version(found, expected)?;

        regimes.insert(record.key.slug(), yaml);
        Ok(())
    }
}
