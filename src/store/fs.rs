//! YAML file store rooted at a project directory.
//!
//! Records live as `<ID>.mqt.yaml` files in per-type directories, the
//! regime records as `<slug>.mqt.yaml` under `quality/regimes/`. The
//! optimistic revision check reads the stored copy immediately before
//! writing; concurrent writers within one process should serialize
//! through a shared store value.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::project::Project;
use crate::core::provider::{InspectionPlanProvider, ProviderError};
use crate::entities::plan::InspectionPlan;
use crate::sampling::{RegimeKey, RegimeRecord};

use super::{DocumentStore, StoreError, NEW_RECORD};

/// File-backed document store
pub struct FsStore {
    root: PathBuf,
    // Serializes the read-check-write window of versioned saves.
    write_lock: Mutex<()>,
}

impl FsStore {
    /// Open the store of a discovered project
    pub fn open(project: &Project) -> Self {
        Self::at(project.root())
    }

    /// Open a store rooted at an arbitrary directory
    pub fn at(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn entity_dir(&self, prefix: EntityPrefix) -> PathBuf {
        self.root.join(Project::entity_directory(prefix))
    }

    fn entity_path(&self, id: &EntityId) -> PathBuf {
        self.entity_dir(id.prefix()).join(format!("{id}.mqt.yaml"))
    }

    fn regime_path(&self, key: &RegimeKey) -> PathBuf {
        self.root
            .join("quality/regimes")
            .join(format!("{}.mqt.yaml", key.slug()))
    }

    /// Resolve a full or partial entity ID to the unique matching record
    /// file. Partial matching follows the file stem, so `NCR-01HC` finds
    /// `NCR-01HC....mqt.yaml`.
    pub fn resolve_id(&self, prefix: EntityPrefix, partial: &str) -> Result<EntityId, StoreError> {
        let dir = self.entity_dir(prefix);
        let needle = partial.to_uppercase();
        let mut matches = Vec::new();

        if dir.exists() {
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                let stem = path
                    .file_name()
                    .and_then(|s| s.to_str())
                    .unwrap_or("")
                    .trim_end_matches(".mqt.yaml")
                    .to_string();
                if stem.to_uppercase().starts_with(&needle) {
                    matches.push(stem);
                }
            }
        }

        match matches.len() {
            0 => Err(StoreError::NotFound {
                kind: prefix.as_str(),
                key: partial.to_string(),
            }),
            1 => matches[0].parse().map_err(|_| StoreError::NotFound {
                kind: prefix.as_str(),
                key: partial.to_string(),
            }),
            _ => Err(StoreError::Ambiguous(partial.to_string())),
        }
    }

    fn write_yaml<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yml::to_string(value).map_err(|e| StoreError::Yaml(e.to_string()))?;
        fs::write(path, yaml)?;
        Ok(())
    }

    fn stored_version<T: Entity>(&self, path: &Path) -> Result<Option<u64>, StoreError> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        let current: T =
            serde_yml::from_str(&contents).map_err(|e| StoreError::Yaml(e.to_string()))?;
        Ok(Some(current.version()))
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

impl DocumentStore for FsStore {
    fn save<T: Entity>(&self, entity: &T) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");
        self.write_yaml(&self.entity_path(entity.id()), entity)
    }

    fn save_versioned<T: Entity>(&self, entity: &T, expected: u64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");
        let path = self.entity_path(entity.id());
        Self::check_version(self.stored_version::<T>(&path)?, expected)?;
        self.write_yaml(&path, entity)
    }

    fn load<T: Entity>(&self, id: &EntityId) -> Result<T, StoreError> {
        let path = self.entity_path(id);
        if !path.exists() {
            return Err(StoreError::NotFound {
                kind: T::PREFIX,
                key: id.to_string(),
            });
        }
        let contents = fs::read_to_string(&path)?;
        serde_yml::from_str(&contents).map_err(|e| StoreError::Yaml(e.to_string()))
    }

    fn list<T: Entity>(&self) -> Result<Vec<T>, StoreError> {
        let prefix: EntityPrefix = T::PREFIX.parse().expect("entity prefix is registered");
        let dir = self.entity_dir(prefix);
        let mut entities = Vec::new();

        if !dir.exists() {
            return Ok(entities);
        }

        for entry in walkdir::WalkDir::new(&dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().to_string_lossy().ends_with(".mqt.yaml"))
        {
            // Files that fail to parse are skipped, not fatal.
            if let Ok(contents) = fs::read_to_string(entry.path()) {
                if let Ok(entity) = serde_yml::from_str::<T>(&contents) {
                    entities.push(entity);
                }
            }
        }

        Ok(entities)
    }

    fn load_regime(&self, key: &RegimeKey) -> Result<Option<RegimeRecord>, StoreError> {
        let path = self.regime_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)?;
        serde_yml::from_str(&contents)
            .map(Some)
            .map_err(|e| StoreError::Yaml(e.to_string()))
    }

    fn save_regime(&self, record: &RegimeRecord, expected: u64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().expect("store lock poisoned");
        let path = self.regime_path(&record.key);
        let found = self.load_regime(&record.key)?.map(|r| r.version);
        Self::check_version(found, expected)?;
        self.write_yaml(&path, record)
    }
}

impl InspectionPlanProvider for FsStore {
    fn plan_for(&self, id: &EntityId) -> Result<InspectionPlan, ProviderError> {
        self.load(id)
            .map_err(|_| ProviderError::NotFound(id.to_string()))
    }
}
