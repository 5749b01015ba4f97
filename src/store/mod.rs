//! Durable storage for quality records.
//!
//! The engine treats persistence as a collaborator behind the
//! [`DocumentStore`] trait: YAML documents keyed by entity ID, plus the
//! keyed switching-rule regime records. Versioned saves implement
//! optimistic concurrency: the caller passes the revision it loaded,
//! and a mismatch surfaces as [`StoreError::Conflict`] for the caller to
//! retry after re-reading. A conflicting write is never dropped or
//! reordered silently.

pub mod fs;
pub mod memory;

use thiserror::Error;

use crate::core::entity::Entity;
use crate::core::identity::EntityId;
use crate::sampling::{RegimeKey, RegimeRecord};

pub use fs::FsStore;
pub use memory::MemoryStore;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no {kind} record found matching '{key}'")]
    NotFound { kind: &'static str, key: String },

    #[error("concurrent update detected: expected revision {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },

    #[error("ambiguous identifier '{0}' matches more than one record")]
    Ambiguous(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(String),
}

/// Version expected by a creating write: the record must not exist yet.
pub const NEW_RECORD: u64 = 0;

/// Key-value document storage for quality records.
///
/// Implementations serialize entities as YAML documents. `expected`
/// arguments carry the revision the caller loaded ([`NEW_RECORD`] when
/// creating); the write fails with [`StoreError::Conflict`] if the
/// stored revision has moved.
pub trait DocumentStore {
    /// Persist an entity unconditionally (initial creation)
    fn save<T: Entity>(&self, entity: &T) -> Result<(), StoreError>;

    /// Persist a mutated entity if the stored copy is still at the
    /// revision the caller loaded
    fn save_versioned<T: Entity>(&self, entity: &T, expected: u64) -> Result<(), StoreError>;

    /// Load an entity by ID
    fn load<T: Entity>(&self, id: &EntityId) -> Result<T, StoreError>;

    /// Load every entity of one type
    fn list<T: Entity>(&self) -> Result<Vec<T>, StoreError>;

    /// Load the switching-rule regime record for a key, if one exists
    fn load_regime(&self, key: &RegimeKey) -> Result<Option<RegimeRecord>, StoreError>;

    /// Persist a regime record with the same optimistic check as
    /// `save_versioned`
    fn save_regime(&self, record: &RegimeRecord, expected: u64) -> Result<(), StoreError>;
}
