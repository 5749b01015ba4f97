//! Entity trait - common interface for persisted record types

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::EntityId;

/// Common trait for all MQT record types
pub trait Entity: Serialize + DeserializeOwned + 'static {
    /// The entity type prefix (e.g., "NCR", "CHART")
    const PREFIX: &'static str;

    /// Get the entity's unique ID
    fn id(&self) -> &EntityId;

    /// Get the entity's title
    fn title(&self) -> &str;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;

    /// Get the author
    fn author(&self) -> &str;

    /// Current document revision, bumped on every successful mutation.
    /// The store compares this for optimistic concurrency.
    fn version(&self) -> u64;

    /// Bump the document revision after a successful mutation
    fn bump_version(&mut self);
}
