//! Relational side of media assets.
//!
//! [`MediaRecordStore`] is the row CRUD the engine runs against, and
//! [`DescriptorSource`] is the read-only lookup into the owning entities'
//! own tables. Both assume a single serialized query channel.

mod descriptors;
mod sqlite;

pub use descriptors::{MemoryDescriptors, SqliteDescriptorSource};
pub use sqlite::SqliteMediaStore;

use crate::error::Result;
use crate::types::{EntityDescriptor, EntityKey, MediaAsset, NewMediaAsset};

/// CRUD over media rows.
pub trait MediaRecordStore: Send + Sync {
    /// All assets of an entity ordered by position, then id.
    fn list_by_entity(&self, entity: &EntityKey) -> Result<Vec<MediaAsset>>;

    /// All assets of one entity type, for sweeps.
    fn list_by_type(&self, entity_type: &str) -> Result<Vec<MediaAsset>>;

    fn get(&self, id: i64) -> Result<Option<MediaAsset>>;

    /// Insert a row and return it with its assigned id.
    fn insert(&self, asset: &NewMediaAsset) -> Result<MediaAsset>;

    fn update_url_and_position(&self, id: i64, url: &str, position: u32) -> Result<()>;

    /// Rewrite the URL only; position is left untouched.
    fn update_url(&self, id: i64, url: &str) -> Result<()>;

    fn update_alt(&self, id: i64, alt: Option<&str>) -> Result<()>;

    /// Remove a row. Returns whether it existed.
    fn delete(&self, id: i64) -> Result<bool>;

    /// Highest position among an entity's assets, if it has any.
    fn max_position(&self, entity: &EntityKey) -> Result<Option<u32>>;
}

/// Read-only lookup of entity descriptors.
pub trait DescriptorSource: Send + Sync {
    fn describe(&self, entity: &EntityKey) -> Result<Option<EntityDescriptor>>;
}
