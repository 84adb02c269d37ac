//! Entity descriptor lookups.

use super::sqlite::{lock_connection, SqliteMediaStore};
use super::DescriptorSource;
use crate::error::Result;
use crate::types::{EntityDescriptor, EntityKey};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Reads descriptors from the `catalog_entities` table.
///
/// The table (or a view with the same columns) belongs to the catalog; this
/// source only ever selects from it.
pub struct SqliteDescriptorSource {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDescriptorSource {
    /// Share the media store's connection.
    pub fn from_store(store: &SqliteMediaStore) -> Result<Self> {
        let conn = store.connection();
        {
            let guard = lock_connection(&conn)?;
            guard.execute(
                "CREATE TABLE IF NOT EXISTS catalog_entities (
                    entity_type TEXT NOT NULL,
                    entity_id TEXT NOT NULL,
                    identifier TEXT NOT NULL,
                    name TEXT,
                    color TEXT,
                    color_secondary TEXT,
                    PRIMARY KEY (entity_type, entity_id)
                )",
                [],
            )?;
        }
        Ok(Self { conn })
    }
}

impl DescriptorSource for SqliteDescriptorSource {
    fn describe(&self, entity: &EntityKey) -> Result<Option<EntityDescriptor>> {
        let conn = lock_connection(&self.conn)?;
        let descriptor = conn
            .query_row(
                "SELECT identifier, name, color, color_secondary FROM catalog_entities
                 WHERE entity_type = ?1 AND entity_id = ?2",
                params![entity.entity_type, entity.entity_id],
                |row| {
                    Ok(EntityDescriptor {
                        identifier: row.get(0)?,
                        name: row.get(1)?,
                        color: row.get(2)?,
                        color_secondary: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(descriptor)
    }
}

/// Descriptors held in memory.
#[derive(Debug, Default)]
pub struct MemoryDescriptors {
    entries: RwLock<HashMap<EntityKey, EntityDescriptor>>,
}

impl MemoryDescriptors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the descriptor of an entity.
    pub fn insert(&self, entity: EntityKey, descriptor: EntityDescriptor) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(entity, descriptor);
        }
    }
}

impl DescriptorSource for MemoryDescriptors {
    fn describe(&self, entity: &EntityKey) -> Result<Option<EntityDescriptor>> {
        let entries = self.entries.read().map_err(|_| {
            crate::error::MediaError::Other("Descriptor map lock poisoned".to_string())
        })?;
        Ok(entries.get(entity).cloned())
    }
}
