//! Core data types for catalog media.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Owning entity of a set of media assets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityKey {
    /// Discriminator such as "modules" or "kits".
    pub entity_type: String,
    pub entity_id: String,
}

impl EntityKey {
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}

/// One stored media row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: String,
    /// `/<mount>/<type>/<folder>/<filename>`
    pub url: String,
    pub alt: Option<String>,
    /// Zero-based rank; 0 is the preview.
    pub position: u32,
}

impl MediaAsset {
    pub fn entity(&self) -> EntityKey {
        EntityKey::new(&self.entity_type, &self.entity_id)
    }

    pub fn is_preview(&self) -> bool {
        self.position == 0
    }
}

/// A row to be inserted; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMediaAsset {
    pub entity_type: String,
    pub entity_id: String,
    pub url: String,
    pub alt: Option<String>,
    pub position: u32,
}

/// Read-only description of the owning entity, used to name files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDescriptor {
    /// SKU-like identifier; also keys the entity folder.
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub color_secondary: Option<String>,
}

impl EntityDescriptor {
    pub fn with_identifier(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    /// The key used to resolve the entity folder.
    ///
    /// Falls back to the entity id when the descriptor has no identifier.
    pub fn folder_key<'a>(&'a self, entity_id: &'a str) -> &'a str {
        if self.identifier.trim().is_empty() {
            entity_id
        } else {
            &self.identifier
        }
    }
}
