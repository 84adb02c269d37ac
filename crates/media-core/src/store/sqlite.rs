//! SQLite-backed media rows.

use super::MediaRecordStore;
use crate::error::{MediaError, Result};
use crate::types::{EntityKey, MediaAsset, NewMediaAsset};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const SELECT_COLUMNS: &str = "SELECT id, entity_type, entity_id, url, alt, position FROM media";

/// Media rows in SQLite.
///
/// All statements go through one connection behind a mutex, which gives the
/// FIFO query channel the engine expects.
pub struct SqliteMediaStore {
    db_path: Option<PathBuf>,
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMediaStore {
    /// Create or open a store at the given path.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| MediaError::Io {
                    message: format!("Failed to create directory {}", parent.display()),
                    path: Some(parent.to_path_buf()),
                    source: Some(e),
                })?;
            }
        }

        let conn = Connection::open(&db_path)?;
        Self::configure_connection(&conn)?;
        Self::ensure_schema(&conn)?;

        Ok(Self {
            db_path: Some(db_path),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// A private in-memory store.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::ensure_schema(&conn)?;
        Ok(Self {
            db_path: None,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn configure_connection(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA busy_timeout=30000;
            PRAGMA synchronous=NORMAL;
            ",
        )?;
        Ok(())
    }

    fn ensure_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS media (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity_type TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                url TEXT NOT NULL,
                alt TEXT,
                position INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_media_entity
                ON media(entity_type, entity_id, position)",
            [],
        )?;
        Ok(())
    }

    /// Database path, or `None` for an in-memory store.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Shared handle for other readers of the same database.
    pub(crate) fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        lock_connection(&self.conn)
    }

    fn row_to_asset(row: &Row<'_>) -> rusqlite::Result<MediaAsset> {
        Ok(MediaAsset {
            id: row.get(0)?,
            entity_type: row.get(1)?,
            entity_id: row.get(2)?,
            url: row.get(3)?,
            alt: row.get(4)?,
            position: row.get(5)?,
        })
    }

    fn expect_one(changed: usize, id: i64) -> Result<()> {
        if changed == 0 {
            Err(MediaError::AssetNotFound { id })
        } else {
            Ok(())
        }
    }
}

pub(crate) fn lock_connection(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| MediaError::Database {
        message: "Failed to acquire connection lock".to_string(),
        source: None,
    })
}

impl MediaRecordStore for SqliteMediaStore {
    fn list_by_entity(&self, entity: &EntityKey) -> Result<Vec<MediaAsset>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE entity_type = ?1 AND entity_id = ?2 ORDER BY position, id"
        ))?;
        let assets = stmt
            .query_map(params![entity.entity_type, entity.entity_id], Self::row_to_asset)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assets)
    }

    fn list_by_type(&self, entity_type: &str) -> Result<Vec<MediaAsset>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE entity_type = ?1 ORDER BY entity_id, position, id"
        ))?;
        let assets = stmt
            .query_map(params![entity_type], Self::row_to_asset)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(assets)
    }

    fn get(&self, id: i64) -> Result<Option<MediaAsset>> {
        let conn = self.lock()?;
        let asset = conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                Self::row_to_asset,
            )
            .optional()?;
        Ok(asset)
    }

    fn insert(&self, asset: &NewMediaAsset) -> Result<MediaAsset> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO media (entity_type, entity_id, url, alt, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                asset.entity_type,
                asset.entity_id,
                asset.url,
                asset.alt,
                asset.position,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Inserted media {} for {}/{}", id, asset.entity_type, asset.entity_id);

        Ok(MediaAsset {
            id,
            entity_type: asset.entity_type.clone(),
            entity_id: asset.entity_id.clone(),
            url: asset.url.clone(),
            alt: asset.alt.clone(),
            position: asset.position,
        })
    }

    fn update_url_and_position(&self, id: i64, url: &str, position: u32) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE media SET url = ?2, position = ?3 WHERE id = ?1",
            params![id, url, position],
        )?;
        Self::expect_one(changed, id)
    }

    fn update_url(&self, id: i64, url: &str) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("UPDATE media SET url = ?2 WHERE id = ?1", params![id, url])?;
        Self::expect_one(changed, id)
    }

    fn update_alt(&self, id: i64, alt: Option<&str>) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("UPDATE media SET alt = ?2 WHERE id = ?1", params![id, alt])?;
        Self::expect_one(changed, id)
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM media WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    fn max_position(&self, entity: &EntityKey) -> Result<Option<u32>> {
        let conn = self.lock()?;
        let max: Option<u32> = conn.query_row(
            "SELECT MAX(position) FROM media WHERE entity_type = ?1 AND entity_id = ?2",
            params![entity.entity_type, entity.entity_id],
            |row| row.get(0),
        )?;
        Ok(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_asset(entity_id: &str, url: &str, position: u32) -> NewMediaAsset {
        NewMediaAsset {
            entity_type: "modules".to_string(),
            entity_id: entity_id.to_string(),
            url: url.to_string(),
            alt: None,
            position,
        }
    }

    #[test]
    fn test_insert_and_list_ordered() {
        let store = SqliteMediaStore::in_memory().unwrap();
        let entity = EntityKey::new("modules", "7");

        store.insert(&new_asset("7", "/u/m/a/b_2.jpg", 1)).unwrap();
        store.insert(&new_asset("7", "/u/m/a/b_1.jpg", 0)).unwrap();
        store.insert(&new_asset("8", "/u/m/c/d_1.jpg", 0)).unwrap();

        let assets = store.list_by_entity(&entity).unwrap();
        assert_eq!(assets.len(), 2);
        assert_eq!(assets[0].position, 0);
        assert_eq!(assets[0].url, "/u/m/a/b_1.jpg");
        assert_eq!(assets[1].position, 1);

        assert_eq!(store.list_by_type("modules").unwrap().len(), 3);
        assert!(store.list_by_type("kits").unwrap().is_empty());
    }

    #[test]
    fn test_max_position() {
        let store = SqliteMediaStore::in_memory().unwrap();
        let entity = EntityKey::new("modules", "7");
        assert_eq!(store.max_position(&entity).unwrap(), None);

        store.insert(&new_asset("7", "/u/m/a/b_1.jpg", 0)).unwrap();
        store.insert(&new_asset("7", "/u/m/a/b_4.jpg", 3)).unwrap();
        assert_eq!(store.max_position(&entity).unwrap(), Some(3));
    }

    #[test]
    fn test_updates() {
        let store = SqliteMediaStore::in_memory().unwrap();
        let asset = store.insert(&new_asset("7", "/u/m/a/b_1.jpg", 0)).unwrap();

        store.update_url_and_position(asset.id, "/u/m/a/b_2.jpg", 1).unwrap();
        let row = store.get(asset.id).unwrap().unwrap();
        assert_eq!((row.url.as_str(), row.position), ("/u/m/a/b_2.jpg", 1));

        store.update_url(asset.id, "/u/m/z/b_2.jpg").unwrap();
        let row = store.get(asset.id).unwrap().unwrap();
        assert_eq!((row.url.as_str(), row.position), ("/u/m/z/b_2.jpg", 1));

        store.update_alt(asset.id, Some("Front view")).unwrap();
        assert_eq!(
            store.get(asset.id).unwrap().unwrap().alt.as_deref(),
            Some("Front view")
        );
    }

    #[test]
    fn test_update_unknown_id() {
        let store = SqliteMediaStore::in_memory().unwrap();
        let err = store.update_url(99, "/u/m/a/b.jpg").unwrap_err();
        assert!(matches!(err, MediaError::AssetNotFound { id: 99 }));
    }

    #[test]
    fn test_delete() {
        let store = SqliteMediaStore::in_memory().unwrap();
        let asset = store.insert(&new_asset("7", "/u/m/a/b_1.jpg", 0)).unwrap();

        assert!(store.delete(asset.id).unwrap());
        assert!(!store.delete(asset.id).unwrap());
        assert!(store.get(asset.id).unwrap().is_none());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("media.db");

        let id = {
            let store = SqliteMediaStore::new(&db_path).unwrap();
            store.insert(&new_asset("7", "/u/m/a/b_1.jpg", 0)).unwrap().id
        };

        let store = SqliteMediaStore::new(&db_path).unwrap();
        assert_eq!(store.db_path(), Some(db_path.as_path()));
        assert!(store.get(id).unwrap().is_some());
    }
}
