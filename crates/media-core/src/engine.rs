//! Consistency engine for media rows and their files.
//!
//! Every mutating operation ends in [`ConsistencyEngine::rename_all`], which
//! brings each file name back in line with its asset's position.
//!
//! # Rename protocol
//!
//! ```text
//! plan      position-ordered rows ──► target folder/filename per asset
//! phase 1   source ──► .quarantine.<n>.<rand>.<name>   (any failure: undo all, abort)
//! phase 2   quarantine ──► target, then row update     (failure: undo that asset only)
//! ```
//!
//! The file move is the source of truth; the row update right after it
//! finalizes the asset. Nothing runs between the two.
//!
//! The engine does not serialize callers. Two mutations of the same entity
//! must not overlap; see [`crate::EntityLocks`].

use crate::config::{MediaConfig, MediaLayout};
use crate::error::{FilePhase, MediaError, Result};
use crate::files::{remove_if_present, MediaFileOps};
use crate::naming::{extension_of, synthesize, FolderCandidates, FolderResolver, MediaUrl};
use crate::store::{DescriptorSource, MediaRecordStore};
use crate::types::{EntityDescriptor, EntityKey, MediaAsset, NewMediaAsset};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

static QUARANTINE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// An uploaded file waiting to be attached to an entity.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub entity: EntityKey,
    /// Already validated and persisted by the caller.
    pub temp_path: PathBuf,
    /// Original extension, with or without the dot.
    pub extension: String,
    pub alt: Option<String>,
    /// Overrides the descriptor lookup when given.
    pub descriptor: Option<EntityDescriptor>,
}

/// Why an asset did not reach its target during a rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameFailureKind {
    /// The move to the target failed; the file is back at its old path.
    MoveFailed,
    /// The move failed and the file could not go back either. The row now
    /// points at the quarantine file.
    LeftInQuarantine,
    /// The file reached its target but the row update failed.
    StoreAfterMove,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameFailure {
    pub asset_id: i64,
    pub kind: RenameFailureKind,
    pub path: PathBuf,
    pub message: String,
}

/// What one rename pass did.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameReport {
    /// Files moved to a new path (with their rows updated).
    pub moved: usize,
    /// Rows updated without a file move.
    pub rows_updated: usize,
    pub unchanged: usize,
    /// Rows whose file could not be found anywhere; their position is still renumbered.
    pub missing_files: Vec<i64>,
    pub failures: Vec<RenameFailure>,
}

impl RenameReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Where an asset's file physically is.
#[derive(Debug, Clone)]
struct Located {
    folder: String,
    path: PathBuf,
}

/// One asset whose file has to move.
#[derive(Debug)]
struct PlannedMove {
    asset_id: i64,
    source: Located,
    target_path: PathBuf,
    target_url: String,
    target_position: u32,
}

/// One asset parked in quarantine during phase 1.
#[derive(Debug)]
struct Quarantined {
    planned: PlannedMove,
    temp_path: PathBuf,
    temp_name: String,
}

/// Orchestrates uploads, deletes, reorders, and renames for entity media.
pub struct ConsistencyEngine {
    pub(crate) layout: MediaLayout,
    pub(crate) store: Arc<dyn MediaRecordStore>,
    pub(crate) files: Arc<dyn MediaFileOps>,
    pub(crate) descriptors: Arc<dyn DescriptorSource>,
}

impl ConsistencyEngine {
    pub fn new(
        layout: MediaLayout,
        store: Arc<dyn MediaRecordStore>,
        files: Arc<dyn MediaFileOps>,
        descriptors: Arc<dyn DescriptorSource>,
    ) -> Self {
        Self {
            layout,
            store,
            files,
            descriptors,
        }
    }

    pub fn layout(&self) -> &MediaLayout {
        &self.layout
    }

    pub fn store(&self) -> &dyn MediaRecordStore {
        self.store.as_ref()
    }

    // ========================================
    // Lookups
    // ========================================

    /// Fetch one asset.
    pub fn get(&self, asset_id: i64) -> Result<MediaAsset> {
        self.store
            .get(asset_id)?
            .ok_or(MediaError::AssetNotFound { id: asset_id })
    }

    /// The entity's descriptor, or one carrying only the entity id.
    pub fn descriptor_for(&self, entity: &EntityKey) -> Result<EntityDescriptor> {
        Ok(self
            .descriptors
            .describe(entity)?
            .unwrap_or_else(|| EntityDescriptor::with_identifier(&entity.entity_id)))
    }

    pub(crate) fn candidates_for(
        entity: &EntityKey,
        descriptor: &EntityDescriptor,
    ) -> FolderCandidates {
        FolderCandidates::for_identifier(descriptor.folder_key(&entity.entity_id))
    }

    fn current_folder(entity: &EntityKey, candidates: &FolderCandidates) -> Result<String> {
        candidates.current().map(String::from).ok_or_else(|| {
            MediaError::validation(
                "entity_id",
                format!("{} has no usable folder name", entity),
            )
        })
    }

    fn validate_entity(&self, entity: &EntityKey) -> Result<()> {
        if entity.entity_id.trim().is_empty() {
            return Err(MediaError::validation("entity_id", "must not be empty"));
        }
        if self.layout.type_folder(&entity.entity_type).is_empty() {
            return Err(MediaError::validation(
                "entity_type",
                format!("{:?} has no usable folder name", entity.entity_type),
            ));
        }
        Ok(())
    }

    /// Find an asset's file: its URL's path first, then the same filename
    /// under every candidate folder.
    pub(crate) fn locate(
        &self,
        asset: &MediaAsset,
        candidates: &FolderCandidates,
    ) -> Option<(String, PathBuf)> {
        self.locate_file(asset, candidates)
            .map(|located| (located.folder, located.path))
    }

    fn locate_file(&self, asset: &MediaAsset, candidates: &FolderCandidates) -> Option<Located> {
        let url = MediaUrl::parse(&asset.url)?;
        if url.type_folder == self.layout.type_folder(&asset.entity_type) {
            if let Some(path) = self.layout.path_for(&url) {
                if self.files.is_file(&path) {
                    return Some(Located {
                        folder: url.folder,
                        path,
                    });
                }
            }
        }
        candidates.names().find_map(|folder| {
            let path = self
                .layout
                .folder_dir(&asset.entity_type, folder)
                .join(&url.filename);
            self.files.is_file(&path).then(|| Located {
                folder: folder.to_string(),
                path,
            })
        })
    }

    // ========================================
    // Upload
    // ========================================

    /// Attach an uploaded file to an entity at the next free position.
    ///
    /// If the move fails the temp file stays where it was and no row is
    /// written.
    pub fn upload(&self, request: &UploadRequest) -> Result<MediaAsset> {
        let entity = &request.entity;
        self.validate_entity(entity)?;
        if !self.files.is_file(&request.temp_path) {
            return Err(MediaError::validation(
                "temp_path",
                format!("{} is not a regular file", request.temp_path.display()),
            ));
        }

        let descriptor = match &request.descriptor {
            Some(d) => d.clone(),
            None => self.descriptor_for(entity)?,
        };
        let position = match self.store.max_position(entity)? {
            Some(max) => max + 1,
            None => 0,
        };

        let resolver = FolderResolver::new(&self.layout, self.files.as_ref());
        let folder = resolver
            .resolve_existing(&entity.entity_type, descriptor.folder_key(&entity.entity_id))
            .ok_or_else(|| {
                MediaError::validation("entity_id", format!("{} has no usable folder name", entity))
            })?;
        let folder_dir = self.layout.folder_dir(&entity.entity_type, &folder);
        if !self.files.is_dir(&folder_dir) {
            self.files
                .create_dir_all(&folder_dir)
                .map_err(|e| MediaError::file_op(FilePhase::Upload, None, &folder_dir, e))?;
        }

        let filename = synthesize(&descriptor, position, &request.extension);
        let target = folder_dir.join(&filename);
        if self.files.exists(&target) {
            warn!("Replacing unexpected file at {}", target.display());
            self.files
                .remove_file(&target)
                .map_err(|e| MediaError::file_op(FilePhase::Upload, None, &target, e))?;
        }
        self.files
            .move_file(&request.temp_path, &target)
            .map_err(|e| MediaError::file_op(FilePhase::Upload, None, &target, e))?;

        let url = self
            .layout
            .url_for(&entity.entity_type, &folder, &filename)
            .to_string();
        let inserted = self.store.insert(&NewMediaAsset {
            entity_type: entity.entity_type.clone(),
            entity_id: entity.entity_id.clone(),
            url,
            alt: request.alt.clone(),
            position,
        });

        match inserted {
            Ok(asset) => {
                info!("Uploaded media {} for {} at position {}", asset.id, entity, position);
                Ok(asset)
            }
            Err(e) => {
                if let Err(undo) = self.files.move_file(&target, &request.temp_path) {
                    error!(
                        "Upload row insert failed and {} could not be returned to {}: {}",
                        target.display(),
                        request.temp_path.display(),
                        undo
                    );
                }
                Err(e)
            }
        }
    }

    // ========================================
    // Delete
    // ========================================

    /// Remove an asset and its file, then renumber the survivors.
    ///
    /// A missing file is not an error. Once the row is gone it stays gone; a
    /// failed renumbering is reported as a retryable error and is repaired
    /// by the next rename of the entity.
    pub fn delete(&self, asset_id: i64) -> Result<RenameReport> {
        let asset = self.get(asset_id)?;
        let entity = asset.entity();
        let descriptor = self.descriptor_for(&entity)?;
        let candidates = Self::candidates_for(&entity, &descriptor);
        // The survivors' rename needs a folder; reject before removing anything.
        Self::current_folder(&entity, &candidates)?;

        if let Some(located) = self.locate_file(&asset, &candidates) {
            match remove_if_present(self.files.as_ref(), &located.path) {
                Ok(_) => debug!("Removed {}", located.path.display()),
                Err(e) => warn!(
                    "Could not remove {} for media {}: {}",
                    located.path.display(),
                    asset_id,
                    e
                ),
            }
        }
        self.store.delete(asset_id)?;
        info!("Deleted media {} of {}", asset_id, entity);

        if self.store.max_position(&entity)?.is_none() {
            return Ok(RenameReport::default());
        }
        let report = self.rename_all(&entity, &descriptor)?;
        Self::ensure_complete(&entity, report)
    }

    // ========================================
    // Reorder / preview / alt
    // ========================================

    /// Give each listed asset the position of its index in `ordered_ids`.
    ///
    /// The list must name every asset of the entity exactly once.
    pub fn reorder(&self, entity: &EntityKey, ordered_ids: &[i64]) -> Result<RenameReport> {
        self.validate_entity(entity)?;
        if ordered_ids.is_empty() {
            return Err(MediaError::validation("order", "must not be empty"));
        }

        let assets = self.store.list_by_entity(entity)?;
        let mut seen = HashSet::with_capacity(ordered_ids.len());
        for id in ordered_ids {
            if !seen.insert(*id) {
                return Err(MediaError::validation("order", format!("media {} listed twice", id)));
            }
            if !assets.iter().any(|a| a.id == *id) {
                return Err(MediaError::validation(
                    "order",
                    format!("media {} does not belong to {}", id, entity),
                ));
            }
        }
        if seen.len() != assets.len() {
            return Err(MediaError::validation(
                "order",
                format!("expected {} ids, got {}", assets.len(), seen.len()),
            ));
        }

        self.apply_order(entity, &assets, ordered_ids)
    }

    /// Move an asset to position 0, keeping the others in their order.
    pub fn set_preview(&self, asset_id: i64) -> Result<RenameReport> {
        let asset = self.get(asset_id)?;
        if asset.is_preview() {
            debug!("Media {} is already the preview", asset_id);
            return Ok(RenameReport::default());
        }

        let entity = asset.entity();
        let assets = self.store.list_by_entity(&entity)?;
        let order: Vec<i64> = std::iter::once(asset_id)
            .chain(assets.iter().map(|a| a.id).filter(|id| *id != asset_id))
            .collect();

        self.apply_order(&entity, &assets, &order)
    }

    /// Replace an asset's alt text.
    pub fn set_alt(&self, asset_id: i64, alt: Option<&str>) -> Result<MediaAsset> {
        let alt = alt.map(str::trim).filter(|a| !a.is_empty());
        self.store.update_alt(asset_id, alt)?;
        self.get(asset_id)
    }

    fn apply_order(
        &self,
        entity: &EntityKey,
        assets: &[MediaAsset],
        order: &[i64],
    ) -> Result<RenameReport> {
        let descriptor = self.descriptor_for(entity)?;
        Self::current_folder(entity, &Self::candidates_for(entity, &descriptor))?;

        for (index, id) in order.iter().enumerate() {
            let position = index as u32;
            if let Some(asset) = assets.iter().find(|a| a.id == *id) {
                if asset.position != position {
                    self.store.update_url_and_position(asset.id, &asset.url, position)?;
                }
            }
        }
        info!("Reordered {} media of {}", order.len(), entity);

        let report = self.rename_all(entity, &descriptor)?;
        Self::ensure_complete(entity, report)
    }

    fn ensure_complete(entity: &EntityKey, report: RenameReport) -> Result<RenameReport> {
        if report.is_complete() {
            Ok(report)
        } else {
            Err(MediaError::PartialRename {
                entity: entity.to_string(),
                failed: report.failures.len(),
            })
        }
    }

    // ========================================
    // Rename protocol
    // ========================================

    /// Bring every file name of an entity in line with its position.
    ///
    /// Positions are renumbered `0..n` in current order and every file ends
    /// up in the current-scheme folder. A phase-1 failure puts everything
    /// back and returns an error; phase-2 failures are per asset and are
    /// listed in the report.
    pub fn rename_all(
        &self,
        entity: &EntityKey,
        descriptor: &EntityDescriptor,
    ) -> Result<RenameReport> {
        let assets = self.store.list_by_entity(entity)?;
        let candidates = Self::candidates_for(entity, descriptor);
        let folder = Self::current_folder(entity, &candidates)?;
        let target_dir = self.layout.folder_dir(&entity.entity_type, &folder);

        let mut report = RenameReport::default();
        let mut plan = Vec::new();
        // Paths that hold a file some row still relies on.
        let mut protected: HashSet<PathBuf> = HashSet::new();

        for (index, asset) in assets.iter().enumerate() {
            let position = index as u32;
            let current_name = MediaUrl::parse(&asset.url)
                .map(|u| u.filename)
                .unwrap_or_default();
            let filename = synthesize(descriptor, position, extension_of(&current_name));
            let target_path = target_dir.join(&filename);
            let target_url = self
                .layout
                .url_for(&entity.entity_type, &folder, &filename)
                .to_string();

            let Some(source) = self.locate_file(asset, &candidates) else {
                warn!("File for media {} ({}) not found", asset.id, asset.url);
                report.missing_files.push(asset.id);
                if asset.position != position {
                    self.store.update_url_and_position(asset.id, &asset.url, position)?;
                    report.rows_updated += 1;
                }
                continue;
            };

            if source.path == target_path {
                protected.insert(source.path);
                if asset.url != target_url || asset.position != position {
                    self.store.update_url_and_position(asset.id, &target_url, position)?;
                    report.rows_updated += 1;
                } else {
                    report.unchanged += 1;
                }
                continue;
            }

            plan.push(PlannedMove {
                asset_id: asset.id,
                source,
                target_path,
                target_url,
                target_position: position,
            });
        }

        if plan.is_empty() {
            debug!("Media of {} already match their names", entity);
            return Ok(report);
        }

        if !self.files.is_dir(&target_dir) {
            self.files
                .create_dir_all(&target_dir)
                .map_err(|e| MediaError::file_op(FilePhase::Prepare, None, &target_dir, e))?;
        }

        let quarantined = self.quarantine(entity, plan)?;
        self.commit(entity, quarantined, &mut protected, &mut report);

        info!(
            "Renamed media of {}: {} moved, {} rows updated, {} failed",
            entity,
            report.moved,
            report.rows_updated,
            report.failures.len()
        );
        Ok(report)
    }

    /// Phase 1: park every file that must move under a collision-free name.
    fn quarantine(&self, entity: &EntityKey, plan: Vec<PlannedMove>) -> Result<Vec<Quarantined>> {
        let mut parked: Vec<Quarantined> = Vec::with_capacity(plan.len());

        for planned in plan {
            let original_name = planned
                .source
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let temp_name = quarantine_name(&original_name);
            let temp_path = planned.source.path.with_file_name(&temp_name);

            if let Err(e) = self.files.move_file(&planned.source.path, &temp_path) {
                warn!(
                    "Quarantine of media {} failed, restoring {} file(s) of {}: {}",
                    planned.asset_id,
                    parked.len(),
                    entity,
                    e
                );
                self.restore_quarantined(&parked);
                return Err(MediaError::file_op(
                    FilePhase::Quarantine,
                    Some(planned.asset_id),
                    &planned.source.path,
                    e,
                ));
            }
            debug!(
                "Quarantined media {}: {} -> {}",
                planned.asset_id,
                planned.source.path.display(),
                temp_path.display()
            );
            parked.push(Quarantined {
                planned,
                temp_path,
                temp_name,
            });
        }

        Ok(parked)
    }

    fn restore_quarantined(&self, parked: &[Quarantined]) {
        for entry in parked.iter().rev() {
            if let Err(e) = self
                .files
                .move_file(&entry.temp_path, &entry.planned.source.path)
            {
                error!(
                    "Could not restore media {} from {} to {}: {}",
                    entry.planned.asset_id,
                    entry.temp_path.display(),
                    entry.planned.source.path.display(),
                    e
                );
                self.point_row_at_quarantine(entry);
            }
        }
    }

    /// Phase 2: move each parked file to its target and finalize its row.
    fn commit(
        &self,
        entity: &EntityKey,
        parked: Vec<Quarantined>,
        protected: &mut HashSet<PathBuf>,
        report: &mut RenameReport,
    ) {
        for entry in parked {
            let planned = &entry.planned;

            if let Err(message) = self.clear_target(planned, protected) {
                self.undo_commit(&entry, message, protected, report);
                continue;
            }

            if let Err(e) = self.files.move_file(&entry.temp_path, &planned.target_path) {
                self.undo_commit(&entry, e.to_string(), protected, report);
                continue;
            }

            match self.store.update_url_and_position(
                planned.asset_id,
                &planned.target_url,
                planned.target_position,
            ) {
                Ok(()) => {
                    debug!(
                        "Media {} of {} now at {}",
                        planned.asset_id,
                        entity,
                        planned.target_path.display()
                    );
                    protected.insert(planned.target_path.clone());
                    report.moved += 1;
                }
                Err(e) => {
                    let err = MediaError::StoreAfterMove {
                        asset_id: planned.asset_id,
                        path: planned.target_path.clone(),
                        message: e.to_string(),
                    };
                    error!("Irrecoverable media inconsistency: {}", err);
                    protected.insert(planned.target_path.clone());
                    report.failures.push(RenameFailure {
                        asset_id: planned.asset_id,
                        kind: RenameFailureKind::StoreAfterMove,
                        path: planned.target_path.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    /// Remove a stale file at the target unless a row still relies on it.
    fn clear_target(
        &self,
        planned: &PlannedMove,
        protected: &HashSet<PathBuf>,
    ) -> std::result::Result<(), String> {
        if !self.files.exists(&planned.target_path) {
            return Ok(());
        }
        if protected.contains(&planned.target_path) {
            return Err(format!(
                "{} is held by another media file",
                planned.target_path.display()
            ));
        }
        warn!("Removing stale file {}", planned.target_path.display());
        self.files
            .remove_file(&planned.target_path)
            .map_err(|e| e.to_string())
    }

    fn undo_commit(
        &self,
        entry: &Quarantined,
        message: String,
        protected: &mut HashSet<PathBuf>,
        report: &mut RenameReport,
    ) {
        let planned = &entry.planned;
        warn!(
            "Commit of media {} to {} failed: {}",
            planned.asset_id,
            planned.target_path.display(),
            message
        );

        let kind = match self.files.move_file(&entry.temp_path, &planned.source.path) {
            Ok(()) => {
                protected.insert(planned.source.path.clone());
                RenameFailureKind::MoveFailed
            }
            Err(e) => {
                error!(
                    "Could not return media {} to {}: {}",
                    planned.asset_id,
                    planned.source.path.display(),
                    e
                );
                self.point_row_at_quarantine(entry);
                protected.insert(entry.temp_path.clone());
                RenameFailureKind::LeftInQuarantine
            }
        };

        report.failures.push(RenameFailure {
            asset_id: planned.asset_id,
            kind,
            path: planned.target_path.clone(),
            message,
        });
    }

    /// Keep a row pointing at an existing file when its file is stuck in quarantine.
    fn point_row_at_quarantine(&self, entry: &Quarantined) {
        let Some(url) = self.quarantine_url(entry) else {
            return;
        };
        if let Err(e) = self.store.update_url(entry.planned.asset_id, &url) {
            error!(
                "Irrecoverable media inconsistency: media {} is at {} but its row could not follow: {}",
                entry.planned.asset_id,
                entry.temp_path.display(),
                e
            );
        }
    }

    fn quarantine_url(&self, entry: &Quarantined) -> Option<String> {
        let type_dir = entry.temp_path.parent()?.parent()?;
        let type_folder = type_dir.file_name()?.to_string_lossy().into_owned();
        Some(
            MediaUrl {
                mount: self.layout.mount().to_string(),
                type_folder,
                folder: entry.planned.source.folder.clone(),
                filename: entry.temp_name.clone(),
            }
            .to_string(),
        )
    }
}

/// Unique quarantine file name for `original` in the same folder.
fn quarantine_name(original: &str) -> String {
    let n = QUARANTINE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "{}.{}.{}.{}",
        MediaConfig::QUARANTINE_PREFIX,
        n,
        &nonce[..12],
        original
    )
}

/// Whether a file name was produced by the quarantine phase.
pub fn is_quarantine_name(name: &str) -> bool {
    name.starts_with(MediaConfig::QUARANTINE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::LocalFileOps;
    use crate::store::{MemoryDescriptors, SqliteMediaStore};
    use tempfile::TempDir;

    fn setup() -> (TempDir, ConsistencyEngine) {
        let temp_dir = TempDir::new().unwrap();
        let engine = ConsistencyEngine::new(
            MediaLayout::new(temp_dir.path().join("storage"), "uploads"),
            Arc::new(SqliteMediaStore::in_memory().unwrap()),
            Arc::new(LocalFileOps),
            Arc::new(MemoryDescriptors::new()),
        );
        (temp_dir, engine)
    }

    #[test]
    fn test_quarantine_names_are_unique() {
        let a = quarantine_name("sku-1_1.jpg");
        let b = quarantine_name("sku-1_1.jpg");
        assert_ne!(a, b);
        assert!(is_quarantine_name(&a));
        assert!(a.ends_with(".sku-1_1.jpg"));
        assert!(!is_quarantine_name("sku-1_1.jpg"));
    }

    #[test]
    fn test_descriptor_defaults_to_entity_id() {
        let (_dir, engine) = setup();
        let descriptor = engine
            .descriptor_for(&EntityKey::new("modules", "42"))
            .unwrap();
        assert_eq!(descriptor.identifier, "42");
        assert_eq!(descriptor.name, None);
    }

    #[test]
    fn test_rename_all_on_empty_entity() {
        let (_dir, engine) = setup();
        let report = engine
            .rename_all(
                &EntityKey::new("modules", "42"),
                &EntityDescriptor::with_identifier("42"),
            )
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.moved + report.rows_updated + report.unchanged, 0);
    }

    #[test]
    fn test_missing_file_still_renumbered() {
        let (_dir, engine) = setup();
        let entity = EntityKey::new("modules", "42");
        let asset = engine
            .store()
            .insert(&NewMediaAsset {
                entity_type: "modules".into(),
                entity_id: "42".into(),
                url: "/uploads/modules/42/42_3.jpg".into(),
                alt: None,
                position: 2,
            })
            .unwrap();

        let report = engine
            .rename_all(&entity, &EntityDescriptor::with_identifier("42"))
            .unwrap();
        assert_eq!(report.missing_files, vec![asset.id]);
        assert_eq!(report.rows_updated, 1);
        assert_eq!(engine.get(asset.id).unwrap().position, 0);
    }

    #[test]
    fn test_unnameable_entity_rejected_before_any_change() {
        let (_dir, engine) = setup();
        let folder = engine.layout().folder_dir("modules", "x");
        std::fs::create_dir_all(&folder).unwrap();
        let mut ids = Vec::new();
        for position in 0..2u32 {
            let filename = format!("x_{}.jpg", position + 1);
            std::fs::write(folder.join(&filename), b"img").unwrap();
            let asset = engine
                .store()
                .insert(&NewMediaAsset {
                    entity_type: "modules".into(),
                    entity_id: String::new(),
                    url: format!("/uploads/modules/x/{}", filename),
                    alt: None,
                    position,
                })
                .unwrap();
            ids.push(asset.id);
        }
        let entity = EntityKey::new("modules", "");
        let before = engine.store().list_by_entity(&entity).unwrap();

        let err = engine.delete(ids[0]).unwrap_err();
        assert!(matches!(err, MediaError::Validation { .. }));
        let err = engine.set_preview(ids[1]).unwrap_err();
        assert!(matches!(err, MediaError::Validation { .. }));

        assert_eq!(engine.store().list_by_entity(&entity).unwrap(), before);
        assert!(folder.join("x_1.jpg").exists());
        assert!(folder.join("x_2.jpg").exists());
    }

    #[test]
    fn test_reorder_rejects_blank_entity() {
        let (_dir, engine) = setup();
        let err = engine
            .reorder(&EntityKey::new("modules", ""), &[1])
            .unwrap_err();
        assert!(matches!(err, MediaError::Validation { .. }));
    }
}
