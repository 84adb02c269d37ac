//! Reconciliation sweep between media rows and the file store.
//!
//! The rename protocol has one window it cannot close on its own: a file
//! that moved while its row update failed. The sweep finds such leftovers by
//! comparing every row of an entity type against the files under its folder.
//! It never rewrites rows.

use crate::engine::{is_quarantine_name, ConsistencyEngine};
use crate::error::{MediaError, Result};
use crate::files::remove_if_present;
use crate::types::EntityKey;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Findings of one sweep.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub entity_type: String,
    pub assets_checked: usize,
    /// Files under the type folder that no row points at.
    pub orphan_files: Vec<PathBuf>,
    /// Rows whose file cannot be found.
    pub dangling_assets: Vec<i64>,
    /// Leftover quarantine files no row points at.
    pub quarantine_files: Vec<PathBuf>,
    /// Quarantine files removed by this sweep.
    pub purged: usize,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.orphan_files.is_empty()
            && self.dangling_assets.is_empty()
            && self.quarantine_files.is_empty()
    }
}

impl ConsistencyEngine {
    /// Compare rows and files for one entity type.
    ///
    /// With `purge_quarantine`, leftover quarantine files that no row points
    /// at are deleted. Must not run while a rename of the same type is in
    /// flight, or its quarantine files will be reported.
    pub fn reconcile(&self, entity_type: &str, purge_quarantine: bool) -> Result<ReconcileReport> {
        let type_dir = self.layout.type_dir(entity_type);
        if self.layout.type_folder(entity_type).is_empty() {
            return Err(MediaError::validation(
                "entity_type",
                format!("{:?} has no usable folder name", entity_type),
            ));
        }

        let assets = self.store.list_by_type(entity_type)?;
        let mut report = ReconcileReport {
            entity_type: entity_type.to_string(),
            assets_checked: assets.len(),
            ..ReconcileReport::default()
        };

        let mut candidates_by_entity = HashMap::new();
        let mut known: HashSet<PathBuf> = HashSet::with_capacity(assets.len());
        for asset in &assets {
            let entity = asset.entity();
            if !candidates_by_entity.contains_key(&entity) {
                let descriptor = self.descriptor_for(&entity)?;
                let candidates = Self::candidates_for(&entity, &descriptor);
                candidates_by_entity.insert(entity.clone(), candidates);
            }
            let candidates = &candidates_by_entity[&entity];
            match self.locate(asset, candidates) {
                Some((_, path)) => {
                    known.insert(path);
                }
                None => report.dangling_assets.push(asset.id),
            }
        }

        if type_dir.is_dir() {
            for entry in WalkDir::new(&type_dir)
                .min_depth(2)
                .max_depth(2)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let path = entry.path().to_path_buf();
                if known.contains(&path) {
                    continue;
                }
                let name = entry.file_name().to_string_lossy();
                if !is_quarantine_name(&name) {
                    report.orphan_files.push(path);
                    continue;
                }
                if purge_quarantine {
                    match remove_if_present(self.files.as_ref(), &path) {
                        Ok(_) => report.purged += 1,
                        Err(e) => {
                            warn!("Could not purge {}: {}", path.display(), e);
                            report.quarantine_files.push(path);
                        }
                    }
                } else {
                    report.quarantine_files.push(path);
                }
            }
        }

        report.orphan_files.sort();
        report.quarantine_files.sort();
        info!(
            "Reconciled {}: {} assets, {} orphan files, {} dangling rows, {} quarantine files, {} purged",
            entity_type,
            report.assets_checked,
            report.orphan_files.len(),
            report.dangling_assets.len(),
            report.quarantine_files.len(),
            report.purged
        );
        Ok(report)
    }

    /// Entities of `entity_type` that have at least one dangling row.
    pub fn entities_needing_repair(&self, report: &ReconcileReport) -> Result<Vec<EntityKey>> {
        let mut entities: Vec<EntityKey> = Vec::new();
        for id in &report.dangling_assets {
            if let Some(asset) = self.store.get(*id)? {
                let entity = asset.entity();
                if !entities.contains(&entity) {
                    entities.push(entity);
                }
            }
        }
        Ok(entities)
    }
}
