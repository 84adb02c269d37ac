//! Read-path repair of legacy media URLs.
//!
//! Deployments that predate the current naming scheme still have rows whose
//! URL names a legacy folder. Listing an entity rewrites such URLs to the
//! current-scheme folder without touching the file; the next rename of the
//! entity moves the file itself.

use crate::engine::ConsistencyEngine;
use crate::error::Result;
use crate::naming::{FolderCandidates, MediaUrl, Scheme};
use crate::types::{EntityKey, MediaAsset};
use tracing::{debug, info, warn};

/// Rewrites legacy-folder URLs of one entity to its current-scheme folder.
///
/// Idempotent: once every URL names the current folder there is nothing
/// left to heal.
pub struct LazyPathHealer<'a> {
    engine: &'a ConsistencyEngine,
}

impl<'a> LazyPathHealer<'a> {
    pub fn new(engine: &'a ConsistencyEngine) -> Self {
        Self { engine }
    }

    /// Heal `assets` in place. Returns how many rows were rewritten.
    ///
    /// A URL is rewritten when its folder is a legacy candidate of the
    /// entity and the file can be found either under the current folder or
    /// at the legacy URL itself. Store failures are logged and leave the
    /// row as it was.
    pub fn heal(&self, candidates: &FolderCandidates, assets: &mut [MediaAsset]) -> usize {
        let Some(current) = candidates.current() else {
            return 0;
        };
        let layout = &self.engine.layout;
        let files = self.engine.files.as_ref();
        let mut healed = 0;

        for asset in assets.iter_mut() {
            let Some(url) = MediaUrl::parse(&asset.url) else {
                continue;
            };
            if url.folder == current || url.type_folder != layout.type_folder(&asset.entity_type) {
                continue;
            }
            match candidates.scheme_of(&url.folder) {
                Some(Scheme::LegacyAscii) | Some(Scheme::LegacyUnicode) => {}
                _ => continue,
            }

            let canonical = url.with_folder(current);
            let in_current = layout
                .path_for(&canonical)
                .is_some_and(|p| files.is_file(&p));
            // A file only at the legacy path leaves the rewritten row pointing
            // at a missing path; locate_file finds it by filename across the
            // candidate folders until RenameAll moves it.
            let at_legacy = layout.path_for(&url).is_some_and(|p| files.is_file(&p));
            if !in_current && !at_legacy {
                debug!("Media {} has a legacy URL but no file: {}", asset.id, asset.url);
                continue;
            }

            let canonical = canonical.to_string();
            match self.engine.store.update_url(asset.id, &canonical) {
                Ok(()) => {
                    debug!("Healed media {}: {} -> {}", asset.id, asset.url, canonical);
                    asset.url = canonical;
                    healed += 1;
                }
                Err(e) => warn!("Could not heal URL of media {}: {}", asset.id, e),
            }
        }

        healed
    }
}

impl ConsistencyEngine {
    /// List an entity's media in position order, healing legacy URLs.
    pub fn list(&self, entity: &EntityKey) -> Result<Vec<MediaAsset>> {
        let mut assets = self.store.list_by_entity(entity)?;
        if assets.is_empty() {
            return Ok(assets);
        }

        let descriptor = self.descriptor_for(entity)?;
        let candidates = Self::candidates_for(entity, &descriptor);
        let healed = LazyPathHealer::new(self).heal(&candidates, &mut assets);
        if healed > 0 {
            info!("Healed {} legacy media URL(s) of {}", healed, entity);
        }
        Ok(assets)
    }
}
