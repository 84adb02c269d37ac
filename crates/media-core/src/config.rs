//! Configuration for catalog media.
//!
//! Constants live on unit structs; the storage layout a deployment uses is
//! carried at runtime by [`MediaLayout`].

use crate::naming::{transliterate, MediaUrl, Scheme};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Storage-level constants.
pub struct MediaConfig;

impl MediaConfig {
    pub const DB_FILENAME: &'static str = "media.db";
    pub const DEFAULT_MOUNT: &'static str = "uploads";
    /// Prefix of quarantine files created mid-rename.
    pub const QUARANTINE_PREFIX: &'static str = ".quarantine";
    /// Applied at the operation boundary by the serving layer, never inside a rename.
    pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(30);
    /// Default upload staging directory, under the media root.
    pub const STAGING_DIRNAME: &'static str = ".staging";
}

/// Where media files live and how their URLs are spelled.
///
/// A URL `/<mount>/<type>/<folder>/<file>` maps to
/// `<storage_root>/<type>/<folder>/<file>`.
#[derive(Debug, Clone)]
pub struct MediaLayout {
    storage_root: PathBuf,
    mount: String,
}

impl MediaLayout {
    /// Create a layout rooted at `storage_root`, published under `/<mount>`.
    pub fn new(storage_root: impl Into<PathBuf>, mount: impl Into<String>) -> Self {
        let mount: String = mount.into();
        Self {
            storage_root: storage_root.into(),
            mount: mount.trim_matches('/').to_string(),
        }
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn mount(&self) -> &str {
        &self.mount
    }

    /// Folder name used for an entity type (e.g. "modules").
    pub fn type_folder(&self, entity_type: &str) -> String {
        transliterate(entity_type, Scheme::Current)
    }

    /// Directory that holds all entity folders of one type.
    pub fn type_dir(&self, entity_type: &str) -> PathBuf {
        self.storage_root.join(self.type_folder(entity_type))
    }

    /// Directory of one entity folder.
    pub fn folder_dir(&self, entity_type: &str, folder: &str) -> PathBuf {
        self.type_dir(entity_type).join(folder)
    }

    /// Build the URL for a file in an entity folder.
    pub fn url_for(&self, entity_type: &str, folder: &str, filename: &str) -> MediaUrl {
        MediaUrl {
            mount: self.mount.clone(),
            type_folder: self.type_folder(entity_type),
            folder: folder.to_string(),
            filename: filename.to_string(),
        }
    }

    /// Map a parsed URL to its file-store path.
    ///
    /// Returns `None` for a URL published under a different mount.
    pub fn path_for(&self, url: &MediaUrl) -> Option<PathBuf> {
        if url.mount != self.mount {
            return None;
        }
        Some(
            self.storage_root
                .join(&url.type_folder)
                .join(&url.folder)
                .join(&url.filename),
        )
    }

    /// Parse a stored URL string and map it to a path.
    pub fn path_for_str(&self, url: &str) -> Option<PathBuf> {
        MediaUrl::parse(url).and_then(|u| self.path_for(&u))
    }
}

impl Default for MediaLayout {
    fn default() -> Self {
        Self::new("media", MediaConfig::DEFAULT_MOUNT)
    }
}
