//! Persisted media URL format.
//!
//! `/<mount>/<type>/<folder>/<filename>` is stored verbatim in the media table
//! and served by existing deployments, so its shape must not change.

use std::fmt;

/// A parsed media URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaUrl {
    pub mount: String,
    pub type_folder: String,
    pub folder: String,
    pub filename: String,
}

impl MediaUrl {
    /// Parse a stored URL.
    ///
    /// Returns `None` unless the URL has exactly four non-empty segments,
    /// none of which is `.` or `..`.
    pub fn parse(url: &str) -> Option<Self> {
        let trimmed = url.strip_prefix('/').unwrap_or(url);
        let segments: Vec<&str> = trimmed.split('/').collect();
        let [mount, type_folder, folder, filename] = segments.as_slice() else {
            return None;
        };
        for segment in [mount, type_folder, folder, filename] {
            if segment.is_empty() || *segment == "." || *segment == ".." || segment.contains('\\') {
                return None;
            }
        }
        Some(Self {
            mount: mount.to_string(),
            type_folder: type_folder.to_string(),
            folder: folder.to_string(),
            filename: filename.to_string(),
        })
    }

    /// Same file name under another folder.
    pub fn with_folder(&self, folder: &str) -> Self {
        Self {
            folder: folder.to_string(),
            ..self.clone()
        }
    }
}

impl fmt::Display for MediaUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{}/{}/{}/{}",
            self.mount, self.type_folder, self.folder, self.filename
        )
    }
}
