//! Entity folder resolution across naming schemes.

use super::transliterate::{transliterate, Scheme};
use crate::config::MediaLayout;
use crate::files::MediaFileOps;

/// Candidate folder names for one identifier, current scheme first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderCandidates {
    names: Vec<(Scheme, String)>,
}

impl FolderCandidates {
    /// Compute the candidates for `identifier`.
    ///
    /// Empty names are dropped and duplicates keep their first (most
    /// preferred) scheme.
    pub fn for_identifier(identifier: &str) -> Self {
        let mut names: Vec<(Scheme, String)> = Vec::with_capacity(Scheme::ALL.len());
        for scheme in Scheme::ALL {
            let name = transliterate(identifier, scheme);
            if name.is_empty() || names.iter().any(|(_, n)| *n == name) {
                continue;
            }
            names.push((scheme, name));
        }
        Self { names }
    }

    /// Folder names in resolution order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|(_, n)| n.as_str())
    }

    /// The current-scheme name. `None` only for an empty identifier.
    pub fn current(&self) -> Option<&str> {
        self.names
            .iter()
            .find(|(s, _)| *s == Scheme::Current)
            .map(|(_, n)| n.as_str())
    }

    /// The scheme that produced `folder`, if it is a candidate.
    pub fn scheme_of(&self, folder: &str) -> Option<Scheme> {
        self.names
            .iter()
            .find(|(_, n)| n == folder)
            .map(|(s, _)| *s)
    }

    pub fn contains(&self, folder: &str) -> bool {
        self.scheme_of(folder).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}

/// `candidates(identifier)` as a plain list of names.
pub fn candidates(identifier: &str) -> Vec<String> {
    FolderCandidates::for_identifier(identifier)
        .names()
        .map(String::from)
        .collect()
}

/// Locates the folder an entity's files currently live in.
pub struct FolderResolver<'a> {
    layout: &'a MediaLayout,
    files: &'a dyn MediaFileOps,
}

impl<'a> FolderResolver<'a> {
    pub fn new(layout: &'a MediaLayout, files: &'a dyn MediaFileOps) -> Self {
        Self { layout, files }
    }

    /// First candidate whose directory exists, else the current-scheme name.
    ///
    /// Never creates a directory. Returns `None` only when the identifier
    /// produces no usable name under any scheme.
    pub fn resolve_existing(&self, entity_type: &str, identifier: &str) -> Option<String> {
        let candidates = FolderCandidates::for_identifier(identifier);
        for name in candidates.names() {
            if self.files.is_dir(&self.layout.folder_dir(entity_type, name)) {
                return Some(name.to_string());
            }
        }
        candidates.current().map(String::from)
    }
}
