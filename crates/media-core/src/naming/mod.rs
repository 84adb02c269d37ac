//! Naming rules for entity folders, media files, and their URLs.
//!
//! ```text
//! identifier ──► transliterate (3 schemes) ──► FolderCandidates ──► FolderResolver
//! descriptor + position + extension ──► synthesize ──► filename
//! mount + type + folder + filename ◄──► MediaUrl
//! ```

mod filename;
mod folder;
mod transliterate;
mod url;

pub use filename::{extension_of, normalize_extension, synthesize};
pub use folder::{candidates, FolderCandidates, FolderResolver};
pub use transliterate::{transliterate, Scheme};
pub use url::MediaUrl;
