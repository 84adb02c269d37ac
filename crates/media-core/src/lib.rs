//! Catalog Media - keeps catalog image rows and their files in agreement.
//!
//! Every image attached to a catalog entity (product, kit, ...) is both a row
//! in SQLite and a file on disk. This crate owns the operations that change
//! either side and keeps them consistent: uploads, deletes, reorders,
//! preview promotion, and the two-phase rename that realigns file names with
//! positions. Entity folders created under older naming schemes keep
//! resolving, and listing an entity lazily migrates their URLs.
//!
//! # Example
//!
//! ```rust,no_run
//! use catalog_media::{
//!     ConsistencyEngine, EntityKey, LocalFileOps, MediaLayout, SqliteDescriptorSource,
//!     SqliteMediaStore, UploadRequest,
//! };
//! use std::sync::Arc;
//!
//! fn main() -> catalog_media::Result<()> {
//!     let store = SqliteMediaStore::new("/srv/catalog/media.db")?;
//!     let descriptors = SqliteDescriptorSource::from_store(&store)?;
//!     let engine = ConsistencyEngine::new(
//!         MediaLayout::new("/srv/catalog/uploads", "uploads"),
//!         Arc::new(store),
//!         Arc::new(LocalFileOps),
//!         Arc::new(descriptors),
//!     );
//!
//!     let entity = EntityKey::new("modules", "42");
//!     let asset = engine.upload(&UploadRequest {
//!         entity: entity.clone(),
//!         temp_path: "/tmp/upload-1234".into(),
//!         extension: "jpg".into(),
//!         alt: None,
//!         descriptor: None,
//!     })?;
//!     engine.set_preview(asset.id)?;
//!
//!     for asset in engine.list(&entity)? {
//!         println!("{} {}", asset.position, asset.url);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod files;
pub mod healer;
pub mod lock;
pub mod naming;
pub mod reconcile;
pub mod store;
pub mod types;

pub use config::{MediaConfig, MediaLayout};
pub use engine::{ConsistencyEngine, RenameFailure, RenameFailureKind, RenameReport, UploadRequest};
pub use error::{FilePhase, MediaError, Result};
pub use files::{LocalFileOps, MediaFileOps};
pub use healer::LazyPathHealer;
pub use lock::{EntityGuard, EntityLocks};
pub use reconcile::ReconcileReport;
pub use store::{
    DescriptorSource, MediaRecordStore, MemoryDescriptors, SqliteDescriptorSource,
    SqliteMediaStore,
};
pub use types::{EntityDescriptor, EntityKey, MediaAsset, NewMediaAsset};
