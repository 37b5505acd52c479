//! The archive collection on disk: ids, info records, item directories, the
//! catalog index and manifest verification.

pub mod catalog;
pub mod id;
pub mod item;
pub mod manifest;
pub mod record;

pub use catalog::{CatalogError, CatalogIndex, CollectionCatalog, ScanIssue};
pub use id::{CatalogId, CatalogIdError};
pub use item::{ArchiveItem, ArtifactKind};
pub use manifest::{
    ExpectedArtifacts, ManifestStatus, ManifestTestResult, ManifestVerifier,
};
pub use record::{CatalogEntry, RecordLocation, RecordParseError};
