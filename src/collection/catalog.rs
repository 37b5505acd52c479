//! Catalog root scanning
//!
//! Pending records sit directly in the root as `NNNNN.info`; once an item is
//! archived its record moves into `NNNNN/NNNNN.info`. A scan picks up both and
//! indexes them by id. Records that fail to load are kept aside as issues so
//! one broken file never hides the rest of the collection.

use crate::collection::id::CatalogId;
use crate::collection::item::ArchiveItem;
use crate::collection::record::{load_record, CatalogEntry, RecordLocation, RECORD_EXTENSION};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("No info record for {}; expected {}", .id, .path.display())]
    NotFound { id: CatalogId, path: PathBuf },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A record that could not be indexed
#[derive(Debug, Clone)]
pub struct ScanIssue {
    pub path: PathBuf,
    pub message: String,
}

/// Index of every readable record under a catalog root
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    root: PathBuf,
    entries: HashMap<CatalogId, CatalogEntry>,
    issues: Vec<ScanIssue>,
}

pub struct CollectionCatalog;

/// Record file path for a pending item
pub fn pending_record_path(root: &Path, id: CatalogId) -> PathBuf {
    root.join(format!("{}.{}", id.formatted(), RECORD_EXTENSION))
}

/// Record file path for an archived item
pub fn archived_record_path(root: &Path, id: CatalogId) -> PathBuf {
    root.join(id.formatted())
        .join(format!("{}.{}", id.formatted(), RECORD_EXTENSION))
}

/// Id of a `NNNNN.info` file name
fn record_id(path: &Path) -> Option<CatalogId> {
    let ext = path.extension()?.to_str()?;
    if ext != RECORD_EXTENSION {
        return None;
    }
    CatalogId::from_formatted(path.file_stem()?.to_str()?)
}

impl CollectionCatalog {
    /// Scan `root` and index its records
    pub fn build(root: &Path) -> Result<CatalogIndex, CatalogError> {
        let mut found: Vec<(CatalogId, PathBuf, RecordLocation)> = Vec::new();

        for entry in fs::read_dir(root)? {
            let path = entry?.path();
            if path.is_file() {
                if let Some(id) = record_id(&path) {
                    found.push((id, path, RecordLocation::Pending));
                }
            } else if path.is_dir() {
                let Some(id) = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(CatalogId::from_formatted)
                else {
                    continue;
                };
                let record = archived_record_path(root, id);
                if record.is_file() {
                    found.push((id, record, RecordLocation::Archived));
                }
            }
        }

        // Archived copies win over a stray pending duplicate
        found.sort_by_key(|(id, path, location)| {
            (*id, *location != RecordLocation::Archived, path.clone())
        });

        let mut entries = HashMap::new();
        let mut issues = Vec::new();
        for (id, path, location) in found {
            if entries.contains_key(&id) {
                warn!("Duplicate record for {} ignored: {}", id, path.display());
                issues.push(ScanIssue {
                    path,
                    message: format!("duplicate record for {}", id),
                });
                continue;
            }
            match load_record(&path, id, location) {
                Ok(entry) => {
                    debug!("Loaded {} ({} tracks)", id, entry.track_count());
                    entries.insert(id, entry);
                }
                Err(e) => {
                    warn!("Skipping unreadable record {}: {}", path.display(), e);
                    issues.push(ScanIssue {
                        path,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Catalog {}: {} record(s), {} issue(s)",
            root.display(),
            entries.len(),
            issues.len()
        );

        Ok(CatalogIndex {
            root: root.to_path_buf(),
            entries,
            issues,
        })
    }
}

impl CatalogIndex {
    pub fn lookup(&self, id: CatalogId) -> Result<&CatalogEntry, CatalogError> {
        self.entries.get(&id).ok_or_else(|| CatalogError::NotFound {
            id,
            path: pending_record_path(&self.root, id),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn issues(&self) -> &[ScanIssue] {
        &self.issues
    }

    /// Entries in id order
    pub fn entries(&self) -> Vec<&CatalogEntry> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by_key(|e| e.id);
        entries
    }

    fn ids_where(&self, archived: bool) -> Result<BTreeSet<u32>, CatalogError> {
        let mut ids = BTreeSet::new();
        for id in self.entries.keys() {
            let item = ArchiveItem::from_root(&self.root, *id)?;
            if item.is_archived() == archived {
                ids.insert(id.value());
            }
        }
        Ok(ids)
    }

    /// Ids with a record but no completed archive
    pub fn pending_ids(&self) -> Result<BTreeSet<u32>, CatalogError> {
        self.ids_where(false)
    }

    /// Ids whose item directory holds a complete archive
    pub fn archived_ids(&self) -> Result<BTreeSet<u32>, CatalogError> {
        self.ids_where(true)
    }
}
