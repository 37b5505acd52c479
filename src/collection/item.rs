//! Read-through view of an item directory

use crate::collection::id::CatalogId;
use crate::collection::record::RECORD_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};

/// Artifacts an item directory may hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    InfoRecord,
    TocSnapshot,
    CueSheet,
    BinaryImage,
    Checksum,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 5] = [
        ArtifactKind::InfoRecord,
        ArtifactKind::TocSnapshot,
        ArtifactKind::CueSheet,
        ArtifactKind::BinaryImage,
        ArtifactKind::Checksum,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::InfoRecord => RECORD_EXTENSION,
            ArtifactKind::TocSnapshot => "toc",
            ArtifactKind::CueSheet => "cue",
            ArtifactKind::BinaryImage => "bin",
            ArtifactKind::Checksum => "sha256",
        }
    }

    pub fn file_name(self, formatted_id: &str) -> String {
        format!("{}.{}", formatted_id, self.extension())
    }
}

/// An artifact found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub size: u64,
}

/// Item directory `root/<formatted id>` and the artifacts it currently holds
#[derive(Debug, Clone)]
pub struct ArchiveItem {
    id: CatalogId,
    dir: PathBuf,
    artifacts: Vec<Artifact>,
}

/// Directory for an item under the catalog root
pub fn item_dir(root: &Path, id: CatalogId) -> PathBuf {
    root.join(id.formatted())
}

impl ArchiveItem {
    /// Inspect `root/<formatted id>`; a missing directory is an empty item
    pub fn from_root(root: &Path, id: CatalogId) -> std::io::Result<Self> {
        Self::from_directory(&item_dir(root, id), id)
    }

    pub fn from_directory(dir: &Path, id: CatalogId) -> std::io::Result<Self> {
        let formatted = id.formatted();
        let mut artifacts = Vec::new();

        for kind in ArtifactKind::ALL {
            let path = dir.join(kind.file_name(&formatted));
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => artifacts.push(Artifact {
                    kind,
                    path,
                    size: meta.len(),
                }),
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(Self {
            id,
            dir: dir.to_path_buf(),
            artifacts,
        })
    }

    pub fn id(&self) -> CatalogId {
        self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn artifact(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    pub fn has(&self, kind: ArtifactKind) -> bool {
        self.artifact(kind).is_some()
    }

    /// Where an artifact of this kind lives (whether or not it exists)
    pub fn path_for(&self, kind: ArtifactKind) -> PathBuf {
        self.dir.join(kind.file_name(&self.id.formatted()))
    }

    /// True iff both the binary image and the cue sheet exist and are non-empty
    pub fn is_archived(&self) -> bool {
        let non_empty = |kind| self.artifact(kind).is_some_and(|a| a.size > 0);
        non_empty(ArtifactKind::BinaryImage) && non_empty(ArtifactKind::CueSheet)
    }
}

/// True when `dir` exists and has at least one entry
pub fn dir_has_entries(dir: &Path) -> std::io::Result<bool> {
    match fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
