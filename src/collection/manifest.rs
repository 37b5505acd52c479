//! Manifest verification
//!
//! Compares the binary image and cue sheet in an item directory with what the
//! catalog says should be there, one classification per artifact. The
//! aggregate passes only when every tracked artifact is `MATCH`; deciding that
//! some other combination is acceptable is left to the caller.

use crate::cd::msf::RAW_SECTOR_BYTES;
use crate::collection::id::CatalogId;
use crate::collection::item::{ArchiveItem, ArtifactKind};
use crate::collection::record::CatalogEntry;
use crate::cue::CueSheet;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Artifacts that take part in the pass/fail decision
pub const TRACKED_ARTIFACTS: [ArtifactKind; 2] = [ArtifactKind::BinaryImage, ArtifactKind::CueSheet];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ManifestStatus {
    Match,
    Added,
    Deleted,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactResult {
    pub kind: ArtifactKind,
    pub status: ManifestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestTestResult {
    pub id: String,
    pub results: Vec<ArtifactResult>,
}

impl ManifestTestResult {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.status == ManifestStatus::Match)
    }

    pub fn status(&self, kind: ArtifactKind) -> Option<ManifestStatus> {
        self.results.iter().find(|r| r.kind == kind).map(|r| r.status)
    }
}

/// Which tracked artifacts ought to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpectedArtifacts {
    pub binary_image: bool,
    pub cue_sheet: bool,
}

impl ExpectedArtifacts {
    /// Both artifacts are expected once the record has moved into the item
    pub fn for_entry(entry: &CatalogEntry) -> Self {
        let archived = entry.is_marked_archived();
        Self {
            binary_image: archived,
            cue_sheet: archived,
        }
    }

    fn expects(&self, kind: ArtifactKind) -> bool {
        match kind {
            ArtifactKind::BinaryImage => self.binary_image,
            ArtifactKind::CueSheet => self.cue_sheet,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManifestVerifier {
    checksums: bool,
}

impl ManifestVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also compare the image against its `.sha256` sidecar when one exists
    pub fn with_checksums(mut self, enabled: bool) -> Self {
        self.checksums = enabled;
        self
    }

    pub fn verify(&self, item: &ArchiveItem, expected: &CatalogEntry) -> ManifestTestResult {
        self.verify_against(
            item,
            ExpectedArtifacts::for_entry(expected),
            Some(expected.track_count()),
        )
    }

    pub fn verify_against(
        &self,
        item: &ArchiveItem,
        expected: ExpectedArtifacts,
        track_count: Option<usize>,
    ) -> ManifestTestResult {
        let cue = match item.artifact(ArtifactKind::CueSheet) {
            Some(a) if a.size > 0 => Some(CueSheet::from_file(&a.path)),
            _ => None,
        };

        let results = TRACKED_ARTIFACTS
            .iter()
            .map(|&kind| {
                let (status, detail) = match (item.artifact(kind), expected.expects(kind)) {
                    (None, true) => (ManifestStatus::Deleted, None),
                    (None, false) => (ManifestStatus::Match, None),
                    (Some(_), false) => (ManifestStatus::Added, None),
                    (Some(artifact), true) => {
                        let problem = match kind {
                            ArtifactKind::CueSheet => {
                                cue_problem(item, artifact.size, cue.as_ref(), track_count)
                            }
                            _ => self.image_problem(item, artifact.size, cue.as_ref()),
                        };
                        match problem {
                            Some(detail) => (ManifestStatus::Failed, Some(detail)),
                            None => (ManifestStatus::Match, None),
                        }
                    }
                };
                debug!("{} {:?}: {:?}", item.id(), kind, status);
                ArtifactResult {
                    kind,
                    status,
                    detail,
                }
            })
            .collect();

        ManifestTestResult {
            id: item.id().formatted(),
            results,
        }
    }

    fn image_problem(
        &self,
        item: &ArchiveItem,
        size: u64,
        cue: Option<&Result<CueSheet, crate::cue::CueParseError>>,
    ) -> Option<String> {
        if size == 0 {
            return Some("empty file".to_string());
        }
        if size % RAW_SECTOR_BYTES != 0 {
            return Some(format!(
                "size {} is not a whole number of {}-byte sectors",
                size, RAW_SECTOR_BYTES
            ));
        }
        if let Some(Ok(sheet)) = cue {
            let sectors = size / RAW_SECTOR_BYTES;
            if let Some(last_start) = sheet.last_track_start() {
                if sectors <= last_start as u64 {
                    return Some(format!(
                        "image holds {} sectors but the cue sheet's last track starts at {}",
                        sectors, last_start
                    ));
                }
            }
        }
        if self.checksums {
            return checksum_problem(item);
        }
        None
    }
}

fn cue_problem(
    item: &ArchiveItem,
    size: u64,
    cue: Option<&Result<CueSheet, crate::cue::CueParseError>>,
    track_count: Option<usize>,
) -> Option<String> {
    if size == 0 {
        return Some("empty file".to_string());
    }
    let sheet = match cue {
        Some(Ok(sheet)) => sheet,
        Some(Err(e)) => return Some(e.to_string()),
        None => return Some("unreadable cue sheet".to_string()),
    };

    let image_name = ArtifactKind::BinaryImage.file_name(&item.id().formatted());
    let references_image = sheet.files.iter().any(|f| {
        Path::new(&f.name)
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n == image_name)
    });
    if !references_image {
        let names: Vec<&str> = sheet.files.iter().map(|f| f.name.as_str()).collect();
        return Some(format!("references {:?} instead of {}", names, image_name));
    }

    match track_count {
        Some(expected) if expected != sheet.tracks.len() => Some(format!(
            "lists {} tracks, record expects {}",
            sheet.tracks.len(),
            expected
        )),
        _ => None,
    }
}

fn checksum_problem(item: &ArchiveItem) -> Option<String> {
    let sidecar = item.artifact(ArtifactKind::Checksum)?;
    let image = item.path_for(ArtifactKind::BinaryImage);
    let recorded = match fs::read_to_string(&sidecar.path) {
        Ok(text) => text.split_whitespace().next().unwrap_or_default().to_lowercase(),
        Err(e) => return Some(format!("checksum unreadable: {}", e)),
    };
    match sha256_file(&image) {
        Ok(actual) if actual == recorded => None,
        Ok(actual) => Some(format!("sha256 {} does not match recorded {}", actual, recorded)),
        Err(e) => Some(format!("could not hash image: {}", e)),
    }
}

/// Hex SHA-256 of a file's contents
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Record the image's SHA-256 next to it, in `sha256sum` format
pub fn write_checksum_sidecar(dir: &Path, id: CatalogId) -> io::Result<PathBuf> {
    let formatted = id.formatted();
    let image_name = ArtifactKind::BinaryImage.file_name(&formatted);
    let digest = sha256_file(&dir.join(&image_name))?;
    let sidecar = dir.join(ArtifactKind::Checksum.file_name(&formatted));
    fs::write(&sidecar, format!("{}  {}\n", digest, image_name))?;
    Ok(sidecar)
}
