//! Disc identity check: does the inserted CD look like the catalogued one?
//!
//! Only track counts are compared. Offsets and lengths taken from an info
//! record typed up by hand rarely agree exactly with a live read.

use crate::cd::toc::TocRecord;
use crate::collection::record::CatalogEntry;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    Matched,
    TrackCountMismatch { expected: usize, actual: usize },
    NoDiscPresent,
}

impl ReconciliationOutcome {
    pub fn is_match(self) -> bool {
        self == ReconciliationOutcome::Matched
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationOutcome::Matched => write!(f, "inserted CD matches the record"),
            ReconciliationOutcome::TrackCountMismatch { expected, actual } => write!(
                f,
                "record states the item should have {} tracks but the inserted CD has {}",
                expected, actual
            ),
            ReconciliationOutcome::NoDiscPresent => {
                write!(f, "CD is not inserted or has no tracks")
            }
        }
    }
}

/// Classify a TOC against a catalog entry
pub fn reconcile(toc: &TocRecord, entry: &CatalogEntry) -> ReconciliationOutcome {
    let actual = toc.len();
    let expected = entry.track_count();
    if actual == 0 {
        ReconciliationOutcome::NoDiscPresent
    } else if actual == expected {
        ReconciliationOutcome::Matched
    } else {
        ReconciliationOutcome::TrackCountMismatch { expected, actual }
    }
}
