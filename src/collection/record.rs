//! Info record loading
//!
//! An info record is a small sectioned text file describing one CD:
//!
//! ```text
//! [cd]
//! id = 42
//! artist = Nina Simone
//! title = Pastel Blues
//!
//! [tracks]
//! 01 = 00:00:00 04:21:30 Be My Husband
//! 02 = 04:21:30 03:55:12
//! ```

use crate::cd::msf::parse_record_time;
use crate::cd::toc::TrackRecord;
use crate::collection::id::CatalogId;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// File extension of info records
pub const RECORD_EXTENSION: &str = "info";

#[derive(Debug, Error)]
pub enum RecordParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("missing field {0:?}")]
    MissingField(&'static str),
    #[error("record declares id {declared} but is filed as {filed}")]
    IdMismatch { declared: String, filed: CatalogId },
    #[error("record lists no tracks")]
    NoTracks,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Where a record was found; a record inside its item directory marks the
/// item as archived
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordLocation {
    Pending,
    Archived,
}

/// Catalog metadata for one CD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: CatalogId,
    pub formatted_id: String,
    pub album_artist: String,
    pub title: String,
    pub tracks: Vec<TrackRecord>,
    pub track_titles: Vec<Option<String>>,
    pub location: RecordLocation,
}

impl CatalogEntry {
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_marked_archived(&self) -> bool {
        self.location == RecordLocation::Archived
    }
}

#[derive(PartialEq)]
enum Section {
    None,
    Cd,
    Tracks,
}

fn track_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+)\s*=\s*(\S+)\s+(\S+)(?:\s+(.+))?$").expect("static regex is valid")
    })
}

fn syntax(line: usize, message: impl Into<String>) -> RecordParseError {
    RecordParseError::Syntax {
        line,
        message: message.into(),
    }
}

/// Parse record text for the item filed under `id`
pub fn parse_record(
    text: &str,
    id: CatalogId,
    location: RecordLocation,
) -> Result<CatalogEntry, RecordParseError> {
    let mut section = Section::None;
    let mut artist = None;
    let mut title = None;
    let mut tracks = Vec::new();
    let mut track_titles = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            section = match name.trim().to_lowercase().as_str() {
                "cd" => Section::Cd,
                "tracks" => Section::Tracks,
                other => return Err(syntax(line_no, format!("unknown section [{}]", other))),
            };
            continue;
        }

        match section {
            Section::None => return Err(syntax(line_no, "field outside of a section")),
            Section::Cd => {
                let (key, value) = line
                    .split_once('=')
                    .ok_or_else(|| syntax(line_no, "expected key = value"))?;
                let value = value.trim().to_string();
                match key.trim().to_lowercase().as_str() {
                    "id" => {
                        let declared: u32 = value
                            .parse()
                            .map_err(|_| syntax(line_no, format!("bad id {:?}", value)))?;
                        if declared != id.value() {
                            return Err(RecordParseError::IdMismatch {
                                declared: value,
                                filed: id,
                            });
                        }
                    }
                    "artist" | "albumartist" => artist = Some(value),
                    "title" => title = Some(value),
                    other => return Err(syntax(line_no, format!("unknown field {:?}", other))),
                }
            }
            Section::Tracks => {
                let caps = track_line()
                    .captures(line)
                    .ok_or_else(|| syntax(line_no, "expected N = <start> <length> [title]"))?;
                let index: u32 = caps[1]
                    .parse()
                    .map_err(|_| syntax(line_no, "bad track number"))?;
                let expected = tracks.len() as u32 + 1;
                if index != expected {
                    return Err(syntax(
                        line_no,
                        format!("track {} out of order, expected {}", index, expected),
                    ));
                }
                let start = parse_record_time(&caps[2])
                    .ok_or_else(|| syntax(line_no, format!("bad start {:?}", &caps[2])))?;
                let length = parse_record_time(&caps[3])
                    .ok_or_else(|| syntax(line_no, format!("bad length {:?}", &caps[3])))?;
                tracks.push(TrackRecord::new(index, start, length));
                track_titles.push(caps.get(4).map(|m| m.as_str().trim().to_string()));
            }
        }
    }

    let album_artist = artist.ok_or(RecordParseError::MissingField("artist"))?;
    let title = title.ok_or(RecordParseError::MissingField("title"))?;
    if tracks.is_empty() {
        return Err(RecordParseError::NoTracks);
    }

    Ok(CatalogEntry {
        id,
        formatted_id: id.formatted(),
        album_artist,
        title,
        tracks,
        track_titles,
        location,
    })
}

/// Load a record from disk
pub fn load_record(
    path: &Path,
    id: CatalogId,
    location: RecordLocation,
) -> Result<CatalogEntry, RecordParseError> {
    let text = fs::read_to_string(path)?;
    parse_record(&text, id, location)
}
