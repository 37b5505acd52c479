//! TOC parsing for cdrdao `read-toc` output
//!
//! Only two kinds of line matter: `TRACK` headers, which open a new track, and
//! extent statements (`FILE`, `AUDIOFILE`, `DATAFILE`, `SILENCE`, `ZERO`),
//! whose lengths add up to the track's extent. Everything else - comments,
//! CD-TEXT blocks, flags, banners that leaked in from the tool's stderr - is
//! skipped.

use crate::cd::msf::parse_toc_time;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{space0, space1},
    combinator::{eof, opt, value},
    sequence::preceded,
    IResult,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TocParseError {
    #[error("malformed track header at line {line}: {text:?}")]
    MalformedTrackHeader { line: usize, text: String },
    #[error("empty toc")]
    EmptyToc,
    #[error("track {track} starts beyond the addressable sector range")]
    ExtentOverflow { track: u32 },
}

/// One track of a disc layout, in CD sectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackRecord {
    pub index: u32,
    pub start: u32,
    pub length: u32,
}

impl TrackRecord {
    pub fn new(index: u32, start: u32, length: u32) -> Self {
        Self {
            index,
            start,
            length,
        }
    }
}

/// Track list read from a live disc
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocRecord {
    tracks: Vec<TrackRecord>,
}

impl TocRecord {
    pub fn new(tracks: Vec<TrackRecord>) -> Self {
        Self { tracks }
    }

    /// A TOC with no tracks (nothing could be read from the drive)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn tracks(&self) -> &[TrackRecord] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Total extent of the disc in sectors
    pub fn total_sectors(&self) -> u64 {
        self.tracks
            .last()
            .map(|t| t.start as u64 + t.length as u64)
            .unwrap_or(0)
    }
}

/// Track modes cdrdao writes after `TRACK`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMode {
    Audio,
    Mode1,
    Mode1Raw,
    Mode2,
    Mode2Form1,
    Mode2Form2,
    Mode2FormMix,
    Mode2Raw,
}

fn track_mode(input: &str) -> IResult<&str, TrackMode> {
    // Longer names first so MODE2 doesn't swallow MODE2_RAW
    alt((
        value(TrackMode::Mode2FormMix, tag("MODE2_FORM_MIX")),
        value(TrackMode::Mode2Form1, tag("MODE2_FORM1")),
        value(TrackMode::Mode2Form2, tag("MODE2_FORM2")),
        value(TrackMode::Mode2Raw, tag("MODE2_RAW")),
        value(TrackMode::Mode1Raw, tag("MODE1_RAW")),
        value(TrackMode::Mode2, tag("MODE2")),
        value(TrackMode::Mode1, tag("MODE1")),
        value(TrackMode::Audio, tag("AUDIO")),
    ))(input)
}

/// Parse `TRACK <mode> [RW|RW_RAW]`
fn track_header(input: &str) -> IResult<&str, TrackMode> {
    let (input, _) = tag("TRACK")(input)?;
    let (input, _) = space1(input)?;
    let (input, mode) = track_mode(input)?;
    let (input, _) = opt(preceded(space1, alt((tag("RW_RAW"), tag("RW")))))(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = eof(input)?;
    Ok((input, mode))
}

fn is_track_boundary(line: &str) -> bool {
    line.split_whitespace().next() == Some("TRACK")
}

/// Drop a leading quoted file name and any `#byte-offset` tokens
fn value_tokens(rest: &str) -> Vec<&str> {
    let rest = rest.trim_start();
    let rest = match rest.strip_prefix('"') {
        Some(quoted) => match quoted.find('"') {
            Some(end) => &quoted[end + 1..],
            None => "",
        },
        None => rest,
    };
    rest.split_whitespace()
        .filter(|token| !token.starts_with('#'))
        .collect()
}

/// Length in sectors contributed by an extent statement, if the line is one
fn extent_length(line: &str) -> Option<Result<u32, ()>> {
    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest),
        None => (line, ""),
    };

    let tokens = value_tokens(rest);
    let length_token = match keyword {
        // FILE "name" <start> [<length>]; without a length the track runs
        // to the end of the file, which read-toc never writes
        "FILE" | "AUDIOFILE" => tokens.get(1).copied(),
        "DATAFILE" | "SILENCE" => tokens.first().copied(),
        // ZERO [mode] <length>
        "ZERO" => tokens.last().copied(),
        _ => return None,
    };

    Some(match length_token {
        Some(token) => parse_toc_time(token).ok_or(()),
        None => Ok(0),
    })
}

/// Parse a TOC from text
pub fn parse_toc(text: &str) -> Result<TocRecord, TocParseError> {
    parse_toc_lines(text.lines())
}

/// Parse a TOC from a stream of lines
pub fn parse_toc_lines<I, S>(lines: I) -> Result<TocRecord, TocParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut lengths: Vec<u32> = Vec::new();

    for (line_no, raw) in lines.into_iter().enumerate() {
        let line = raw.as_ref().trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        if is_track_boundary(line) {
            track_header(line).map_err(|_| TocParseError::MalformedTrackHeader {
                line: line_no + 1,
                text: line.to_string(),
            })?;
            lengths.push(0);
            continue;
        }

        // Extents before the first TRACK belong to no track
        let Some(current) = lengths.last_mut() else {
            continue;
        };

        match extent_length(line) {
            Some(Ok(sectors)) => match current.checked_add(sectors) {
                Some(total) => *current = total,
                None => debug!("Skipping oversized extent at line {}: {}", line_no + 1, line),
            },
            Some(Err(())) => {
                debug!("Skipping undecodable extent at line {}: {}", line_no + 1, line)
            }
            None => {}
        }
    }

    if lengths.is_empty() {
        return Err(TocParseError::EmptyToc);
    }

    let count = lengths.len();
    let mut tracks = Vec::with_capacity(count);
    let mut start = 0u32;
    for (i, length) in lengths.into_iter().enumerate() {
        let index = i as u32 + 1;
        tracks.push(TrackRecord::new(index, start, length));
        // The last track may run to the end of the range; only a following
        // track needs a start past it
        start = match start.checked_add(length) {
            Some(next) => next,
            None if index as usize == count => start,
            None => return Err(TocParseError::ExtentOverflow { track: index + 1 }),
        };
    }

    Ok(TocRecord::new(tracks))
}
