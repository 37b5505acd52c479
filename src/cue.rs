use crate::cd::msf::parse_msf;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1, take_until},
    character::complete::{alphanumeric1, digit1, space0, space1},
    combinator::{eof, map_res},
    sequence::delimited,
    IResult,
};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CueParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CUE parsing error at line {line}: {text:?}")]
    Syntax { line: usize, text: String },
    #[error("CUE sheet has no FILE entry")]
    NoFile,
    #[error("CUE sheet has no tracks")]
    NoTracks,
}

/// A `FILE` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueFile {
    pub name: String,
    pub file_type: String,
}

/// Represents a single track in a CUE sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueTrack {
    pub number: u32,
    pub mode: String,
    /// `INDEX 01` position in sectors, relative to the track's file
    pub start_sector: Option<u32>,
}

/// Represents a parsed CUE sheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueSheet {
    pub files: Vec<CueFile>,
    pub tracks: Vec<CueTrack>,
}

impl CueSheet {
    /// Read and parse a cue sheet file
    pub fn from_file(path: &Path) -> Result<Self, CueParseError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, CueParseError> {
        let mut sheet = CueSheet {
            files: Vec::new(),
            tracks: Vec::new(),
        };

        for (i, raw) in content.lines().enumerate() {
            let line = raw.trim().trim_start_matches('\u{feff}');
            if line.is_empty() {
                continue;
            }
            let syntax = || CueParseError::Syntax {
                line: i + 1,
                text: line.to_string(),
            };
            let keyword = line.split_whitespace().next().unwrap_or_default();

            match keyword {
                "FILE" => {
                    let (_, file) = parse_file(line).map_err(|_| syntax())?;
                    sheet.files.push(file);
                }
                "TRACK" => {
                    let (_, track) = parse_track(line).map_err(|_| syntax())?;
                    sheet.tracks.push(track);
                }
                "INDEX" => {
                    let (_, (number, sector)) = parse_index(line).map_err(|_| syntax())?;
                    let track = sheet.tracks.last_mut().ok_or_else(syntax)?;
                    if number == 1 {
                        track.start_sector = Some(sector);
                    }
                }
                _ => {}
            }
        }

        if sheet.files.is_empty() {
            return Err(CueParseError::NoFile);
        }
        if sheet.tracks.is_empty() {
            return Err(CueParseError::NoTracks);
        }
        Ok(sheet)
    }

    /// Start of the last track in sectors, if known
    pub fn last_track_start(&self) -> Option<u32> {
        self.tracks.iter().rev().find_map(|t| t.start_sector)
    }
}

/// Parse quoted string
fn parse_quoted_string(input: &str) -> IResult<&str, String> {
    let (input, content) = delimited(tag("\""), take_until("\""), tag("\""))(input)?;
    Ok((input, content.to_string()))
}

fn parse_bare_word(input: &str) -> IResult<&str, String> {
    let (input, word) = take_till1(|c: char| c.is_whitespace())(input)?;
    Ok((input, word.to_string()))
}

/// Parse `FILE "name" TYPE`
fn parse_file(input: &str) -> IResult<&str, CueFile> {
    let (input, _) = tag("FILE")(input)?;
    let (input, _) = space1(input)?;
    let (input, name) = alt((parse_quoted_string, parse_bare_word))(input)?;
    let (input, _) = space1(input)?;
    let (input, file_type) = alphanumeric1(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = eof(input)?;
    Ok((
        input,
        CueFile {
            name,
            file_type: file_type.to_string(),
        },
    ))
}

/// Parse `TRACK NN MODE`
fn parse_track(input: &str) -> IResult<&str, CueTrack> {
    let (input, _) = tag("TRACK")(input)?;
    let (input, _) = space1(input)?;
    let (input, number) = map_res(digit1, |s: &str| s.parse::<u32>())(input)?;
    let (input, _) = space1(input)?;
    let (input, mode) = take_till1(|c: char| c.is_whitespace())(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = eof(input)?;
    Ok((
        input,
        CueTrack {
            number,
            mode: mode.to_string(),
            start_sector: None,
        },
    ))
}

/// Parse `INDEX NN MM:SS:FF` into the index number and sector
fn parse_index(input: &str) -> IResult<&str, (u32, u32)> {
    let (input, _) = tag("INDEX")(input)?;
    let (input, _) = space1(input)?;
    let (input, number) = map_res(digit1, |s: &str| s.parse::<u32>())(input)?;
    let (input, _) = space1(input)?;
    let (input, sector) = map_res(take_till1(|c: char| c.is_whitespace()), |s: &str| {
        parse_msf(s).ok_or(())
    })(input)?;
    let (input, _) = space0(input)?;
    let (input, _) = eof(input)?;
    Ok((input, (number, sector)))
}
