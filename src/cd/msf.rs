//! CD time values
//!
//! Both the TOC reader and the info record loader express track extents as
//! `MM:SS:FF` timecodes; cdrdao may also write a bare sample count. Everything
//! is normalised to CD sectors so that the two sources compare directly.

use nom::{
    bytes::complete::tag,
    character::complete::digit1,
    combinator::{all_consuming, map_res},
    sequence::tuple,
    IResult,
};

/// CD audio frames (sectors) per second
pub const SECTORS_PER_SECOND: u32 = 75;
/// Stereo 16-bit samples in one sector
pub const SAMPLES_PER_SECTOR: u32 = 588;
/// Bytes in one raw audio sector
pub const RAW_SECTOR_BYTES: u64 = 2352;

fn number(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |s: &str| s.parse::<u32>())(input)
}

fn timecode(input: &str) -> IResult<&str, (u32, u32, u32)> {
    let (input, (minutes, _, seconds, _, frames)) =
        tuple((number, tag(":"), number, tag(":"), number))(input)?;
    Ok((input, (minutes, seconds, frames)))
}

/// Parse `MM:SS:FF` into a sector count
pub fn parse_msf(text: &str) -> Option<u32> {
    let (_, (minutes, seconds, frames)) = all_consuming(timecode)(text).ok()?;
    if seconds >= 60 || frames >= SECTORS_PER_SECOND {
        return None;
    }
    minutes
        .checked_mul(60 * SECTORS_PER_SECOND)?
        .checked_add(seconds * SECTORS_PER_SECOND + frames)
}

/// Parse a cdrdao time value: `MM:SS:FF`, or a plain sample count
pub fn parse_toc_time(text: &str) -> Option<u32> {
    if text.contains(':') {
        return parse_msf(text);
    }
    let (_, samples) = all_consuming(number)(text).ok()?;
    Some(samples / SAMPLES_PER_SECTOR)
}

/// Parse a record time value: `MM:SS:FF`, or a plain sector count
pub fn parse_record_time(text: &str) -> Option<u32> {
    if text.contains(':') {
        return parse_msf(text);
    }
    text.parse::<u32>().ok()
}

/// Format a sector count as `MM:SS:FF`
pub fn format_msf(sectors: u32) -> String {
    let minutes = sectors / (60 * SECTORS_PER_SECOND);
    let seconds = (sectors / SECTORS_PER_SECOND) % 60;
    let frames = sectors % SECTORS_PER_SECOND;
    format!("{:02}:{:02}:{:02}", minutes, seconds, frames)
}
