#![allow(dead_code)]

use arccd::cd::drive::{DeviceError, TocSource};
use arccd::cd::msf::{format_msf, RAW_SECTOR_BYTES};
use arccd::cd::ripper::{RipError, Ripper};
use arccd::console::{InputError, OperatorInput};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// Sectors per fixture track; keeps images small
pub const TRACK_SECTORS: u32 = 10;

/// Initialize tracing for tests with proper test output handling
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Write a pending `root/NNNNN.info` with `tracks` tracks
pub fn write_pending_record(root: &Path, id: u32, artist: &str, title: &str, tracks: u32) -> PathBuf {
    let path = root.join(format!("{:05}.info", id));
    fs::write(&path, record_text(id, artist, title, tracks)).expect("Failed to write record");
    path
}

/// Write an archived `root/NNNNN/NNNNN.info`
pub fn write_archived_record(root: &Path, id: u32, tracks: u32) -> PathBuf {
    let dir = root.join(format!("{:05}", id));
    fs::create_dir_all(&dir).expect("Failed to create item dir");
    let path = dir.join(format!("{:05}.info", id));
    fs::write(&path, record_text(id, "Archived Artist", "Archived Title", tracks))
        .expect("Failed to write record");
    path
}

pub fn record_text(id: u32, artist: &str, title: &str, tracks: u32) -> String {
    let mut text = format!("[cd]\nid = {}\nartist = {}\ntitle = {}\n\n[tracks]\n", id, artist, title);
    for i in 0..tracks {
        text.push_str(&format!(
            "{:02} = {} {}\n",
            i + 1,
            format_msf(i * TRACK_SECTORS),
            format_msf(TRACK_SECTORS)
        ));
    }
    text
}

/// cdrdao `read-toc` output for an audio disc
pub fn toc_text(tracks: u32) -> String {
    let mut text = String::from("CD_DA\n\n");
    for i in 0..tracks {
        text.push_str(&format!(
            "// Track {}\nTRACK AUDIO\nNO COPY\nFILE \"data.wav\" {} {}\n\n",
            i + 1,
            format_msf(i * TRACK_SECTORS),
            format_msf(TRACK_SECTORS)
        ));
    }
    text
}

/// Cue sheet the way toc2cue writes it
pub fn cue_text(formatted_id: &str, tracks: u32) -> String {
    let mut text = format!("FILE \"{}.bin\" BINARY\n", formatted_id);
    for i in 0..tracks {
        text.push_str(&format!(
            "\n  TRACK {:02} AUDIO\n    INDEX 01 {}\n",
            i + 1,
            format_msf(i * TRACK_SECTORS)
        ));
    }
    text
}

/// Write `NNNNN.bin` and `NNNNN.cue` as a successful rip would
pub fn write_rip_output(dir: &Path, formatted_id: &str, tracks: u32) {
    let sectors = (tracks * TRACK_SECTORS) as u64;
    fs::write(
        dir.join(format!("{}.bin", formatted_id)),
        vec![0u8; (sectors * RAW_SECTOR_BYTES) as usize],
    )
    .expect("Failed to write image");
    fs::write(
        dir.join(format!("{}.cue", formatted_id)),
        cue_text(formatted_id, tracks),
    )
    .expect("Failed to write cue");
}

/// Drive double that hands out a fixed answer
pub struct FakeDrive {
    answer: Option<Result<String, DeviceError>>,
    pub reads: usize,
}

impl FakeDrive {
    pub fn with_tracks(tracks: u32) -> Self {
        Self::with_text(&toc_text(tracks))
    }

    pub fn with_text(text: &str) -> Self {
        Self {
            answer: Some(Ok(text.to_string())),
            reads: 0,
        }
    }

    pub fn failing(error: DeviceError) -> Self {
        Self {
            answer: Some(Err(error)),
            reads: 0,
        }
    }
}

impl TocSource for FakeDrive {
    fn read_toc(&mut self) -> Result<String, DeviceError> {
        self.reads += 1;
        match self.answer.take() {
            Some(Ok(text)) => {
                self.answer = Some(Ok(text.clone()));
                Ok(text)
            }
            Some(Err(e)) => Err(e),
            None => Err(DeviceError::NoDrive),
        }
    }
}

/// Ripper double that writes a small image and cue sheet
pub struct FakeRipper {
    tracks: u32,
    fail: bool,
    pub calls: Vec<(PathBuf, String)>,
}

impl FakeRipper {
    pub fn new(tracks: u32) -> Self {
        Self {
            tracks,
            fail: false,
            calls: Vec::new(),
        }
    }

    pub fn failing() -> Self {
        Self {
            tracks: 0,
            fail: true,
            calls: Vec::new(),
        }
    }
}

impl Ripper for FakeRipper {
    fn rip(&mut self, target_dir: &Path, formatted_id: &str) -> Result<(), RipError> {
        self.calls
            .push((target_dir.to_path_buf(), formatted_id.to_string()));
        if self.fail {
            return Err(RipError::Tool {
                tool: "cdrdao".to_string(),
                message: "L-EC error".to_string(),
            });
        }
        write_rip_output(target_dir, formatted_id, self.tracks);
        Ok(())
    }
}

/// Operator double: queued ids and answers, recording every question
#[derive(Default)]
pub struct ScriptedInput {
    ids: VecDeque<u32>,
    answers: VecDeque<bool>,
    pub questions: Vec<String>,
}

impl ScriptedInput {
    pub fn new(ids: &[u32], answers: &[bool]) -> Self {
        Self {
            ids: ids.iter().copied().collect(),
            answers: answers.iter().copied().collect(),
            questions: Vec::new(),
        }
    }
}

impl OperatorInput for ScriptedInput {
    fn prompt_for_id(&mut self) -> Result<u32, InputError> {
        self.ids.pop_front().ok_or(InputError::Closed)
    }

    fn confirm(&mut self, question: &str) -> Result<bool, InputError> {
        self.questions.push(question.to_string());
        self.answers.pop_front().ok_or(InputError::Closed)
    }
}

/// Names of the files directly inside `dir`, sorted; empty when missing
pub fn dir_listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = match fs::read_dir(dir) {
        Ok(entries) => entries
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    };
    names.sort();
    names
}
