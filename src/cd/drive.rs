//! CD drive access and TOC reading

use crate::cd::cdrdao::{run_bounded, Cdrdao, ToolOutput};
use crate::cd::toc::TocParseError;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// cdrdao diagnostics that mean the tray is empty rather than the read failing
const NO_DISC_MARKERS: &[&str] = &[
    "unit not ready",
    "medium not present",
    "no disk",
    "no disc",
];

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No CD drive found")]
    NoDrive,
    #[error("No disc in drive {0}")]
    NoDisc(String),
    #[error("Reading the disc in {device} failed: {message}")]
    ReadFailed { device: String, message: String },
    #[error("Drive {device} did not answer within {secs}s")]
    Timeout { device: String, secs: u64 },
    #[error("Drive returned an unreadable TOC: {0}")]
    UnreadableToc(TocParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Supplies the raw TOC text of whatever disc is in the drive
pub trait TocSource {
    fn read_toc(&mut self) -> Result<String, DeviceError>;
}

/// Represents a CD drive driven through cdrdao
#[derive(Debug, Clone)]
pub struct CdDrive {
    pub command: String,
    pub device: String,
    pub timeout: Option<Duration>,
    scratch_dir: PathBuf,
}

impl CdDrive {
    pub fn new(command: &str, device: &str, timeout: Option<Duration>) -> Self {
        Self {
            command: command.to_string(),
            device: device.to_string(),
            timeout,
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Use the configured device, falling back to the first one cdrdao found
    pub fn from_cdrdao(
        cdrdao: &Cdrdao,
        device: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Self, DeviceError> {
        let device = device
            .or_else(|| cdrdao.default_device())
            .ok_or(DeviceError::NoDrive)?;
        Ok(Self::new(cdrdao.command(), device, timeout))
    }

    fn scratch_toc_path(&self) -> PathBuf {
        self.scratch_dir
            .join(format!("arccd-{}.toc", std::process::id()))
    }

    fn classify_failure(&self, output: &ToolOutput) -> DeviceError {
        if output.timed_out() {
            return DeviceError::Timeout {
                device: self.device.clone(),
                secs: self.timeout.map(|t| t.as_secs()).unwrap_or(0),
            };
        }
        classify_output(&self.device, output)
    }
}

/// Tell an empty tray apart from a failed read
pub fn classify_output(device: &str, output: &ToolOutput) -> DeviceError {
    let lower = output.stderr.to_lowercase();
    if NO_DISC_MARKERS.iter().any(|m| lower.contains(m)) {
        return DeviceError::NoDisc(device.to_string());
    }
    if lower.contains("cannot open scsi device") || lower.contains("no such file or directory") {
        return DeviceError::NoDrive;
    }
    DeviceError::ReadFailed {
        device: device.to_string(),
        message: output.last_error_line(),
    }
}

impl TocSource for CdDrive {
    fn read_toc(&mut self) -> Result<String, DeviceError> {
        let toc_path = self.scratch_toc_path();
        if toc_path.exists() {
            fs::remove_file(&toc_path)?;
        }
        let toc_arg = toc_path.to_string_lossy().into_owned();

        info!("Reading TOC from {}", self.device);
        let output = run_bounded(
            &self.command,
            &["read-toc", "--device", &self.device, "--fast-toc", &toc_arg],
            None,
            self.timeout,
        )?;

        if !output.success() {
            if let Err(e) = fs::remove_file(&toc_path) {
                debug!("No partial TOC to remove at {}: {}", toc_path.display(), e);
            }
            return Err(self.classify_failure(&output));
        }

        // The TOC file is only an intermediate; it never outlives the read
        let text = fs::read_to_string(&toc_path)?;
        fs::remove_file(&toc_path)?;
        debug!("Read {} bytes of TOC from {}", text.len(), self.device);
        Ok(text)
    }
}
