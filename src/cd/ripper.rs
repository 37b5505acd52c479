//! CD ripping through cdrdao: raw image plus cue sheet

use crate::cd::cdrdao::run_bounded;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum RipError {
    #[error("{tool} failed: {message}")]
    Tool { tool: String, message: String },
    #[error("{tool} did not finish within {secs}s")]
    Timeout { tool: String, secs: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces `<id>.bin` and `<id>.cue` inside an item directory
pub trait Ripper {
    fn rip(&mut self, target_dir: &Path, formatted_id: &str) -> Result<(), RipError>;
}

/// Rips with `cdrdao read-cd` and converts the TOC with `toc2cue`
#[derive(Debug, Clone)]
pub struct CdRipper {
    cdrdao: String,
    toc2cue: String,
    device: String,
    timeout: Option<Duration>,
}

impl CdRipper {
    pub fn new(cdrdao: &str, toc2cue: &str, device: &str, timeout: Option<Duration>) -> Self {
        Self {
            cdrdao: cdrdao.to_string(),
            toc2cue: toc2cue.to_string(),
            device: device.to_string(),
            timeout,
        }
    }

    fn run(&self, tool: &str, args: &[&str], dir: &Path) -> Result<(), RipError> {
        let output = run_bounded(tool, args, Some(dir), self.timeout)?;
        if output.timed_out() {
            return Err(RipError::Timeout {
                tool: tool.to_string(),
                secs: self.timeout.map(|t| t.as_secs()).unwrap_or(0),
            });
        }
        if !output.success() {
            return Err(RipError::Tool {
                tool: tool.to_string(),
                message: output.last_error_line(),
            });
        }
        Ok(())
    }
}

impl Ripper for CdRipper {
    fn rip(&mut self, target_dir: &Path, formatted_id: &str) -> Result<(), RipError> {
        let bin = format!("{}.bin", formatted_id);
        let toc = format!("{}.toc", formatted_id);
        let cue = format!("{}.cue", formatted_id);

        info!("Ripping {} into {}", self.device, target_dir.display());
        self.run(
            &self.cdrdao,
            &[
                "read-cd",
                "--device",
                &self.device,
                "--read-raw",
                "--datafile",
                &bin,
                &toc,
            ],
            target_dir,
        )?;

        info!("Writing cue sheet {}", cue);
        self.run(&self.toc2cue, &[&toc, &cue], target_dir)
    }
}
