//! cdrdao executable detection and bounded process invocation

use regex::Regex;
use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum CdrdaoError {
    #[error("cdrdao not found at {0:?}")]
    NotInstalled(String),
    #[error("cdrdao version banner not recognised")]
    UnknownVersion,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A located cdrdao executable: command, version and attached CD devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cdrdao {
    command: String,
    version: String,
    devices: Vec<String>,
}

/// Captured result of a finished (or abandoned) child process
#[derive(Debug)]
pub struct ToolOutput {
    /// `None` when the deadline expired and the child was killed
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn timed_out(&self) -> bool {
        self.status.is_none()
    }

    pub fn success(&self) -> bool {
        self.status.map(|s| s.success()).unwrap_or(false)
    }

    /// Last non-empty stderr line, for error messages
    pub fn last_error_line(&self) -> String {
        self.stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("no diagnostic output")
            .to_string()
    }
}

impl Cdrdao {
    /// Inspect an installed cdrdao: read its version banner and scan for devices
    pub fn detect(command: &str) -> Result<Self, CdrdaoError> {
        // cdrdao prints its banner and usage to stderr and exits non-zero
        // when run without a sub-command
        let banner = Command::new(command)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CdrdaoError::NotInstalled(command.to_string()),
                _ => CdrdaoError::Io(e),
            })?;
        let version = parse_version(&String::from_utf8_lossy(&banner.stderr))
            .or_else(|| parse_version(&String::from_utf8_lossy(&banner.stdout)))
            .ok_or(CdrdaoError::UnknownVersion)?;

        let scan = Command::new(command)
            .arg("scanbus")
            .stdin(Stdio::null())
            .output()?;
        let devices = parse_scanbus(&String::from_utf8_lossy(&scan.stderr));
        debug!("cdrdao {} found {} device(s)", version, devices.len());

        Ok(Self {
            command: command.to_string(),
            version,
            devices,
        })
    }

    pub fn new(command: &str, version: &str, devices: Vec<String>) -> Self {
        Self {
            command: command.to_string(),
            version: version.to_string(),
            devices,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    /// First detected device
    pub fn default_device(&self) -> Option<&str> {
        self.devices.first().map(String::as_str)
    }
}

fn version_banner() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)cdrdao version\s+(\S+)").expect("static regex is valid"))
}

/// Extract the version from cdrdao's banner line
pub fn parse_version(banner: &str) -> Option<String> {
    version_banner()
        .captures(banner)
        .map(|c| c[1].to_string())
}

/// Device paths from `cdrdao scanbus` output (`/dev/sr0 : VENDOR, MODEL, REV`)
pub fn parse_scanbus(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let (device, description) = line.split_once(" : ")?;
            let device = device.trim();
            if device.is_empty() || description.trim().is_empty() || device.contains(' ') {
                return None;
            }
            Some(device.to_string())
        })
        .collect()
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut source) = source {
            let _ = source.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Run a command, killing it if it outlives `timeout`
///
/// Output pipes are drained on helper threads so a chatty child can't block
/// on a full pipe while we poll it.
pub fn run_bounded(
    command: &str,
    args: &[&str],
    cwd: Option<&Path>,
    timeout: Option<Duration>,
) -> std::io::Result<ToolOutput> {
    debug!("Running {} {}", command, args.join(" "));
    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn()?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = timeout.map(|t| Instant::now() + t);
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break Some(status);
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!("{} exceeded its time limit, killing it", command);
            let _ = child.kill();
            let _ = child.wait();
            break None;
        }
        thread::sleep(POLL_INTERVAL);
    };

    Ok(ToolOutput {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}
