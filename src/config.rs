use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const DEFAULT_TOC_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Collection root {} is a file, not a directory", .0.display())]
    RootIsFile(PathBuf),
    #[error("Cannot create collection root {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Application configuration
/// Loads `.env` when present, then the `ARCCD_*` environment variables
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Directory holding pending info records and item directories
    pub collection_root: PathBuf,
    pub cdrdao: String,
    pub toc2cue: String,
    /// Drive to read from; the first one cdrdao reports when unset
    pub device: Option<String>,
    /// `None` waits forever
    pub toc_timeout: Option<Duration>,
    pub rip_timeout: Option<Duration>,
    /// Write a SHA-256 sidecar on finalize and check it on verify
    pub checksums: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collection_root: default_collection_root(),
            cdrdao: "cdrdao".to_string(),
            toc2cue: "toc2cue".to_string(),
            device: None,
            toc_timeout: Some(Duration::from_secs(DEFAULT_TOC_TIMEOUT_SECS)),
            rip_timeout: None,
            checksums: true,
        }
    }
}

fn default_collection_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("arccd"))
        .unwrap_or_else(|| PathBuf::from("arccd"))
}

/// 0 means no limit
fn parse_timeout(value: &str) -> Option<Option<Duration>> {
    match value.trim().parse::<u64>() {
        Ok(0) => Some(None),
        Ok(secs) => Some(Some(Duration::from_secs(secs))),
        Err(_) => None,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    pub fn load() -> Self {
        if dotenvy::dotenv().is_ok() {
            debug!("Loaded .env file");
        }
        Self::from_env()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(root) = lookup("ARCCD_COLLECTION_ROOT") {
            config.collection_root = PathBuf::from(root);
        }
        if let Some(cdrdao) = lookup("ARCCD_CDRDAO") {
            config.cdrdao = cdrdao;
        }
        if let Some(toc2cue) = lookup("ARCCD_TOC2CUE") {
            config.toc2cue = toc2cue;
        }
        config.device = lookup("ARCCD_DEVICE").filter(|d| !d.trim().is_empty());

        if let Some(raw) = lookup("ARCCD_TOC_TIMEOUT_SECS") {
            match parse_timeout(&raw) {
                Some(timeout) => config.toc_timeout = timeout,
                None => info!("Ignoring ARCCD_TOC_TIMEOUT_SECS={:?}", raw),
            }
        }
        if let Some(raw) = lookup("ARCCD_RIP_TIMEOUT_SECS") {
            match parse_timeout(&raw) {
                Some(timeout) => config.rip_timeout = timeout,
                None => info!("Ignoring ARCCD_RIP_TIMEOUT_SECS={:?}", raw),
            }
        }
        if let Some(raw) = lookup("ARCCD_CHECKSUMS") {
            match parse_flag(&raw) {
                Some(enabled) => config.checksums = enabled,
                None => info!("Ignoring ARCCD_CHECKSUMS={:?}", raw),
            }
        }

        config
    }

    pub fn with_collection_root(mut self, root: &Path) -> Self {
        self.collection_root = root.to_path_buf();
        self
    }

    pub fn with_device(mut self, device: &str) -> Self {
        self.device = Some(device.to_string());
        self
    }

    /// Create the collection root if missing
    pub fn ensure_collection_root(&self) -> Result<&Path, ConfigError> {
        let root = &self.collection_root;
        if root.is_file() {
            return Err(ConfigError::RootIsFile(root.clone()));
        }
        if !root.exists() {
            std::fs::create_dir_all(root).map_err(|source| ConfigError::Io {
                path: root.clone(),
                source,
            })?;
            info!("Created collection root {}", root.display());
        }
        Ok(root)
    }
}
