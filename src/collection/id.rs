use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest id that still fits the five-digit naming scheme
pub const MAX_ID: u32 = 99_999;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogIdError {
    #[error("id {0} does not fit in five digits (max {})", MAX_ID)]
    OutOfRange(u64),
    #[error("{0:?} is not a catalog id")]
    Invalid(String),
}

/// Numeric catalog id; its five-digit form names every file and directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatalogId(u32);

impl CatalogId {
    pub fn new(id: u32) -> Result<Self, CatalogIdError> {
        if id > MAX_ID {
            return Err(CatalogIdError::OutOfRange(id as u64));
        }
        Ok(Self(id))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Zero-padded five-digit form, e.g. `00042`
    pub fn formatted(self) -> String {
        format!("{:05}", self.0)
    }

    /// Recognise a file stem written in the five-digit form
    pub fn from_formatted(stem: &str) -> Option<Self> {
        if stem.len() != 5 || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        stem.parse().ok().map(Self)
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:05}", self.0)
    }
}

impl FromStr for CatalogId {
    type Err = CatalogIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u64 = s
            .trim()
            .parse()
            .map_err(|_| CatalogIdError::Invalid(s.to_string()))?;
        if value > MAX_ID as u64 {
            return Err(CatalogIdError::OutOfRange(value));
        }
        Ok(Self(value as u32))
    }
}
