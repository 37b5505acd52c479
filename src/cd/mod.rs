//! CD access module
//!
//! TOC parsing plus the cdrdao-backed drive and ripper. The drive and ripper
//! sit behind the `TocSource` and `Ripper` traits so the archive workflow can
//! run against in-memory stand-ins.

pub mod cdrdao;
pub mod drive;
pub mod msf;
pub mod ripper;
pub mod toc;

pub use cdrdao::Cdrdao;
pub use drive::{CdDrive, DeviceError, TocSource};
pub use ripper::{CdRipper, RipError, Ripper};
pub use toc::{parse_toc, parse_toc_lines, TocParseError, TocRecord, TrackRecord};
