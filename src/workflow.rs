//! Archive workflow
//!
//! One run archives one CD. The run is a chain of states, each of which has to
//! succeed before the next is entered:
//!
//! ```text
//! SelectItem -> PrepareDirectory -> AcquireToc -> Reconcile -> Confirm -> Rip -> Finalize -> Completed
//!      \______________\_________________\______________\___________\_______\________\______> Halted
//! ```
//!
//! A halt is an ordinary outcome carrying the reason; only filesystem failures
//! surface as `WorkflowError`. There are no checkpoints: every run starts at
//! `SelectItem` again.

use crate::cd::drive::{DeviceError, TocSource};
use crate::cd::ripper::{RipError, Ripper};
use crate::cd::toc::{parse_toc, TocParseError, TocRecord};
use crate::collection::catalog::{
    archived_record_path, pending_record_path, CatalogError, CollectionCatalog,
};
use crate::collection::id::{CatalogId, CatalogIdError};
use crate::collection::item::{dir_has_entries, item_dir, ArchiveItem};
use crate::collection::manifest::write_checksum_sidecar;
use crate::collection::record::CatalogEntry;
use crate::console::{InputError, OperatorInput};
use crate::reconcile::{reconcile, ReconciliationOutcome};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Failures that end the process rather than just the run
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The non-terminal states, used to say where a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SelectItem,
    PrepareDirectory,
    AcquireToc,
    Reconcile,
    Confirm,
    Rip,
    Finalize,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::SelectItem => "select item",
            Step::PrepareDirectory => "prepare directory",
            Step::AcquireToc => "acquire TOC",
            Step::Reconcile => "reconcile",
            Step::Confirm => "confirm",
            Step::Rip => "rip",
            Step::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum HaltReason {
    #[error("{0}")]
    InvalidId(CatalogIdError),
    #[error("No info file {} found, please create one", .path.display())]
    NotFound {
        id: u32,
        path: PathBuf,
        pending: BTreeSet<u32>,
    },
    #[error("Item {} exists and is already archived", .dir.display())]
    AlreadyArchived { id: CatalogId, dir: PathBuf },
    #[error("{0}")]
    Device(DeviceError),
    #[error("Inserted CD does not match {id}: {outcome}")]
    Discrepancy {
        id: CatalogId,
        outcome: ReconciliationOutcome,
    },
    #[error("Archiving {0} declined")]
    Declined(CatalogId),
    #[error("Ripping failed: {0}")]
    Rip(RipError),
    #[error("Ripping {0} finished without a complete image and cue sheet")]
    ArtifactsMissing(CatalogId),
    #[error("Operator input unavailable: {0}")]
    Input(InputError),
}

#[derive(Debug)]
pub enum WorkflowState {
    SelectItem,
    PrepareDirectory {
        entry: CatalogEntry,
    },
    AcquireToc {
        entry: CatalogEntry,
        item_dir: PathBuf,
    },
    Reconcile {
        entry: CatalogEntry,
        item_dir: PathBuf,
        toc: TocRecord,
    },
    Confirm {
        entry: CatalogEntry,
        item_dir: PathBuf,
    },
    Rip {
        entry: CatalogEntry,
        item_dir: PathBuf,
    },
    Finalize {
        entry: CatalogEntry,
        item_dir: PathBuf,
    },
    Completed {
        id: CatalogId,
    },
    Halted {
        at: Step,
        reason: HaltReason,
    },
}

/// Everything a run needs; built once per run and handed to every step
pub struct WorkflowContext<'a> {
    pub root: PathBuf,
    pub toc_source: &'a mut dyn TocSource,
    pub ripper: &'a mut dyn Ripper,
    pub input: &'a mut dyn OperatorInput,
    /// Archive this id instead of asking for one
    pub requested_id: Option<u32>,
    pub write_checksums: bool,
}

impl<'a> WorkflowContext<'a> {
    pub fn new(
        root: &Path,
        toc_source: &'a mut dyn TocSource,
        ripper: &'a mut dyn Ripper,
        input: &'a mut dyn OperatorInput,
    ) -> Self {
        Self {
            root: root.to_path_buf(),
            toc_source,
            ripper,
            input,
            requested_id: None,
            write_checksums: false,
        }
    }
}

fn halt(at: Step, reason: HaltReason) -> WorkflowState {
    warn!("Halted at {}: {}", at, reason);
    WorkflowState::Halted { at, reason }
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkflowState::Completed { .. } | WorkflowState::Halted { .. }
        )
    }

    /// The step this state performs next, if any
    pub fn step_name(&self) -> Option<Step> {
        match self {
            WorkflowState::SelectItem => Some(Step::SelectItem),
            WorkflowState::PrepareDirectory { .. } => Some(Step::PrepareDirectory),
            WorkflowState::AcquireToc { .. } => Some(Step::AcquireToc),
            WorkflowState::Reconcile { .. } => Some(Step::Reconcile),
            WorkflowState::Confirm { .. } => Some(Step::Confirm),
            WorkflowState::Rip { .. } => Some(Step::Rip),
            WorkflowState::Finalize { .. } => Some(Step::Finalize),
            WorkflowState::Completed { .. } | WorkflowState::Halted { .. } => None,
        }
    }

    /// Perform one transition; terminal states are returned unchanged
    pub fn step(self, ctx: &mut WorkflowContext<'_>) -> Result<WorkflowState, WorkflowError> {
        match self {
            WorkflowState::SelectItem => select_item(ctx),
            WorkflowState::PrepareDirectory { entry } => prepare_directory(ctx, entry),
            WorkflowState::AcquireToc { entry, item_dir } => Ok(acquire_toc(ctx, entry, item_dir)),
            WorkflowState::Reconcile {
                entry,
                item_dir,
                toc,
            } => Ok(reconcile_disc(entry, item_dir, &toc)),
            WorkflowState::Confirm { entry, item_dir } => Ok(confirm(ctx, entry, item_dir)),
            WorkflowState::Rip { entry, item_dir } => Ok(rip(ctx, entry, item_dir)),
            WorkflowState::Finalize { entry, item_dir } => finalize(ctx, entry, item_dir),
            terminal => Ok(terminal),
        }
    }
}

fn select_item(ctx: &mut WorkflowContext<'_>) -> Result<WorkflowState, WorkflowError> {
    let raw = match ctx.requested_id {
        Some(id) => id,
        None => match ctx.input.prompt_for_id() {
            Ok(id) => id,
            Err(e) => return Ok(halt(Step::SelectItem, HaltReason::Input(e))),
        },
    };
    let id = match CatalogId::new(raw) {
        Ok(id) => id,
        Err(e) => return Ok(halt(Step::SelectItem, HaltReason::InvalidId(e))),
    };

    let catalog = CollectionCatalog::build(&ctx.root)?;
    match catalog.lookup(id) {
        Ok(entry) => {
            info!(
                "Selected {}: {} - {} ({} tracks)",
                id,
                entry.album_artist,
                entry.title,
                entry.track_count()
            );
            Ok(WorkflowState::PrepareDirectory {
                entry: entry.clone(),
            })
        }
        Err(CatalogError::NotFound { path, .. }) => {
            let pending = catalog.pending_ids()?;
            Ok(halt(
                Step::SelectItem,
                HaltReason::NotFound {
                    id: raw,
                    path,
                    pending,
                },
            ))
        }
        Err(e) => Err(e.into()),
    }
}

fn prepare_directory(
    ctx: &mut WorkflowContext<'_>,
    entry: CatalogEntry,
) -> Result<WorkflowState, WorkflowError> {
    let dir = item_dir(&ctx.root, entry.id);
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        debug!("Created item directory {}", dir.display());
    } else if dir_has_entries(&dir)? {
        let item = ArchiveItem::from_directory(&dir, entry.id)?;
        if item.is_archived() {
            return Ok(halt(
                Step::PrepareDirectory,
                HaltReason::AlreadyArchived { id: entry.id, dir },
            ));
        }
        debug!(
            "Item directory {} holds {} artifact(s) but no complete archive",
            dir.display(),
            item.artifacts().len()
        );
    }
    Ok(WorkflowState::AcquireToc {
        entry,
        item_dir: dir,
    })
}

fn acquire_toc(ctx: &mut WorkflowContext<'_>, entry: CatalogEntry, item_dir: PathBuf) -> WorkflowState {
    info!("Reading CD contents");
    let text = match ctx.toc_source.read_toc() {
        Ok(text) => text,
        Err(e) => return halt(Step::AcquireToc, HaltReason::Device(e)),
    };
    let toc = match parse_toc(&text) {
        Ok(toc) => toc,
        // Nothing to read; the reconciler reports it as no disc
        Err(TocParseError::EmptyToc) => TocRecord::empty(),
        Err(e) => {
            return halt(
                Step::AcquireToc,
                HaltReason::Device(DeviceError::UnreadableToc(e)),
            )
        }
    };
    debug!(
        "TOC lists {} track(s) over {} sectors",
        toc.len(),
        toc.total_sectors()
    );
    WorkflowState::Reconcile {
        entry,
        item_dir,
        toc,
    }
}

fn reconcile_disc(entry: CatalogEntry, item_dir: PathBuf, toc: &TocRecord) -> WorkflowState {
    let outcome = reconcile(toc, &entry);
    if outcome.is_match() {
        return WorkflowState::Confirm { entry, item_dir };
    }
    halt(
        Step::Reconcile,
        HaltReason::Discrepancy {
            id: entry.id,
            outcome,
        },
    )
}

/// What the operator is shown before agreeing to rip
pub fn confirmation_prompt(entry: &CatalogEntry) -> String {
    format!(
        "Inserted CD is id {}\nArtist is {}, and title is {}\nItem has {} tracks.",
        entry.formatted_id,
        entry.album_artist,
        entry.title,
        entry.track_count()
    )
}

fn confirm(ctx: &mut WorkflowContext<'_>, entry: CatalogEntry, item_dir: PathBuf) -> WorkflowState {
    match ctx.input.confirm(&confirmation_prompt(&entry)) {
        Ok(true) => WorkflowState::Rip { entry, item_dir },
        Ok(false) => halt(Step::Confirm, HaltReason::Declined(entry.id)),
        Err(e) => halt(Step::Confirm, HaltReason::Input(e)),
    }
}

fn rip(ctx: &mut WorkflowContext<'_>, entry: CatalogEntry, item_dir: PathBuf) -> WorkflowState {
    // A failed read needs a person at the drive; retrying here won't help
    match ctx.ripper.rip(&item_dir, &entry.formatted_id) {
        Ok(()) => WorkflowState::Finalize { entry, item_dir },
        Err(e) => halt(Step::Rip, HaltReason::Rip(e)),
    }
}

fn finalize(
    ctx: &mut WorkflowContext<'_>,
    entry: CatalogEntry,
    item_dir: PathBuf,
) -> Result<WorkflowState, WorkflowError> {
    let item = ArchiveItem::from_directory(&item_dir, entry.id)?;
    if !item.is_archived() {
        return Ok(halt(Step::Finalize, HaltReason::ArtifactsMissing(entry.id)));
    }

    let pending = pending_record_path(&ctx.root, entry.id);
    if pending.exists() {
        let archived = archived_record_path(&ctx.root, entry.id);
        fs::rename(&pending, &archived)?;
        debug!("Moved {} to {}", pending.display(), archived.display());
    }
    if ctx.write_checksums {
        let sidecar = write_checksum_sidecar(&item_dir, entry.id)?;
        debug!("Wrote {}", sidecar.display());
    }

    info!("Archived {} into {}", entry.id, item_dir.display());
    Ok(WorkflowState::Completed { id: entry.id })
}

pub struct ArchiveWorkflow;

impl ArchiveWorkflow {
    /// Drive a run from `SelectItem` to a terminal state
    pub fn run(ctx: &mut WorkflowContext<'_>) -> Result<WorkflowState, WorkflowError> {
        let mut state = WorkflowState::SelectItem;
        while let Some(step) = state.step_name() {
            debug!("Entering {}", step);
            state = state.step(ctx)?;
        }
        Ok(state)
    }
}
