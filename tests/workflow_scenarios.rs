mod support;

use std::fs;

use arccd::cd::drive::DeviceError;
use arccd::collection::{ArchiveItem, CatalogId, CollectionCatalog, RecordLocation};
use arccd::reconcile::ReconciliationOutcome;
use arccd::workflow::{ArchiveWorkflow, HaltReason, Step, WorkflowContext, WorkflowState};
use tempfile::TempDir;

use crate::support::{
    dir_listing, tracing_init, write_archived_record, write_pending_record, write_rip_output,
    FakeDrive, FakeRipper, ScriptedInput,
};

fn id(n: u32) -> CatalogId {
    CatalogId::new(n).unwrap()
}

#[test]
fn test_matching_disc_is_archived() {
    tracing_init();
    let root = TempDir::new().unwrap();
    write_pending_record(root.path(), 42, "Nina Simone", "Pastel Blues", 10);

    let mut drive = FakeDrive::with_tracks(10);
    let mut ripper = FakeRipper::new(10);
    let mut input = ScriptedInput::new(&[42], &[true]);
    let state = {
        let mut ctx = WorkflowContext::new(root.path(), &mut drive, &mut ripper, &mut input);
        ctx.write_checksums = true;
        ArchiveWorkflow::run(&mut ctx).unwrap()
    };

    assert!(matches!(state, WorkflowState::Completed { id: done } if done == id(42)));
    assert_eq!(input.questions.len(), 1);
    assert!(input.questions[0].contains("Artist is Nina Simone, and title is Pastel Blues"));
    assert!(input.questions[0].contains("Item has 10 tracks."));
    assert_eq!(ripper.calls.len(), 1);
    assert_eq!(ripper.calls[0].1, "00042");

    let item = ArchiveItem::from_root(root.path(), id(42)).unwrap();
    assert!(item.is_archived());
    assert_eq!(
        dir_listing(&root.path().join("00042")),
        vec!["00042.bin", "00042.cue", "00042.info", "00042.sha256"]
    );
    assert!(!root.path().join("00042.info").exists());

    // The moved record is now read as archived
    let catalog = CollectionCatalog::build(root.path()).unwrap();
    assert_eq!(
        catalog.lookup(id(42)).unwrap().location,
        RecordLocation::Archived
    );
    assert!(catalog.archived_ids().unwrap().contains(&42));
    assert!(catalog.pending_ids().unwrap().is_empty());
}

#[test]
fn test_track_count_mismatch_halts_before_writing() {
    tracing_init();
    let root = TempDir::new().unwrap();
    write_pending_record(root.path(), 7, "Artist", "Eight Songs", 8);

    let mut drive = FakeDrive::with_tracks(5);
    let mut ripper = FakeRipper::new(5);
    let mut input = ScriptedInput::new(&[], &[true]);
    let state = {
        let mut ctx = WorkflowContext::new(root.path(), &mut drive, &mut ripper, &mut input);
        ctx.requested_id = Some(7);
        ArchiveWorkflow::run(&mut ctx).unwrap()
    };

    match state {
        WorkflowState::Halted {
            at: Step::Reconcile,
            reason: HaltReason::Discrepancy { id: halted, outcome },
        } => {
            assert_eq!(halted, id(7));
            assert_eq!(
                outcome,
                ReconciliationOutcome::TrackCountMismatch {
                    expected: 8,
                    actual: 5
                }
            );
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(input.questions.is_empty());
    assert!(ripper.calls.is_empty());
    assert!(dir_listing(&root.path().join("00007")).is_empty());
    assert!(root.path().join("00007.info").exists());
}

#[test]
fn test_unknown_id_reports_pending_items() {
    tracing_init();
    let root = TempDir::new().unwrap();
    write_pending_record(root.path(), 1, "A", "One", 3);
    write_pending_record(root.path(), 12, "B", "Twelve", 4);
    write_archived_record(root.path(), 30, 2);
    write_rip_output(&root.path().join("00030"), "00030", 2);

    let mut drive = FakeDrive::with_tracks(3);
    let mut ripper = FakeRipper::new(3);
    let mut input = ScriptedInput::new(&[99999], &[]);
    let state = {
        let mut ctx = WorkflowContext::new(root.path(), &mut drive, &mut ripper, &mut input);
        ArchiveWorkflow::run(&mut ctx).unwrap()
    };

    let expected = CollectionCatalog::build(root.path())
        .unwrap()
        .pending_ids()
        .unwrap();
    match state {
        WorkflowState::Halted {
            at: Step::SelectItem,
            reason: HaltReason::NotFound { id, pending, path },
        } => {
            assert_eq!(id, 99999);
            assert_eq!(pending, expected);
            assert_eq!(pending.into_iter().collect::<Vec<_>>(), vec![1, 12]);
            assert!(path.ends_with("99999.info"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(drive.reads, 0);
}

#[test]
fn test_out_of_range_id_halts() {
    let root = TempDir::new().unwrap();
    let mut drive = FakeDrive::with_tracks(1);
    let mut ripper = FakeRipper::new(1);
    let mut input = ScriptedInput::new(&[100_000], &[]);
    let mut ctx = WorkflowContext::new(root.path(), &mut drive, &mut ripper, &mut input);
    let state = ArchiveWorkflow::run(&mut ctx).unwrap();
    assert!(matches!(
        state,
        WorkflowState::Halted {
            at: Step::SelectItem,
            reason: HaltReason::InvalidId(_)
        }
    ));
}

#[test]
fn test_declined_confirmation_leaves_record_pending() {
    tracing_init();
    let root = TempDir::new().unwrap();
    write_pending_record(root.path(), 5, "Artist", "Title", 4);

    let mut drive = FakeDrive::with_tracks(4);
    let mut ripper = FakeRipper::new(4);
    let mut input = ScriptedInput::new(&[5], &[false]);
    let state = {
        let mut ctx = WorkflowContext::new(root.path(), &mut drive, &mut ripper, &mut input);
        ArchiveWorkflow::run(&mut ctx).unwrap()
    };

    assert!(matches!(
        state,
        WorkflowState::Halted {
            at: Step::Confirm,
            reason: HaltReason::Declined(_)
        }
    ));
    assert!(ripper.calls.is_empty());
    assert!(root.path().join("00005.info").exists());
    assert!(dir_listing(&root.path().join("00005")).is_empty());
}

#[test]
fn test_archived_item_is_not_ripped_again() {
    let root = TempDir::new().unwrap();
    write_archived_record(root.path(), 8, 3);
    write_rip_output(&root.path().join("00008"), "00008", 3);

    let mut drive = FakeDrive::with_tracks(3);
    let mut ripper = FakeRipper::new(3);
    let mut input = ScriptedInput::new(&[8], &[true]);
    let state = {
        let mut ctx = WorkflowContext::new(root.path(), &mut drive, &mut ripper, &mut input);
        ArchiveWorkflow::run(&mut ctx).unwrap()
    };

    match state {
        WorkflowState::Halted {
            at: Step::PrepareDirectory,
            reason,
        } => {
            assert!(matches!(reason, HaltReason::AlreadyArchived { .. }));
            assert!(reason.to_string().contains("already archived"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(drive.reads, 0);
    assert!(ripper.calls.is_empty());
}

#[test]
fn test_partial_item_directory_is_reused() {
    let root = TempDir::new().unwrap();
    write_pending_record(root.path(), 9, "Artist", "Title", 2);
    let dir = root.path().join("00009");
    fs::create_dir(&dir).unwrap();
    fs::write(dir.join("00009.toc"), "CD_DA\n").unwrap();

    let mut drive = FakeDrive::with_tracks(2);
    let mut ripper = FakeRipper::new(2);
    let mut input = ScriptedInput::new(&[9], &[true]);
    let state = {
        let mut ctx = WorkflowContext::new(root.path(), &mut drive, &mut ripper, &mut input);
        ArchiveWorkflow::run(&mut ctx).unwrap()
    };

    assert!(matches!(state, WorkflowState::Completed { .. }));
    assert!(ArchiveItem::from_root(root.path(), id(9)).unwrap().is_archived());
    // No checksum unless asked for
    assert!(!dir.join("00009.sha256").exists());
}

#[test]
fn test_empty_drive_and_failed_read_stay_distinct() {
    let root = TempDir::new().unwrap();
    write_pending_record(root.path(), 11, "Artist", "Title", 2);

    let failures = [
        DeviceError::NoDisc("/dev/sr0".to_string()),
        DeviceError::ReadFailed {
            device: "/dev/sr0".to_string(),
            message: "Cannot read TOC".to_string(),
        },
    ];
    let mut reasons = Vec::new();
    for failure in failures {
        let mut drive = FakeDrive::failing(failure);
        let mut ripper = FakeRipper::new(2);
        let mut input = ScriptedInput::new(&[11], &[true]);
        let mut ctx = WorkflowContext::new(root.path(), &mut drive, &mut ripper, &mut input);
        match ArchiveWorkflow::run(&mut ctx).unwrap() {
            WorkflowState::Halted {
                at: Step::AcquireToc,
                reason: HaltReason::Device(e),
            } => reasons.push(e),
            other => panic!("unexpected {:?}", other),
        }
    }

    assert!(matches!(reasons[0], DeviceError::NoDisc(_)));
    assert!(matches!(reasons[1], DeviceError::ReadFailed { .. }));
    assert_ne!(reasons[0].to_string(), reasons[1].to_string());
}

#[test]
fn test_toc_without_tracks_means_no_disc() {
    let root = TempDir::new().unwrap();
    write_pending_record(root.path(), 13, "Artist", "Title", 2);

    let mut drive = FakeDrive::with_text("CD_DA\n");
    let mut ripper = FakeRipper::new(2);
    let mut input = ScriptedInput::new(&[13], &[true]);
    let mut ctx = WorkflowContext::new(root.path(), &mut drive, &mut ripper, &mut input);
    let state = ArchiveWorkflow::run(&mut ctx).unwrap();

    assert!(matches!(
        state,
        WorkflowState::Halted {
            at: Step::Reconcile,
            reason: HaltReason::Discrepancy {
                outcome: ReconciliationOutcome::NoDiscPresent,
                ..
            }
        }
    ));
}

#[test]
fn test_rip_failure_keeps_record_pending() {
    let root = TempDir::new().unwrap();
    write_pending_record(root.path(), 14, "Artist", "Title", 2);

    let mut drive = FakeDrive::with_tracks(2);
    let mut ripper = FakeRipper::failing();
    let mut input = ScriptedInput::new(&[14], &[true]);
    let state = {
        let mut ctx = WorkflowContext::new(root.path(), &mut drive, &mut ripper, &mut input);
        ArchiveWorkflow::run(&mut ctx).unwrap()
    };

    assert!(matches!(
        state,
        WorkflowState::Halted {
            at: Step::Rip,
            reason: HaltReason::Rip(_)
        }
    ));
    assert_eq!(ripper.calls.len(), 1);
    assert!(root.path().join("00014.info").exists());
}

#[test]
fn test_steps_can_be_driven_one_at_a_time() {
    let root = TempDir::new().unwrap();
    write_pending_record(root.path(), 15, "Artist", "Title", 3);

    let mut drive = FakeDrive::with_tracks(3);
    let mut ripper = FakeRipper::new(3);
    let mut input = ScriptedInput::new(&[15], &[true]);
    let mut ctx = WorkflowContext::new(root.path(), &mut drive, &mut ripper, &mut input);

    let mut seen = Vec::new();
    let mut state = WorkflowState::SelectItem;
    while let Some(step) = state.step_name() {
        seen.push(step);
        state = state.step(&mut ctx).unwrap();
    }

    assert_eq!(
        seen,
        vec![
            Step::SelectItem,
            Step::PrepareDirectory,
            Step::AcquireToc,
            Step::Reconcile,
            Step::Confirm,
            Step::Rip,
            Step::Finalize,
        ]
    );
    assert!(state.is_terminal());
}
