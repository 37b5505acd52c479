// Library exports for the arccd binary and integration tests

pub mod cd;
pub mod collection;
pub mod config;
pub mod console;
pub mod cue;
pub mod reconcile;
pub mod workflow;

pub use config::Config;
pub use workflow::{ArchiveWorkflow, HaltReason, WorkflowContext, WorkflowState};
