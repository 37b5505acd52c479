use std::path::PathBuf;
use std::process::ExitCode;

use clap::{
    builder::{
        styling::{AnsiColor, Effects},
        Styles,
    },
    Parser, Subcommand,
};
use tracing::{debug, error};

use arccd::cd::cdrdao::Cdrdao;
use arccd::cd::drive::CdDrive;
use arccd::cd::ripper::CdRipper;
use arccd::collection::{ArchiveItem, CatalogId, CollectionCatalog, ManifestVerifier};
use arccd::collection::manifest::ManifestTestResult;
use arccd::console::{AssumeYes, ConsoleInput, OperatorInput};
use arccd::workflow::{ArchiveWorkflow, HaltReason, WorkflowContext, WorkflowState};
use arccd::Config;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name = env!("CARGO_PKG_NAME"),
  bin_name = env!("CARGO_PKG_NAME"),
  author = env!("CARGO_PKG_AUTHORS"),
  about = env!("CARGO_PKG_DESCRIPTION"),
  styles = styles(),
)]
struct Cli {
    /// Collection root (overrides ARCCD_COLLECTION_ROOT)
    #[clap(long, global = true)]
    root: Option<PathBuf>,

    /// Debug logging unless RUST_LOG says otherwise
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Archive the CD in the drive
    Archive(ArchiveOptions),

    /// List items that have a record but no archive yet
    Pending,

    /// List archived items
    Archived,

    /// Check item directories against their records
    Verify(VerifyOptions),

    /// Show the detected cdrdao and CD devices
    Drive,
}

#[derive(Parser, Debug, Clone)]
struct ArchiveOptions {
    /// Id to archive; prompted for when missing
    #[clap(long)]
    id: Option<u32>,

    /// Don't ask before ripping
    #[clap(long)]
    yes: bool,

    /// CD device (overrides ARCCD_DEVICE)
    #[clap(long)]
    device: Option<String>,
}

#[derive(Parser, Debug, Clone)]
struct VerifyOptions {
    /// Single id to verify; every catalogued item when missing
    id: Option<u32>,

    /// Print results as JSON
    #[clap(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or debug with -v
    let default_filter = if cli.verbose { "debug" } else { "info" };
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());
    tracing_subscriber::fmt().with_env_filter(log_filter).init();

    let mut config = Config::load();
    if let Some(root) = &cli.root {
        config = config.with_collection_root(root);
    }
    if let Err(e) = config.ensure_collection_root() {
        error!("{}", e);
        return ExitCode::FAILURE;
    }
    debug!("Using collection root {}", config.collection_root.display());

    match cli.command {
        Command::Archive(opt) => archive(config, opt),
        Command::Pending => list_ids(&config, false),
        Command::Archived => list_ids(&config, true),
        Command::Verify(opt) => verify(&config, opt),
        Command::Drive => drive(&config),
    }
}

fn archive(mut config: Config, opt: ArchiveOptions) -> ExitCode {
    if let Some(device) = &opt.device {
        config = config.with_device(device);
    }

    println!("Welcome to arccd");
    let cdrdao = match Cdrdao::detect(&config.cdrdao) {
        Ok(cdrdao) => cdrdao,
        Err(e) => {
            println!("Cannot archive without cdrdao: {}", e);
            return ExitCode::FAILURE;
        }
    };
    println!("Using cdrdao {}", cdrdao.version());

    let mut drive =
        match CdDrive::from_cdrdao(&cdrdao, config.device.as_deref(), config.toc_timeout) {
            Ok(drive) => drive,
            Err(e) => {
                println!("{}", e);
                return ExitCode::FAILURE;
            }
        };
    let mut ripper = CdRipper::new(
        cdrdao.command(),
        &config.toc2cue,
        &drive.device,
        config.rip_timeout,
    );
    let mut input: Box<dyn OperatorInput> = if opt.yes {
        Box::new(AssumeYes(ConsoleInput::stdio()))
    } else {
        Box::new(ConsoleInput::stdio())
    };

    let mut ctx = WorkflowContext::new(
        &config.collection_root,
        &mut drive,
        &mut ripper,
        input.as_mut(),
    );
    ctx.requested_id = opt.id;
    ctx.write_checksums = config.checksums;

    match ArchiveWorkflow::run(&mut ctx) {
        Ok(WorkflowState::Completed { id }) => {
            println!("Item {} archived", id);
            ExitCode::SUCCESS
        }
        Ok(WorkflowState::Halted { reason, .. }) => {
            report_halt(&reason);
            ExitCode::FAILURE
        }
        Ok(other) => {
            error!("Workflow stopped in a non-terminal state: {:?}", other.step_name());
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("Archiving failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn report_halt(reason: &HaltReason) {
    println!("{}", reason);
    if let HaltReason::NotFound { pending, .. } = reason {
        if pending.is_empty() {
            println!("There are no pending items");
        } else {
            println!("Pending items: {}", format_ids(pending.iter().copied()));
        }
    }
}

fn format_ids(ids: impl Iterator<Item = u32>) -> String {
    ids.map(|id| format!("{:05}", id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn list_ids(config: &Config, archived: bool) -> ExitCode {
    let catalog = match CollectionCatalog::build(&config.collection_root) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let ids = if archived {
        catalog.archived_ids()
    } else {
        catalog.pending_ids()
    };
    let ids = match ids {
        Ok(ids) => ids,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    for id in &ids {
        println!("{:05}", id);
    }
    if !archived {
        for issue in catalog.issues() {
            println!("Skipped {}: {}", issue.path.display(), issue.message);
        }
    }
    ExitCode::SUCCESS
}

fn verify(config: &Config, opt: VerifyOptions) -> ExitCode {
    let catalog = match CollectionCatalog::build(&config.collection_root) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let entries = match opt.id {
        Some(raw) => {
            let found = CatalogId::new(raw)
                .map_err(|e| e.to_string())
                .and_then(|id| catalog.lookup(id).map_err(|e| e.to_string()));
            match found {
                Ok(entry) => vec![entry],
                Err(message) => {
                    println!("{}", message);
                    return ExitCode::FAILURE;
                }
            }
        }
        None => catalog.entries(),
    };

    let verifier = ManifestVerifier::new().with_checksums(config.checksums);
    let mut results: Vec<ManifestTestResult> = Vec::with_capacity(entries.len());
    for entry in entries {
        match ArchiveItem::from_root(&config.collection_root, entry.id) {
            Ok(item) => results.push(verifier.verify(&item, entry)),
            Err(e) => {
                error!("Cannot read item {}: {}", entry.id, e);
                return ExitCode::FAILURE;
            }
        }
    }

    if opt.json {
        match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Cannot serialize results: {}", e);
                return ExitCode::FAILURE;
            }
        }
    } else {
        for result in &results {
            let verdict = if result.passed() { "ok" } else { "FAILED" };
            println!("{} {}", result.id, verdict);
            for artifact in &result.results {
                match &artifact.detail {
                    Some(detail) => println!(
                        "  {:?}: {:?} ({})",
                        artifact.kind, artifact.status, detail
                    ),
                    None => println!("  {:?}: {:?}", artifact.kind, artifact.status),
                }
            }
        }
    }

    if results.iter().all(ManifestTestResult::passed) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn drive(config: &Config) -> ExitCode {
    match Cdrdao::detect(&config.cdrdao) {
        Ok(cdrdao) => {
            println!("cdrdao {} ({})", cdrdao.version(), cdrdao.command());
            if cdrdao.devices().is_empty() {
                println!("No CD devices found");
            }
            for device in cdrdao.devices() {
                let marker = if config.device.as_deref() == Some(device.as_str()) {
                    " (configured)"
                } else {
                    ""
                };
                println!("  {}{}", device, marker);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", e);
            ExitCode::FAILURE
        }
    }
}
