//! Headless command line front end: load a layout file, check it and report.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use rackplan_designer::{
    CheckOutcome, Confirmation, DrawingDocument, FixedAnswer, LoadReport, PersistedDocument,
};
use rackplan_settings::EngineConfig;

/// Exit code when shapes need a user decision before the layout is valid.
pub const EXIT_NEEDS_DECISION: i32 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "rackplan",
    about = "Checks and repairs warehouse rack layout files",
    version
)]
pub struct Cli {
    /// Engine config file (JSON or TOML). Defaults to the user config.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Repair overlapping shapes and re-derive groups, indices and tie beams.
    Check(CheckArgs),

    /// Print a summary of a layout file.
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Layout file to check.
    pub file: PathBuf,

    /// Delete shapes that cannot be moved to a free spot.
    #[arg(long)]
    pub delete_unrepairable: bool,

    /// Write the repaired layout here (may be the input file).
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Layout file to summarize.
    pub file: PathBuf,
}

/// Runs a parsed command line and returns the process exit code.
pub fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Check(args) => run_check(args, config),
        Commands::Info(args) => run_info(args, config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::load_or_default().unwrap_or_else(|e| {
            tracing::warn!("using default engine config: {}", e);
            EngineConfig::default()
        })),
    }
}

fn open(file: &Path, config: EngineConfig) -> anyhow::Result<DrawingDocument> {
    let persisted = PersistedDocument::load_from_file(file)
        .with_context(|| format!("Cannot open {}", file.display()))?;
    let (document, report) = DrawingDocument::from_persisted(persisted, config);
    log_report(file, &report);
    Ok(document)
}

fn log_report(file: &Path, report: &LoadReport) {
    if report.newer_version {
        tracing::warn!("{} was written by a newer version", file.display());
    }
    for entry in &report.unsupported {
        tracing::warn!("unsupported shape skipped: {}", entry);
    }
    for entry in &report.partial_errors {
        tracing::warn!("load error: {}", entry);
    }
}

fn run_check(args: CheckArgs, config: EngineConfig) -> anyhow::Result<i32> {
    let mut document = open(&args.file, config)?;
    if args.delete_unrepairable {
        document.set_confirmation_service(Box::new(FixedAnswer(Confirmation::Yes)));
    }

    let outcome = document.check_document(args.delete_unrepairable)?;
    let code = match &outcome {
        CheckOutcome::Ok => {
            println!("{}: ok", args.file.display());
            0
        }
        CheckOutcome::Repaired { moved, removed } => {
            println!(
                "{}: moved {} shape(s), removed {} shape(s)",
                args.file.display(),
                moved,
                removed
            );
            0
        }
        CheckOutcome::NeedsUserDecision { unrepairable } => {
            println!(
                "{}: {} shape(s) cannot be placed:",
                args.file.display(),
                unrepairable.len()
            );
            for (sheet, id) in unrepairable {
                println!("  sheet {} shape {}", sheet, id);
            }
            EXIT_NEEDS_DECISION
        }
    };

    for sheet in 0..document.sheet_count() {
        let errors = document.tie_beam_errors(sheet)?;
        if !errors.is_empty() {
            println!("  sheet {}: racks too tall for a tie beam: {:?}", sheet, errors);
        }
    }

    if let Some(output) = &args.output {
        if code == 0 {
            document
                .to_persisted()
                .save_to_file(output)
                .with_context(|| format!("Cannot write {}", output.display()))?;
            tracing::info!("layout written to {}", output.display());
        } else {
            tracing::warn!("layout not written: unresolved conflicts");
        }
    }
    Ok(code)
}

fn run_info(args: InfoArgs, config: EngineConfig) -> anyhow::Result<i32> {
    let document = open(&args.file, config)?;
    let state = document.state();
    println!("{} ({})", args.file.display(), state.metadata.id);
    if !state.metadata.project.is_empty() {
        println!("  project: {}", state.metadata.project);
    }
    for (index, sheet) in state.sheets.iter().enumerate() {
        println!(
            "  sheet {} '{}' {} x {} mm: {} shape(s), {} rack group(s), {} tie beam(s)",
            index,
            sheet.name,
            sheet.length,
            sheet.width,
            sheet.shapes.len(),
            sheet.groups.len(),
            sheet.tie_beams.len()
        );
    }
    println!(
        "  {} rack size(s), {} column size(s)",
        state.rack_sizes.len(),
        state.column_sizes.len()
    );
    Ok(0)
}
