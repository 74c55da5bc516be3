use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use insights_archive::archive::ArchiveBuilder;
use insights_archive::cli::{Args, Commands};
use insights_archive::config::{load_or_default, CollectionPlan};
use insights_archive::constants::COLLECTION_SUMMARY_FILE;
use insights_archive::models::PackagedArchive;
use insights_archive::utils::files::copy_regular_file;
use insights_archive::utils::summary::{create_collection_summary, CollectionStats};

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.verbose)?;

    // Handle subcommands
    if let Some(cmd) = &args.command {
        return handle_subcommand(cmd);
    }

    info!("Starting insights archive collection");

    // Load and process the plan
    let plan = load_and_process_plan(&args)?;

    // Stage everything the plan names
    let mut builder = create_builder(&plan)?;
    let stats = stage_plan(&mut builder, &plan)?;

    // Write collection summary
    write_collection_summary(&builder, &stats)?;

    // Package
    let archive = builder.package(plan.full_archive)?;
    info!("Archive: {} ({} bytes)", archive.path.display(), archive.size);
    if let Some(hash) = &archive.sha256 {
        info!("SHA-256: {}", hash);
    }

    // Deliver
    deliver_archive(&mut builder, &archive, &args)?;

    info!("Collection completed successfully");
    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

/// Handle subcommands (init-plan)
fn handle_subcommand(cmd: &Commands) -> Result<()> {
    match cmd {
        Commands::InitPlan { path } => {
            info!("Creating default collection plan at {}", path.display());
            CollectionPlan::default().save_to_yaml_file(path)?;
            info!("Plan created successfully");
            Ok(())
        }
    }
}

/// Load the plan, expand environment variables and apply CLI overrides
fn load_and_process_plan(args: &Args) -> Result<CollectionPlan> {
    let mut plan = load_or_default(args.plan.as_deref())?;
    plan.process_environment_variables();
    args.apply_overrides(&mut plan);
    Ok(plan)
}

fn create_builder(plan: &CollectionPlan) -> Result<ArchiveBuilder> {
    let registry = plan.build_registry()?;
    if !registry.is_empty() {
        info!("Registered processors for: {}", registry.names().join(", "));
    }
    ArchiveBuilder::new(plan.archive_options(), Arc::new(registry))
}

/// Copy files and directories, realize artifacts and write plan metadata
fn stage_plan(builder: &mut ArchiveBuilder, plan: &CollectionPlan) -> Result<CollectionStats> {
    let mut stats = CollectionStats::default();

    for file in &plan.files {
        let report = builder.copy_file(file);
        if report.not_found() {
            warn!("Nothing collected for {}", file);
        }
        stats.record_copy(&report);
    }

    if !plan.directories.is_empty() {
        stats.record_copy(&builder.copy_directories(&plan.directories));
    }

    for spec in &plan.artifacts {
        let artifact = spec.to_artifact();
        let written = builder.add_artifact(&artifact, spec.name());
        stats.record_artifact(written.is_some());
    }

    for entry in &plan.metadata {
        builder.add_metadata(&entry.content, &entry.path)?;
    }

    info!(
        "Staged {} files ({} failed, {} skipped) and {} artifacts ({} without output)",
        stats.files_copied,
        stats.files_failed,
        stats.files_skipped,
        stats.artifacts_written,
        stats.artifacts_without_output
    );
    Ok(stats)
}

fn write_collection_summary(builder: &ArchiveBuilder, stats: &CollectionStats) -> Result<PathBuf> {
    let processors: Vec<&str> = builder.processor_output().keys().map(String::as_str).collect();
    let summary_json =
        create_collection_summary(builder.hostname(), builder.archive_name(), stats, &processors)?;

    let summary_path = builder
        .add_metadata(summary_json, COLLECTION_SUMMARY_FILE)
        .context("Failed to write collection summary")?;

    info!("Collection summary written to {}", summary_path.display());
    Ok(summary_path)
}

/// Copy the archive to --output, then drop the staging root unless asked to keep it
fn deliver_archive(builder: &mut ArchiveBuilder, archive: &PackagedArchive, args: &Args) -> Result<()> {
    let output_dir = match &args.output {
        Some(dir) => dir,
        None => {
            info!("Archive left in {}", builder.staging().root().display());
            return Ok(());
        }
    };

    let dest = delivered_path(output_dir, &archive.path)?;
    copy_regular_file(&archive.path, &dest)?;
    info!("Archive copied to {}", dest.display());

    if args.keep_root {
        info!("Keeping staging root {}", builder.staging().root().display());
    } else {
        builder.cleanup_root();
    }
    Ok(())
}

fn delivered_path(output_dir: &Path, archive: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)
        .context(format!("Failed to create output directory {}", output_dir.display()))?;
    let file_name = archive
        .file_name()
        .context(format!("Archive path {} has no file name", archive.display()))?;
    Ok(output_dir.join(file_name))
}
