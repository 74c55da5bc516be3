use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CollectionPlan;
use crate::constants::DEFAULT_PLAN_NAME;

/// Command-line arguments for the insights-archive tool.
///
/// Anything given here overrides the matching field of the collection plan.
#[derive(Parser, Debug)]
#[clap(
    name = "insights-archive",
    about = "Stage diagnostic data and package it into a compressed tar archive"
)]
pub struct Args {
    /// Path to collection plan YAML file (default: built-in plan)
    #[clap(short = 'c', long)]
    pub plan: Option<PathBuf>,

    /// Compression to apply: gz, xz, bz2 or none (unknown values fall back to gz)
    #[clap(long)]
    pub compressor: Option<String>,

    /// Host name used in the archive name instead of the local hostname
    #[clap(long)]
    pub target_name: Option<String>,

    /// Directory the staging root is created under
    #[clap(long)]
    pub temp_base: Option<PathBuf>,

    /// Package the whole staging root instead of only the archive directory
    #[clap(long)]
    pub full_archive: bool,

    /// Directory the packaged archive is copied to (default: leave it in the staging root)
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Keep the staging root after copying the archive to --output
    #[clap(long)]
    pub keep_root: bool,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

impl Args {
    /// Overlay the command-line settings on a loaded plan.
    pub fn apply_overrides(&self, plan: &mut CollectionPlan) {
        if let Some(compressor) = &self.compressor {
            plan.compressor = compressor.clone();
        }
        if let Some(target_name) = &self.target_name {
            plan.target_name = Some(target_name.clone());
        }
        if let Some(temp_base) = &self.temp_base {
            plan.temp_base = temp_base.clone();
        }
        if self.full_archive {
            plan.full_archive = true;
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default collection plan to a file
    InitPlan {
        /// Path to output plan file
        #[clap(default_value = DEFAULT_PLAN_NAME)]
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_default_values() {
        let args = Args::parse_from(["insights-archive"]);

        assert!(args.plan.is_none());
        assert!(args.compressor.is_none());
        assert!(args.target_name.is_none());
        assert!(args.temp_base.is_none());
        assert!(args.output.is_none());
        assert!(!args.full_archive);
        assert!(!args.keep_root);
        assert!(!args.verbose);
        assert!(args.command.is_none());
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "insights-archive",
            "--plan", "/etc/insights/plan.yaml",
            "--compressor", "xz",
            "--target-name", "db01",
            "--temp-base", "/tmp/stage",
            "--full-archive",
            "--output", "/var/spool/insights",
            "--keep-root",
            "-v",
        ]);

        assert_eq!(args.plan, Some(PathBuf::from("/etc/insights/plan.yaml")));
        assert_eq!(args.compressor.as_deref(), Some("xz"));
        assert_eq!(args.target_name.as_deref(), Some("db01"));
        assert_eq!(args.temp_base, Some(PathBuf::from("/tmp/stage")));
        assert!(args.full_archive);
        assert_eq!(args.output, Some(PathBuf::from("/var/spool/insights")));
        assert!(args.keep_root);
        assert!(args.verbose);
    }

    #[test]
    fn test_unknown_compressor_is_accepted() {
        let args = Args::parse_from(["insights-archive", "--compressor", "zstd"]);
        assert_eq!(args.compressor.as_deref(), Some("zstd"));
    }

    #[test]
    fn test_apply_overrides() {
        let mut plan = CollectionPlan::default();
        Args::parse_from(["insights-archive"]).apply_overrides(&mut plan);
        assert_eq!(plan, CollectionPlan::default());

        let args = Args::parse_from([
            "insights-archive",
            "--compressor", "bz2",
            "--target-name", "db01",
            "--full-archive",
        ]);
        args.apply_overrides(&mut plan);

        assert_eq!(plan.compressor, "bz2");
        assert_eq!(plan.target_name.as_deref(), Some("db01"));
        assert!(plan.full_archive);
        assert_eq!(plan.temp_base, CollectionPlan::default().temp_base);
    }

    #[test]
    fn test_init_plan_subcommand() {
        let args = Args::parse_from(["insights-archive", "init-plan", "custom.yaml"]);
        match args.command {
            Some(Commands::InitPlan { path }) => assert_eq!(path, PathBuf::from("custom.yaml")),
            _ => panic!("Expected InitPlan command"),
        }

        let args = Args::parse_from(["insights-archive", "init-plan"]);
        match args.command {
            Some(Commands::InitPlan { path }) => assert_eq!(path, PathBuf::from(DEFAULT_PLAN_NAME)),
            _ => panic!("Expected InitPlan command"),
        }
    }
}
