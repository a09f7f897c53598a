//! # CLI Module
//!
//! @title Command Line Interface
//! @author Ramprasad
//!
//! This module defines the command-line interface for Upgrade-Sentinel using
//! the `clap` derive macros for declarative argument parsing.
//!
//! ## Commands
//!
//! - `scan` - Scan a code tree for deprecated and removed API usage
//! - `list` - Display the detectors of a registry
//! - `validate` - Check a detector file without scanning
//! - `init` - Generate a GitHub Actions workflow
//! - `version` - Show version information

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Upgrade-Sentinel command-line interface.
///
/// A static scanner that finds deprecated and removed API usage, classifies
/// each file by risk tier and recommends an upgrade path.
#[derive(Parser, Debug)]
#[command(name = "upgrade-sentinel")]
#[command(author = "Ramprasad")]
#[command(version)]
#[command(about = "Static scanner for deprecated and removed API usage")]
#[command(long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output formats of the `scan` command.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colorized console output grouped by tier.
    Terminal,
    /// Flat finding records plus summary, as JSON.
    Json,
    /// Findings grouped by tier and file, as YAML.
    Nested,
    /// Human-readable Markdown report.
    Markdown,
    /// GitHub Actions workflow annotations.
    Github,
}

/// Available subcommands for the Upgrade-Sentinel CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a code tree for deprecated and removed API usage.
    ///
    /// Exits with status 1 when any Critical finding is reported.
    Scan {
        /// Path to the file or directory to scan.
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Output format for the report.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Terminal)]
        format: OutputFormat,

        /// Output directory for the report file.
        ///
        /// Writes `upgrade_report.{json,yaml,md,txt}` for the json, nested,
        /// markdown and github formats. If not specified, the report is
        /// printed to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file. Defaults to `upgrade-sentinel.yaml` in PATH.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Detector file, overriding the configuration and the built-in ruleset.
        #[arg(short, long)]
        detectors: Option<PathBuf>,

        /// Include clean files in the report body.
        #[arg(long)]
        full_coverage: bool,

        /// Exclude specific detectors from the scan.
        ///
        /// Comma-separated list of detector IDs to skip.
        /// Example: --exclude cx-oracle,uuid-field
        #[arg(short = 'x', long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Include only specific detectors in the scan.
        ///
        /// Comma-separated list of detector IDs to run.
        /// Example: --only pytz-import,is-dst-param
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
    },

    /// List the detectors of the built-in ruleset or a detector file.
    List {
        /// Detector file to list instead of the built-in ruleset.
        #[arg(short, long)]
        detectors: Option<PathBuf>,
    },

    /// Validate a detector file.
    ///
    /// Reports the first configuration error, or the number of detectors
    /// loaded.
    Validate {
        /// Detector file to check.
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Generate a GitHub Actions workflow for CI integration.
    Init,

    /// Print version information.
    Version,
}
