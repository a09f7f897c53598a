//! # Upgrade-Sentinel CLI Entry Point
//!
//! @title Upgrade-Sentinel CLI
//! @author Ramprasad
//!
//! This module provides the main entry point for the Upgrade-Sentinel
//! command-line scanner.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::{Path, PathBuf};
use upgrade_sentinel::cli::{Commands, OutputFormat};
use upgrade_sentinel::source::FsProvider;
use upgrade_sentinel::{Cli, DetectorRegistry, ScanConfig, ScanReport, Scanner};

/// ASCII art banner displayed at startup.
const BANNER: &str = r#"
  _   _                           _         ____             _   _            _
 | | | |_ __   __ _ _ __ __ _  __| | ___   / ___|  ___ _ __ | |_(_)_ __   ___| |
 | | | | '_ \ / _` | '__/ _` |/ _` |/ _ \  \___ \ / _ \ '_ \| __| | '_ \ / _ \ |
 | |_| | |_) | (_| | | | (_| | (_| |  __/   ___) |  __/ | | | |_| | | | |  __/ |
  \___/| .__/ \__, |_|  \__,_|\__,_|\___|  |____/ \___|_| |_|\__|_|_| |_|\___|_|
       |_|    |___/
              Deprecated and Removed API Scanner
"#;

/// Application entry point.
///
/// Initializes the logging system, parses command-line arguments, and
/// dispatches to the appropriate command handler.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            path,
            format,
            output,
            config,
            detectors,
            full_coverage,
            exclude,
            only,
        } => {
            let options = ScanArgs {
                format,
                output,
                config,
                detectors,
                full_coverage,
                exclude,
                only,
            };
            let report = run_scan(&path, &options)?;
            if report.gates_ci() {
                std::process::exit(1);
            }
        }
        Commands::List { detectors } => {
            list_detectors(detectors.as_deref())?;
        }
        Commands::Validate { file } => {
            let registry = DetectorRegistry::from_yaml_file(&file)?;
            println!(
                "{} {} ({} detectors)",
                "[+] Valid detector file:".green().bold(),
                file.display().to_string().yellow(),
                registry.len()
            );
        }
        Commands::Version => {
            println!(
                "{} {}",
                "Upgrade-Sentinel version:".green(),
                env!("CARGO_PKG_VERSION").yellow()
            );
        }
        Commands::Init => {
            run_init()?;
        }
    }

    Ok(())
}

/// Options of the `scan` command besides the path.
struct ScanArgs {
    format: OutputFormat,
    output: Option<PathBuf>,
    config: Option<PathBuf>,
    detectors: Option<PathBuf>,
    full_coverage: bool,
    exclude: Vec<String>,
    only: Vec<String>,
}

/// Executes the scan operation.
///
/// 1. Loads the configuration and detector registry
/// 2. Reads every included file under `path`
/// 3. Runs the scan engine
/// 4. Renders the report in the requested format
fn run_scan(path: &Path, args: &ScanArgs) -> Result<ScanReport> {
    use indicatif::{ProgressBar, ProgressStyle};

    let terminal = args.format == OutputFormat::Terminal;
    if terminal {
        println!("{}", BANNER.cyan().bold());
        println!(
            "{} {}",
            "[*] Scanning:".green().bold(),
            path.display().to_string().yellow()
        );
    }

    let config = match &args.config {
        Some(file) => ScanConfig::load(file)?,
        None => ScanConfig::discover(path)?,
    };

    let registry = match &args.detectors {
        Some(file) => DetectorRegistry::from_yaml_file(file)?,
        None => config.registry()?,
    };
    let registry = if args.only.is_empty() && args.exclude.is_empty() {
        registry
    } else {
        registry.filtered(&args.only, &args.exclude)?
    };
    let policy = config.policy()?;

    let provider = FsProvider::new(path)
        .with_include(&config.include)
        .context("invalid include glob in configuration")?
        .with_skip_dirs(&config.skip_dirs);

    let files = provider.files();
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let mut units = Vec::with_capacity(files.len());
    for entry in files {
        let result = entry.and_then(|file_path| {
            pb.set_message(format!(
                "Reading {}",
                file_path.file_name().unwrap_or_default().to_string_lossy()
            ));
            provider.read(&file_path)
        });
        units.push(result);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let report = Scanner::new(&registry)
        .with_policy(policy)
        .with_full_coverage(args.full_coverage || config.full_coverage)
        .scan_results(units);

    match args.format {
        OutputFormat::Json => emit(&report.to_json()?, args.output.as_deref(), "upgrade_report.json")?,
        OutputFormat::Nested => emit(&report.to_nested_yaml()?, args.output.as_deref(), "upgrade_report.yaml")?,
        OutputFormat::Markdown => emit(&report.to_markdown()?, args.output.as_deref(), "upgrade_report.md")?,
        OutputFormat::Github => emit(
            &report.github_annotations().join("\n"),
            args.output.as_deref(),
            "upgrade_report.txt",
        )?,
        OutputFormat::Terminal => {
            report.print_terminal();
            println!("\n{}", "=".repeat(60).cyan());
            report.print_summary();
        }
    }

    Ok(report)
}

/// Prints a rendered report, or writes it into the output directory.
fn emit(content: &str, output: Option<&Path>, file_name: &str) -> Result<()> {
    match output {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            let report_path = dir.join(file_name);
            std::fs::write(&report_path, content)
                .with_context(|| format!("failed to write {}", report_path.display()))?;
            eprintln!(
                "{} {}",
                "[+] Report saved to:".green(),
                report_path.display().to_string().yellow()
            );
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn run_init() -> Result<()> {
    let workflow_dir = PathBuf::from(".github/workflows");
    let workflow_path = workflow_dir.join("upgrade-sentinel.yml");

    if workflow_path.exists() {
        println!(
            "{}",
            "[!] Workflow file already exists: .github/workflows/upgrade-sentinel.yml".yellow()
        );
        return Ok(());
    }

    std::fs::create_dir_all(&workflow_dir)?;

    let workflow_content = r#"name: Upgrade-Sentinel Scan

on:
  pull_request:
    branches: [ "master", "main" ]
  push:
    branches: [ "master", "main" ]

env:
  CARGO_TERM_COLOR: always

jobs:
  upgrade_scan:
    name: Upgrade-Sentinel Scan
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3

      - name: Install Rust
        uses: actions-rs/toolchain@v1
        with:
          toolchain: stable
          override: true

      - name: Install Upgrade-Sentinel
        run: cargo install --git https://github.com/Ramprasad4121/upgrade-sentinel --branch main

      - name: Run Upgrade Scan
        run: upgrade-sentinel scan . --format github
"#;

    std::fs::write(&workflow_path, workflow_content)?;

    println!(
        "{} {}",
        "[+] Generated GitHub Actions workflow:".green().bold(),
        workflow_path.display().to_string().yellow()
    );
    println!("    Triggers on Push/PR to main/master branches.");
    println!("    Fails the build when a Critical finding is reported.");

    Ok(())
}

/// Displays the detectors of a registry.
///
/// Prints IDs, severities, categories and descriptions.
fn list_detectors(detectors: Option<&Path>) -> Result<()> {
    let registry = match detectors {
        Some(file) => DetectorRegistry::from_yaml_file(file)?,
        None => DetectorRegistry::builtin()?,
    };

    println!("{}", "[*] Available Detectors:".green().bold());
    println!("{}", "-".repeat(60).cyan());

    for detector in registry.detectors() {
        let category = match detector.correlation() {
            Some(c) => format!(
                "structural: {} -> {} ({:?})",
                c.anchor, c.evidence, c.scope
            ),
            None => "simple".to_string(),
        };
        println!(
            "  {} {} [{}]",
            detector.id().cyan().bold(),
            detector.severity().colored_label(),
            category.white()
        );
        if !detector.description().is_empty() {
            println!("     {}", detector.description().dimmed());
        }
        println!();
    }

    Ok(())
}
