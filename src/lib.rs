//! # Upgrade-Sentinel Library
//!
//! @title Upgrade-Sentinel - Deprecated API Scanner
//! @author Ramprasad
//!
//! A static source-pattern scanner that locates deprecated and removed API
//! usages across a code tree, classifies every file by risk tier and produces
//! a deterministic report that can gate a CI pipeline.
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions and argument parsing
//! - [`config`] - Scan configuration file
//! - [`detectors`] - Declarative detector registry
//! - [`engine`] - Matching, correlation and the scan pipeline
//! - [`report`] - Aggregation, report assembly and rendering
//! - [`source`] - Source unit providers
//!
//! ## Example
//!
//! ```rust,ignore
//! use upgrade_sentinel::{DetectorRegistry, Scanner};
//! use upgrade_sentinel::source::FsProvider;
//!
//! let registry = DetectorRegistry::builtin()?;
//! let report = Scanner::new(&registry).scan(&FsProvider::new("./project"));
//! println!("{}", report.to_json()?);
//! ```

pub mod cli;
pub mod config;
pub mod detectors;
pub mod engine;
pub mod error;
pub mod report;
pub mod source;

pub use cli::Cli;
pub use config::ScanConfig;
pub use detectors::DetectorRegistry;
pub use engine::{CancelToken, Scanner};
pub use error::{ConfigError, UnreadableUnit};
pub use report::{Finding, ScanReport, Severity, Tier};
