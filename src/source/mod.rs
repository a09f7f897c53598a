//! # Source Module
//!
//! @title Source Unit Providers
//! @author Ramprasad
//!
//! Supplies the `(path, content)` pairs the engine scans. The engine only
//! consumes [`SourceUnit`]s; reading and decoding files is the provider's job.
//!
//! ## Providers
//!
//! - [`MemoryProvider`] - In-memory units, used by tests and embedders
//! - [`FsProvider`] - Filtered filesystem enumerator built on `walkdir`

use crate::error::UnreadableUnit;
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A decoded text file, split into lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Path of the unit, normalized to forward slashes.
    pub path: String,

    /// Ordered lines without their terminators.
    pub lines: Vec<String>,
}

impl SourceUnit {
    /// Creates a unit from a path and its decoded content.
    pub fn new(path: impl AsRef<str>, content: &str) -> Self {
        Self {
            path: normalize_path(path.as_ref()),
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// Retrieves a specific line (1-indexed).
    pub fn line(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|i| self.lines.get(i))
            .map(String::as_str)
    }
}

/// Result of asking a provider for one unit.
pub type SourceResult = Result<SourceUnit, UnreadableUnit>;

/// A lazy, finite, restartable sequence of source units.
///
/// Each call to [`SourceProvider::units`] starts a fresh pass over the same
/// set of files.
pub trait SourceProvider {
    fn units(&self) -> Box<dyn Iterator<Item = SourceResult> + '_>;
}

/// Provider over `(path, content)` pairs held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    entries: Vec<(String, String)>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a unit, builder style.
    pub fn with(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.entries.push((path.into(), content.into()));
        self
    }
}

impl<P: Into<String>, C: Into<String>> FromIterator<(P, C)> for MemoryProvider {
    fn from_iter<I: IntoIterator<Item = (P, C)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(p, c)| (p.into(), c.into()))
                .collect(),
        }
    }
}

impl SourceProvider for MemoryProvider {
    fn units(&self) -> Box<dyn Iterator<Item = SourceResult> + '_> {
        Box::new(
            self.entries
                .iter()
                .map(|(path, content)| Ok(SourceUnit::new(path, content))),
        )
    }
}

/// Default glob patterns of files worth scanning.
pub const DEFAULT_INCLUDE: &[&str] = &["**/*.py", "**/*.html"];

/// Default directory names never descended into.
pub const DEFAULT_SKIP_DIRS: &[&str] = &["venv", ".venv", "__pycache__", ".git", "node_modules"];

/// Filesystem provider enumerating files under a root directory.
///
/// Files are included when their path relative to the root matches one of
/// the include globs. Directories named in `skip_dirs` are pruned. Reported
/// paths are relative to the root.
#[derive(Debug, Clone)]
pub struct FsProvider {
    root: PathBuf,
    include: Vec<Pattern>,
    skip_dirs: Vec<String>,
}

impl FsProvider {
    /// Creates a provider with the default include globs and skipped dirs.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include: DEFAULT_INCLUDE
                .iter()
                .filter_map(|g| Pattern::new(g).ok())
                .collect(),
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Replaces the include globs.
    pub fn with_include(mut self, globs: &[String]) -> Result<Self, glob::PatternError> {
        self.include = globs
            .iter()
            .map(|g| Pattern::new(g))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self)
    }

    /// Replaces the skipped directory names.
    pub fn with_skip_dirs(mut self, dirs: &[String]) -> Self {
        self.skip_dirs = dirs.to_vec();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lists matching file paths without reading them.
    ///
    /// Entries the walk cannot read (an unreadable directory, a vanished
    /// file) come back as [`UnreadableUnit`]s so they are reported as skipped
    /// instead of silently dropped. Results are sorted by path.
    pub fn files(&self) -> Vec<Result<PathBuf, UnreadableUnit>> {
        if self.root.is_file() {
            return vec![Ok(self.root.clone())];
        }

        let mut files: Vec<Result<PathBuf, UnreadableUnit>> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !self
                        .skip_dirs
                        .iter()
                        .any(|d| e.file_name().to_string_lossy() == d.as_str())
            })
            .filter_map(|entry| match entry {
                Ok(e) if e.file_type().is_file() && self.is_included(&self.relative(e.path())) => {
                    Some(Ok(e.path().to_path_buf()))
                }
                Ok(_) => None,
                Err(err) => Some(Err(self.walk_error(&err))),
            })
            .collect();

        files.sort_by_cached_key(|entry| self.sort_path(entry));
        files
    }

    fn walk_error(&self, err: &walkdir::Error) -> UnreadableUnit {
        let path = err.path().unwrap_or(self.root.as_path());
        let mut relative = self.relative(path);
        if relative.is_empty() {
            relative = normalize_path(&path.to_string_lossy());
        }
        log::debug!("Walk error at {}: {}", relative, err);
        UnreadableUnit::new(&relative, err.to_string())
    }

    fn sort_path(&self, entry: &Result<PathBuf, UnreadableUnit>) -> String {
        match entry {
            Ok(path) => self.relative(path),
            Err(e) => e.path.clone(),
        }
    }

    /// Reads and decodes a single file.
    pub fn read(&self, path: &Path) -> SourceResult {
        let relative = self.relative(path);
        let bytes = std::fs::read(path).map_err(|e| UnreadableUnit::new(&relative, e.to_string()))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| UnreadableUnit::new(&relative, format!("not valid UTF-8: {}", e)))?;
        Ok(SourceUnit::new(&relative, &content))
    }

    fn relative(&self, path: &Path) -> String {
        let base = if self.root.is_file() {
            self.root.parent().unwrap_or(Path::new(""))
        } else {
            self.root.as_path()
        };
        let relative = pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf());
        normalize_path(&relative.to_string_lossy())
    }

    fn is_included(&self, relative: &str) -> bool {
        let options = MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };
        self.include
            .iter()
            .any(|p| p.matches_with(relative, options))
    }
}

impl SourceProvider for FsProvider {
    fn units(&self) -> Box<dyn Iterator<Item = SourceResult> + '_> {
        Box::new(
            self.files()
                .into_iter()
                .map(move |entry| entry.and_then(|path| self.read(&path))),
        )
    }
}

fn normalize_path(path: &str) -> String {
    let path = path.replace('\\', "/");
    path.strip_prefix("./").map(str::to_string).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_lines_are_one_indexed() {
        let unit = SourceUnit::new("a.py", "first\nsecond\n");
        assert_eq!(unit.line(1), Some("first"));
        assert_eq!(unit.line(2), Some("second"));
        assert_eq!(unit.line(0), None);
        assert_eq!(unit.line(3), None);
    }

    #[test]
    fn test_paths_are_normalized() {
        assert_eq!(SourceUnit::new("./app\\models.py", "").path, "app/models.py");
    }

    #[test]
    fn test_memory_provider_is_restartable() {
        let provider = MemoryProvider::new().with("a.py", "x").with("b.py", "y");
        assert_eq!(provider.units().count(), 2);
        assert_eq!(provider.units().count(), 2);
    }

    #[test]
    fn test_fs_provider_filters_and_skips() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("app/migrations")).unwrap();
        std::fs::create_dir_all(root.join(".venv/lib")).unwrap();
        std::fs::write(root.join("app/models.py"), "x = 1\n").unwrap();
        std::fs::write(root.join("app/migrations/0001_initial.py"), "y = 2\n").unwrap();
        std::fs::write(root.join("app/notes.txt"), "ignored").unwrap();
        std::fs::write(root.join(".venv/lib/pytz.py"), "import pytz\n").unwrap();
        std::fs::write(root.join("app/binary.py"), [0xff, 0xfe, 0x00]).unwrap();

        let provider = FsProvider::new(root);
        let results: Vec<_> = provider.units().collect();

        let ok: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|u| u.path.clone())
            .collect();
        assert_eq!(ok, vec!["app/migrations/0001_initial.py", "app/models.py"]);

        let skipped: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].path, "app/binary.py");
        assert_eq!(provider.root(), root);
    }

    #[test]
    fn test_missing_root_is_reported_not_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FsProvider::new(dir.path().join("missing"));

        let results: Vec<_> = provider.units().collect();
        assert_eq!(results.len(), 1);
        let err = results[0].as_ref().unwrap_err();
        assert!(err.path.ends_with("missing"), "path was {}", err.path);
        assert!(!err.reason.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("app")).unwrap();
        std::fs::create_dir_all(root.join("locked")).unwrap();
        std::fs::write(root.join("app/a.py"), "x = 1\n").unwrap();
        std::fs::write(root.join("locked/b.py"), "y = 2\n").unwrap();
        std::fs::set_permissions(root.join("locked"), std::fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not bind a privileged user.
        let privileged = std::fs::read_dir(root.join("locked")).is_ok();
        let results: Vec<_> = FsProvider::new(root).units().collect();
        std::fs::set_permissions(root.join("locked"), std::fs::Permissions::from_mode(0o755)).unwrap();
        if privileged {
            return;
        }

        let ok: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|u| u.path.clone())
            .collect();
        assert_eq!(ok, vec!["app/a.py"]);
        let skipped: Vec<&str> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(skipped, vec!["locked"]);
    }
}
