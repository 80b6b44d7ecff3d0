//! Display formatting for CLI output
//!
//! Provides:
//! - Progress messages on stderr, so stdout stays clean for YAML output
//! - Structural violations grouped by file and CRD version

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use console::style;
use crdkit_core::{CompletionReport, FieldError, StatusSource};

/// Progress reporter writing to stderr
pub struct ProgressReporter {
    start_time: Instant,
    verbose: bool,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            verbose: false,
        }
    }

    /// Create with verbose output
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Print a step header
    pub fn step(&self, msg: &str) {
        let _ = writeln!(io::stderr(), "{} {}", style("→").blue(), msg);
    }

    /// Print an informational message
    pub fn info(&self, msg: &str) {
        let _ = writeln!(io::stderr(), "  {} {}", style("ℹ").blue(), msg);
    }

    /// Print a warning message
    pub fn warn(&self, msg: &str) {
        let _ = writeln!(io::stderr(), "  {} {}", style("⚠").yellow(), msg);
    }

    /// Print success message
    pub fn success(&self, msg: &str) {
        let _ = writeln!(io::stderr(), "  {} {}", style("✓").green(), msg);
    }

    /// Report the outcome of completing one CRD
    pub fn completion(&self, report: &CompletionReport) {
        self.success(&format!(
            "{} ({} {})",
            style(&report.crd).bold(),
            report.versions.len(),
            pluralize(report.versions.len(), "version", "versions")
        ));

        for version in &report.versions {
            if self.verbose {
                let status = match version.status {
                    Some(StatusSource::Supplied) => "status schema",
                    Some(StatusSource::Placeholder) => "status placeholder",
                    None => "no status",
                };
                self.info(&format!(
                    "{}: {} marked {}, {}",
                    version.name,
                    version.marked_paths.len(),
                    pluralize(version.marked_paths.len(), "path", "paths"),
                    status
                ));
            }

            for path in &version.unmatched_paths {
                self.warn(&format!(
                    "{}: path '{}' matched no schema node",
                    version.name, path
                ));
            }
        }
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// A structural violation with its location
#[derive(Debug, Clone)]
pub struct Violation {
    pub file: String,
    pub crd: String,
    pub version: String,
    pub error: FieldError,
}

/// Structural violations collected by `check`, grouped for display
#[derive(Debug, Default)]
pub struct CheckReport {
    pub violations: Vec<Violation>,
    pub checked_versions: usize,
}

impl CheckReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a version that passed or failed
    pub fn add_version(
        &mut self,
        file: &str,
        crd: &str,
        version: &str,
        errors: impl IntoIterator<Item = FieldError>,
    ) {
        self.checked_versions += 1;
        self.violations.extend(errors.into_iter().map(|error| Violation {
            file: file.to_string(),
            crd: crd.to_string(),
            version: version.to_string(),
            error,
        }));
    }

    /// Number of versions with at least one violation
    pub fn failed_versions(&self) -> usize {
        let mut versions: Vec<_> = self
            .violations
            .iter()
            .map(|v| (&v.file, &v.crd, &v.version))
            .collect();
        versions.dedup();
        versions.len()
    }

    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Display violations grouped by file, then CRD version
    pub fn display(&self) {
        let mut by_file: BTreeMap<&str, BTreeMap<(&str, &str), Vec<&FieldError>>> =
            BTreeMap::new();
        for violation in &self.violations {
            by_file
                .entry(&violation.file)
                .or_default()
                .entry((&violation.crd, &violation.version))
                .or_default()
                .push(&violation.error);
        }

        for (file, versions) in by_file {
            println!();
            println!("{}", style(file).cyan().bold());

            for ((crd, version), errors) in versions {
                println!(
                    "  {} {} {} ({} {})",
                    style("→").blue(),
                    style(crd).yellow(),
                    version,
                    errors.len(),
                    pluralize(errors.len(), "violation", "violations")
                );
                for error in errors {
                    println!("    {} {}", style("✗").red(), error);
                }
            }
        }
    }

    /// Print summary line
    pub fn print_summary(&self) {
        if self.has_violations() {
            println!(
                "{} {} {} in {} of {} {}",
                style("✗").red().bold(),
                self.violations.len(),
                pluralize(self.violations.len(), "violation", "violations"),
                self.failed_versions(),
                self.checked_versions,
                pluralize(self.checked_versions, "version", "versions")
            );
        } else {
            println!(
                "{} {} {} structural",
                style("✓").green().bold(),
                self.checked_versions,
                pluralize(self.checked_versions, "version", "versions")
            );
        }
    }
}

/// Pluralize a word based on count
pub fn pluralize<'a>(count: usize, singular: &'a str, plural: &'a str) -> &'a str {
    if count == 1 { singular } else { plural }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crdkit_core::{ErrorKind, SchemaPath};

    fn forbidden(path: &str) -> FieldError {
        FieldError {
            path: SchemaPath::root().child(path),
            kind: ErrorKind::Forbidden,
            detail: "must be empty to be structural".to_string(),
        }
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize(1, "version", "versions"), "version");
        assert_eq!(pluralize(0, "version", "versions"), "versions");
        assert_eq!(pluralize(2, "version", "versions"), "versions");
    }

    #[test]
    fn test_check_report_counts() {
        let mut report = CheckReport::new();
        report.add_version("a.yaml", "widgets.example.com", "v1", Vec::new());
        report.add_version(
            "a.yaml",
            "widgets.example.com",
            "v2",
            vec![forbidden("type"), forbidden("default")],
        );
        report.add_version("b.yaml", "gadgets.example.com", "v1", vec![forbidden("type")]);

        assert!(report.has_violations());
        assert_eq!(report.checked_versions, 3);
        assert_eq!(report.violations.len(), 3);
        assert_eq!(report.failed_versions(), 2);
    }

    #[test]
    fn test_empty_report() {
        let mut report = CheckReport::new();
        report.add_version("a.yaml", "widgets.example.com", "v1", Vec::new());
        assert!(!report.has_violations());
        assert_eq!(report.failed_versions(), 0);
    }
}
