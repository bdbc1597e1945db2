//! Core domain models for style violations, scan diagnostics and validation results
//!
//! Architecture: Rich Domain Models - Violations are entities with behavior, not just data
//! - A violation knows the rule it broke, what was expected and what was found
//! - Scan diagnostics record recovered problems so nothing is silently dropped
//! - ValidationReport acts as an aggregate root managing both collections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Severity levels for style violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suggestions that are reported but rarely worth blocking on
    Info,
    /// Convention breaks that should be fixed
    Warning,
    /// Convention breaks the project treats as hard failures
    Error,
}

impl Severity {
    /// Whether this severity level should cause validation to fail
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Error)
    }

    /// Convert to string for display
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected mismatch between source text and an applicable rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Identifier of the rule that was broken
    pub rule_id: String,
    /// Severity level of this violation
    pub severity: Severity,
    /// File path where the violation was found
    pub file_path: PathBuf,
    /// Line number (1-indexed) where the violation occurs
    pub line_number: Option<u32>,
    /// Column number (1-indexed) where the offending construct starts
    pub column_number: Option<u32>,
    /// Description of the pattern the construct should have matched
    pub expected_pattern: String,
    /// The construct text as found in the source
    pub actual_text: String,
    /// Human-readable description of the rule
    pub message: String,
    /// Trimmed source line containing the construct
    pub context: Option<String>,
    /// Suggested replacement (if one can be derived)
    pub suggested_fix: Option<String>,
    /// When this violation was detected
    pub detected_at: DateTime<Utc>,
}

impl Violation {
    /// Create a new violation
    pub fn new(
        rule_id: impl Into<String>,
        severity: Severity,
        file_path: PathBuf,
        expected_pattern: impl Into<String>,
        actual_text: impl Into<String>,
    ) -> Self {
        let expected_pattern = expected_pattern.into();
        let actual_text = actual_text.into();
        let message = format!("expected {expected_pattern}, found {actual_text}");

        Self {
            rule_id: rule_id.into(),
            severity,
            file_path,
            line_number: None,
            column_number: None,
            expected_pattern,
            actual_text,
            message,
            context: None,
            suggested_fix: None,
            detected_at: Utc::now(),
        }
    }

    /// Set line and column position
    pub fn with_position(mut self, line: u32, column: u32) -> Self {
        self.line_number = Some(line);
        self.column_number = Some(column);
        self
    }

    /// Replace the default message with the rule's description
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source code context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add a suggested fix
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggested_fix = Some(suggestion.into());
        self
    }

    /// Whether this violation is blocking
    pub fn is_blocking(&self) -> bool {
        self.severity.is_blocking()
    }

    /// One-line rendering: `<file>:<line>: <ruleId> expected <pattern>, found <actualText>`
    pub fn format_line(&self) -> String {
        format!(
            "{}:{}: {} expected {}, found {}",
            self.file_path.display(),
            self.line_number.unwrap_or(0),
            self.rule_id,
            self.expected_pattern,
            self.actual_text
        )
    }

    /// Format violation for display with severity and message
    pub fn format_display(&self) -> String {
        let location = match (self.line_number, self.column_number) {
            (Some(line), Some(col)) => format!(":{line}:{col}"),
            (Some(line), None) => format!(":{line}"),
            _ => String::new(),
        };

        format!(
            "{}{} [{}] {}: {}",
            self.file_path.display(),
            location,
            self.severity.as_str(),
            self.rule_id,
            self.message
        )
    }
}

/// A recovered problem found while scanning source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanDiagnostic {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl ScanDiagnostic {
    pub fn new(line: u32, column: u32, message: impl Into<String>) -> Self {
        Self { line, column, message: message.into() }
    }
}

/// Where a file-level diagnostic came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Unparseable fragment that the scanner skipped
    ScanError,
    /// File could not be read
    IoError,
}

impl DiagnosticKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ScanError => "scan-error",
            Self::IoError => "io-error",
        }
    }
}

/// A diagnostic attached to the file it was produced for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiagnostic {
    pub kind: DiagnosticKind,
    pub file_path: PathBuf,
    pub line_number: Option<u32>,
    pub column_number: Option<u32>,
    pub message: String,
}

impl FileDiagnostic {
    /// Attach a scanner diagnostic to a file
    pub fn scan(file_path: PathBuf, diagnostic: ScanDiagnostic) -> Self {
        Self {
            kind: DiagnosticKind::ScanError,
            file_path,
            line_number: Some(diagnostic.line),
            column_number: Some(diagnostic.column),
            message: diagnostic.message,
        }
    }

    /// Record a file that could not be read
    pub fn io(file_path: PathBuf, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::IoError,
            file_path,
            line_number: None,
            column_number: None,
            message: message.into(),
        }
    }

    /// One-line rendering: `<file>:<line>: scan-error: <message>`
    pub fn format_line(&self) -> String {
        format!(
            "{}:{}: {}: {}",
            self.file_path.display(),
            self.line_number.unwrap_or(0),
            self.kind.as_str(),
            self.message
        )
    }
}

/// Summary statistics for a validation report
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Total number of files analyzed
    pub total_files: usize,
    /// Number of violations by severity level
    pub violations_by_severity: ViolationCounts,
    /// Number of recovered diagnostics
    pub diagnostics: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
    /// Timestamp when validation was performed
    pub validated_at: DateTime<Utc>,
}

/// Count of violations by severity level
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViolationCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl ViolationCounts {
    /// Total number of violations across all severities
    pub fn total(&self) -> usize {
        self.error + self.warning + self.info
    }

    /// Whether there are any blocking violations
    pub fn has_blocking(&self) -> bool {
        self.error > 0
    }

    /// Add a violation to the counts
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Error => self.error += 1,
            Severity::Warning => self.warning += 1,
            Severity::Info => self.info += 1,
        }
    }
}

/// Complete validation report containing violations, diagnostics and metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// All violations found during validation
    pub violations: Vec<Violation>,
    /// Recovered scan and I/O problems
    pub diagnostics: Vec<FileDiagnostic>,
    /// Summary statistics
    pub summary: ValidationSummary,
    /// Configuration used for this validation
    pub config_fingerprint: Option<String>,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self {
            violations: Vec::new(),
            diagnostics: Vec::new(),
            summary: ValidationSummary { validated_at: Utc::now(), ..Default::default() },
            config_fingerprint: None,
        }
    }

    /// Add a violation to the report
    pub fn add_violation(&mut self, violation: Violation) {
        self.summary.violations_by_severity.add(violation.severity);
        self.violations.push(violation);
    }

    /// Add a diagnostic to the report
    pub fn add_diagnostic(&mut self, diagnostic: FileDiagnostic) {
        self.summary.diagnostics += 1;
        self.diagnostics.push(diagnostic);
    }

    /// Whether the report contains any violations
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Whether the report contains blocking violations (errors)
    pub fn has_errors(&self) -> bool {
        self.summary.violations_by_severity.has_blocking()
    }

    /// Whether any scan or I/O diagnostics were recorded
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Get violations of a specific severity
    pub fn violations_by_severity(&self, severity: Severity) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.severity == severity)
    }

    /// Get violations for a specific rule
    pub fn violations_for_rule<'a>(&'a self, rule_id: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.violations.iter().filter(move |v| v.rule_id == rule_id)
    }

    /// Set the number of files analyzed
    pub fn set_files_analyzed(&mut self, count: usize) {
        self.summary.total_files = count;
    }

    /// Set the execution time
    pub fn set_execution_time(&mut self, duration_ms: u64) {
        self.summary.execution_time_ms = duration_ms;
    }

    /// Set the configuration fingerprint
    pub fn set_config_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.config_fingerprint = Some(fingerprint.into());
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: ValidationReport) {
        for violation in other.violations {
            self.add_violation(violation);
        }
        for diagnostic in other.diagnostics {
            self.add_diagnostic(diagnostic);
        }
        self.summary.total_files += other.summary.total_files;
    }

    /// Order by file path, keeping source order within each file
    pub fn sort_violations(&mut self) {
        self.violations.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        self.diagnostics.sort_by(|a, b| a.file_path.cmp(&b.file_path));
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Error types that can occur during validation
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    /// Rule set could not be loaded, parsed or validated
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// File could not be read or accessed
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// Pattern compilation failed
    #[error("Pattern error: {message}")]
    Pattern { message: String },

    /// Source fragment could not be scanned
    #[error("Scan error at line {line}: {message}")]
    Scan { line: u32, message: String },

    /// Analysis failed for a specific file
    #[error("Analysis error in {file}: {message}")]
    Analysis { file: String, message: String },

    /// Report could not be produced
    #[error("Report error: {message}")]
    Report { message: String },
}

impl StyleError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Create a pattern error
    pub fn pattern(message: impl Into<String>) -> Self {
        Self::Pattern { message: message.into() }
    }

    /// Create a scan error
    pub fn scan(line: u32, message: impl Into<String>) -> Self {
        Self::Scan { line, message: message.into() }
    }

    /// Create an analysis error
    pub fn analysis(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analysis { file: file.into(), message: message.into() }
    }

    /// Create a report error
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report { message: message.into() }
    }

    /// Whether this error must stop the run before any file is checked
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Pattern { .. })
    }
}

impl From<ScanDiagnostic> for StyleError {
    fn from(diagnostic: ScanDiagnostic) -> Self {
        Self::scan(diagnostic.line, diagnostic.message)
    }
}

/// Result type for style checking operations
pub type StyleResult<T> = Result<T, StyleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_violation_creation() {
        let violation = Violation::new(
            "private-field-naming",
            Severity::Warning,
            PathBuf::from("Assets/Player.cs"),
            "_camelCase",
            "health",
        );

        assert_eq!(violation.rule_id, "private-field-naming");
        assert_eq!(violation.file_path, Path::new("Assets/Player.cs"));
        assert_eq!(violation.message, "expected _camelCase, found health");
        assert!(!violation.is_blocking());
    }

    #[test]
    fn test_violation_line_format() {
        let violation = Violation::new(
            "constant-naming",
            Severity::Error,
            PathBuf::from("Player.cs"),
            "UPPER_SNAKE_CASE",
            "MAXHEALTH",
        )
        .with_position(7, 23)
        .with_context("private const int MAXHEALTH = 100;");

        assert_eq!(
            violation.format_line(),
            "Player.cs:7: constant-naming expected UPPER_SNAKE_CASE, found MAXHEALTH"
        );
        assert_eq!(violation.column_number, Some(23));
        assert!(violation.is_blocking());
    }

    #[test]
    fn test_validation_report() {
        let mut report = ValidationReport::new();

        report.add_violation(Violation::new(
            "rule1",
            Severity::Error,
            PathBuf::from("B.cs"),
            "PascalCase",
            "foo",
        ));
        report.add_violation(Violation::new(
            "rule2",
            Severity::Warning,
            PathBuf::from("A.cs"),
            "camelCase",
            "Bar",
        ));
        report.add_diagnostic(FileDiagnostic::scan(
            PathBuf::from("A.cs"),
            ScanDiagnostic::new(3, 9, "unterminated string literal"),
        ));

        assert!(report.has_violations());
        assert!(report.has_errors());
        assert!(report.has_diagnostics());
        assert_eq!(report.summary.violations_by_severity.total(), 2);
        assert_eq!(report.summary.diagnostics, 1);

        report.sort_violations();
        assert_eq!(report.violations[0].rule_id, "rule2");
    }

    #[test]
    fn test_sort_keeps_source_order_within_file() {
        let mut report = ValidationReport::new();
        for (rule, line) in [("late", 9), ("early", 2)] {
            report.add_violation(
                Violation::new(rule, Severity::Info, PathBuf::from("A.cs"), "x", "y")
                    .with_position(line, 1),
            );
        }

        report.sort_violations();
        let rules: Vec<_> = report.violations.iter().map(|v| v.rule_id.as_str()).collect();
        assert_eq!(rules, vec!["late", "early"]);
    }

    #[test]
    fn test_diagnostic_line_format() {
        let diagnostic = FileDiagnostic::scan(
            PathBuf::from("Enemy.cs"),
            ScanDiagnostic::new(12, 4, "unmatched `}`"),
        );
        assert_eq!(diagnostic.format_line(), "Enemy.cs:12: scan-error: unmatched `}`");
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
        assert!(Severity::Error.is_blocking());
        assert!(!Severity::Warning.is_blocking());
    }

    #[test]
    fn test_error_classification() {
        assert!(StyleError::config("bad").is_fatal());
        assert!(!StyleError::scan(1, "bad").is_fatal());
        let err: StyleError = ScanDiagnostic::new(4, 1, "oops").into();
        assert_eq!(err.to_string(), "Scan error at line 4: oops");
    }
}
