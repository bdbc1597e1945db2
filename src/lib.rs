//! Unity Style Guard - naming and convention checks for Unity C# scripts
//!
//! Architecture: Clean Architecture - Library interface serves as the application layer
//! - Rules are data loaded from configuration, never hard-coded in the checker
//! - Scanning, checking and formatting are separate, pure stages
//! - The `checkstyle` binary is a thin shell over `StyleValidator`

pub mod analyzer;
pub mod config;
pub mod domain;
pub mod patterns;
pub mod report;
pub mod scanner;

// Re-export main types for convenient access
pub use domain::identifiers::{ConstructKind, Identifier, Visibility};
pub use domain::violations::{
    DiagnosticKind, FileDiagnostic, ScanDiagnostic, Severity, StyleError, StyleResult, ValidationReport,
    ValidationSummary, Violation,
};

pub use config::{ConfigBuilder, Rule, RuleCategory, RuleDefinition, RuleRegistry, StyleConfig};

pub use analyzer::{AnalysisOptions, Analyzer, ConformanceChecker, FileOutcome, RuleStats};

pub use report::{OutputFormat, ReportFormatter, ReportOptions};

pub use scanner::{ScannerOptions, SourceScanner};

use std::path::Path;

/// Main validator providing high-level validation operations
pub struct StyleValidator {
    analyzer: Analyzer,
    report_formatter: ReportFormatter,
}

impl StyleValidator {
    /// Create a new validator with the given configuration
    pub fn new_with_config(config: StyleConfig) -> StyleResult<Self> {
        Ok(Self { analyzer: Analyzer::new(config)?, report_formatter: ReportFormatter::default() })
    }

    /// Create a validator with the built-in rule set
    pub fn with_defaults() -> StyleResult<Self> {
        Self::new_with_config(StyleConfig::default())
    }

    /// Create a validator loading configuration from file
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> StyleResult<Self> {
        Self::new_with_config(StyleConfig::load_from_file(path)?)
    }

    /// Set custom report formatter
    pub fn with_report_formatter(mut self, formatter: ReportFormatter) -> Self {
        self.report_formatter = formatter;
        self
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Validate files and directories
    pub fn validate_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
    ) -> StyleResult<ValidationReport> {
        self.analyzer.analyze_paths(paths, options)
    }

    /// Validate a single file
    pub fn validate_file<P: AsRef<Path>>(&self, file_path: P) -> StyleResult<ValidationReport> {
        let outcome = self.analyzer.analyze_file(file_path)?;
        Ok(self.single_file_report(outcome))
    }

    /// Validate in-memory source text, reported under `file_path`
    pub fn validate_source<P: AsRef<Path>>(&self, file_path: P, content: &str) -> ValidationReport {
        let outcome = self.analyzer.analyze_source(file_path.as_ref(), content);
        self.single_file_report(outcome)
    }

    /// Validate entire directory tree
    pub fn validate_directory<P: AsRef<Path>>(
        &self,
        root: P,
        options: &AnalysisOptions,
    ) -> StyleResult<ValidationReport> {
        self.analyzer.analyze_directory(root, options)
    }

    /// Format a validation report for output
    pub fn format_report(&self, report: &ValidationReport, format: OutputFormat) -> StyleResult<String> {
        self.report_formatter.format(report, format)
    }

    pub fn rule_statistics(&self) -> RuleStats {
        self.analyzer.rule_stats()
    }

    fn single_file_report(&self, outcome: FileOutcome) -> ValidationReport {
        let mut report = ValidationReport::new();
        for violation in outcome.violations {
            report.add_violation(violation);
        }
        for diagnostic in outcome.diagnostics {
            report.add_diagnostic(diagnostic);
        }
        report.set_files_analyzed(1);
        report.set_config_fingerprint(self.analyzer.config_fingerprint());
        report
    }
}

/// Convenience function to create a validator with default settings
pub fn create_validator() -> StyleResult<StyleValidator> {
    StyleValidator::with_defaults()
}

/// Check files and directories with the built-in rule set
pub fn validate_paths<P: AsRef<Path>>(paths: &[P]) -> StyleResult<ValidationReport> {
    StyleValidator::with_defaults()?.validate_paths(paths, &AnalysisOptions::default())
}

/// Check one source text with the built-in rule set
pub fn validate_source(file_name: &str, content: &str) -> StyleResult<ValidationReport> {
    Ok(StyleValidator::with_defaults()?.validate_source(file_name, content))
}
