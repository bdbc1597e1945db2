//! Report generation with multiple output formats
//!
//! CDD Principle: Anti-Corruption Layer - Formatters translate domain objects to external formats
//! - ValidationReport (domain) is converted to various external representations
//! - Plain output is the stable, line-oriented contract used by the CLI
//! - Formatting is pure: no I/O happens until `write_report`

use crate::domain::violations::{FileDiagnostic, Severity, StyleError, StyleResult, ValidationReport, Violation};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

/// Supported output formats for validation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One line per violation, then one line per diagnostic
    #[default]
    Plain,
    /// Grouped by file with context, suggestions and a summary
    Human,
    /// JSON format for programmatic consumption
    Json,
    /// JUnit XML format for CI/CD integration
    Junit,
    /// SARIF format for code scanning tools
    Sarif,
    /// GitHub Actions workflow commands
    GitHub,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Human => "human",
            Self::Json => "json",
            Self::Junit => "junit",
            Self::Sarif => "sarif",
            Self::GitHub => "github",
        }
    }

    /// Get all available format names
    pub fn all_formats() -> &'static [&'static str] {
        &["plain", "human", "json", "junit", "sarif", "github"]
    }
}

impl FromStr for OutputFormat {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "junit" => Ok(Self::Junit),
            "sarif" => Ok(Self::Sarif),
            "github" => Ok(Self::GitHub),
            other => Err(StyleError::report(format!(
                "Unknown output format '{}'; expected one of: {}",
                other,
                Self::all_formats().join(", ")
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for customizing report output
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Whether to use colored output (human format only)
    pub use_colors: bool,
    /// Whether to show the offending source line
    pub show_context: bool,
    /// Whether to show suggested renames
    pub show_suggestions: bool,
    /// Maximum number of violations to include
    pub max_violations: Option<usize>,
    /// Minimum severity level to include
    pub min_severity: Option<Severity>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            use_colors: cfg!(feature = "colors"),
            show_context: true,
            show_suggestions: true,
            max_violations: None,
            min_severity: None,
        }
    }
}

/// Main report formatter that dispatches to specific formatters
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    options: ReportOptions,
}

impl ReportFormatter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    /// Render a validation report in the specified format
    pub fn format(&self, report: &ValidationReport, format: OutputFormat) -> StyleResult<String> {
        let violations = self.filter_violations(&report.violations);

        match format {
            OutputFormat::Plain => Ok(self.format_plain(&violations, &report.diagnostics)),
            OutputFormat::Human => Ok(self.format_human(report, &violations)),
            OutputFormat::Json => self.format_json(report, &violations),
            OutputFormat::Junit => Ok(self.format_junit(report, &violations)),
            OutputFormat::Sarif => self.format_sarif(&violations),
            OutputFormat::GitHub => Ok(self.format_github(&violations, &report.diagnostics)),
        }
    }

    /// Write a formatted report to a writer
    pub fn write_report<W: Write>(
        &self,
        report: &ValidationReport,
        format: OutputFormat,
        mut writer: W,
    ) -> StyleResult<()> {
        let formatted = self.format(report, format)?;
        writer.write_all(formatted.as_bytes())?;
        Ok(())
    }

    fn filter_violations<'a>(&self, violations: &'a [Violation]) -> Vec<&'a Violation> {
        let mut filtered: Vec<&Violation> = violations
            .iter()
            .filter(|v| self.options.min_severity.map_or(true, |min| v.severity >= min))
            .collect();

        if let Some(max) = self.options.max_violations {
            filtered.truncate(max);
        }
        filtered
    }

    fn format_plain(&self, violations: &[&Violation], diagnostics: &[FileDiagnostic]) -> String {
        let mut output = String::new();
        for violation in violations {
            output.push_str(&violation.format_line());
            output.push('\n');
        }
        for diagnostic in diagnostics {
            output.push_str(&diagnostic.format_line());
            output.push('\n');
        }
        output
    }

    fn format_human(&self, report: &ValidationReport, violations: &[&Violation]) -> String {
        let mut output = String::new();

        if violations.is_empty() {
            output.push_str(&self.paint("No style violations found", Tone::Success));
            output.push_str("\n\n");
        } else {
            let tone = if report.has_errors() { Tone::Error } else { Tone::Warning };
            output.push_str(&self.paint("Style Violations Found", tone));
            output.push_str("\n\n");

            let mut by_file: BTreeMap<&Path, Vec<&Violation>> = BTreeMap::new();
            for violation in violations {
                by_file.entry(&violation.file_path).or_default().push(violation);
            }

            for (file_path, file_violations) in by_file {
                output.push_str(&self.paint(&file_path.display().to_string(), Tone::Bold));
                output.push('\n');

                for violation in file_violations {
                    let position = match (violation.line_number, violation.column_number) {
                        (Some(line), Some(col)) => format!("{line}:{col}"),
                        (Some(line), None) => line.to_string(),
                        _ => "?".to_string(),
                    };
                    output.push_str(&format!(
                        "  {} [{}] {}: {}\n",
                        self.paint(&position, Tone::Dim),
                        self.paint(violation.severity.as_str(), Tone::from(violation.severity)),
                        violation.rule_id,
                        violation.message
                    ));

                    if self.options.show_context {
                        if let Some(context) = &violation.context {
                            output.push_str(&format!("    {}\n", self.paint(&format!("| {context}"), Tone::Dim)));
                        }
                    }
                    if self.options.show_suggestions {
                        if let Some(suggestion) = &violation.suggested_fix {
                            output.push_str(&format!(
                                "    {}\n",
                                self.paint(&format!("rename to `{suggestion}`"), Tone::Success)
                            ));
                        }
                    }
                }
                output.push('\n');
            }
        }

        if !report.diagnostics.is_empty() {
            output.push_str(&self.paint("Diagnostics", Tone::Warning));
            output.push('\n');
            for diagnostic in &report.diagnostics {
                output.push_str(&format!("  {}\n", diagnostic.format_line()));
            }
            output.push('\n');
        }

        output.push_str(&self.format_summary(report));
        output
    }

    fn format_json(&self, report: &ValidationReport, violations: &[&Violation]) -> StyleResult<String> {
        let json_violations: Vec<JsonValue> = violations
            .iter()
            .map(|v| {
                serde_json::json!({
                    "rule_id": v.rule_id,
                    "severity": v.severity.as_str(),
                    "file_path": v.file_path.display().to_string(),
                    "line_number": v.line_number,
                    "column_number": v.column_number,
                    "expected": v.expected_pattern,
                    "found": v.actual_text,
                    "message": v.message,
                    "context": v.context,
                    "suggested_fix": v.suggested_fix,
                    "detected_at": v.detected_at.to_rfc3339()
                })
            })
            .collect();

        let json_report = serde_json::json!({
            "violations": json_violations,
            "diagnostics": report.diagnostics,
            "summary": {
                "total_files": report.summary.total_files,
                "violations_by_severity": {
                    "error": report.summary.violations_by_severity.error,
                    "warning": report.summary.violations_by_severity.warning,
                    "info": report.summary.violations_by_severity.info
                },
                "diagnostics": report.summary.diagnostics,
                "execution_time_ms": report.summary.execution_time_ms,
                "validated_at": report.summary.validated_at.to_rfc3339()
            },
            "config_fingerprint": report.config_fingerprint
        });

        serde_json::to_string_pretty(&json_report)
            .map_err(|e| StyleError::report(format!("JSON serialization failed: {e}")))
    }

    fn format_junit(&self, report: &ValidationReport, violations: &[&Violation]) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");

        let failures = violations.iter().filter(|v| v.severity == Severity::Error).count();
        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;

        xml.push_str(&format!(
            "<testsuite name=\"checkstyle\" tests=\"{}\" failures=\"{}\" errors=\"{}\" time=\"{:.3}\">\n",
            violations.len(),
            failures,
            report.diagnostics.len(),
            execution_time
        ));

        for violation in violations {
            xml.push_str(&format!(
                "  <testcase classname=\"{}\" name=\"{}:{}\">\n",
                escape_xml(&violation.rule_id),
                escape_xml(&violation.file_path.display().to_string()),
                violation.line_number.unwrap_or(0)
            ));
            if violation.severity == Severity::Error {
                xml.push_str(&format!("    <failure message=\"{}\">\n", escape_xml(&violation.message)));
                xml.push_str(&format!("      {}\n", escape_xml(&violation.format_line())));
                if let Some(context) = &violation.context {
                    xml.push_str(&format!("      Context: {}\n", escape_xml(context)));
                }
                xml.push_str("    </failure>\n");
            }
            xml.push_str("  </testcase>\n");
        }

        for diagnostic in &report.diagnostics {
            xml.push_str(&format!(
                "  <testcase classname=\"{}\" name=\"{}\">\n    <error message=\"{}\"/>\n  </testcase>\n",
                diagnostic.kind.as_str(),
                escape_xml(&diagnostic.file_path.display().to_string()),
                escape_xml(&diagnostic.message)
            ));
        }

        xml.push_str("</testsuite>\n");
        xml
    }

    fn format_sarif(&self, violations: &[&Violation]) -> StyleResult<String> {
        let results: Vec<JsonValue> = violations
            .iter()
            .map(|v| {
                let level = match v.severity {
                    Severity::Error => "error",
                    Severity::Warning => "warning",
                    Severity::Info => "note",
                };

                serde_json::json!({
                    "ruleId": v.rule_id,
                    "level": level,
                    "message": { "text": v.message },
                    "locations": [{
                        "physicalLocation": {
                            "artifactLocation": { "uri": v.file_path.display().to_string() },
                            "region": {
                                "startLine": v.line_number.unwrap_or(1),
                                "startColumn": v.column_number.unwrap_or(1)
                            },
                            "contextRegion": v.context.as_ref().map(|c| serde_json::json!({
                                "snippet": { "text": c }
                            }))
                        }
                    }]
                })
            })
            .collect();

        let sarif_report = serde_json::json!({
            "version": "2.1.0",
            "$schema": "https://json.schemastore.org/sarif-2.1.0.json",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": "checkstyle",
                        "version": env!("CARGO_PKG_VERSION"),
                        "informationUri": env!("CARGO_PKG_REPOSITORY")
                    }
                },
                "results": results
            }]
        });

        serde_json::to_string_pretty(&sarif_report)
            .map_err(|e| StyleError::report(format!("SARIF serialization failed: {e}")))
    }

    fn format_github(&self, violations: &[&Violation], diagnostics: &[FileDiagnostic]) -> String {
        let mut output = String::new();

        for violation in violations {
            let level = match violation.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Info => "notice",
            };
            let position = match (violation.line_number, violation.column_number) {
                (Some(line), Some(col)) => format!(",line={line},col={col}"),
                (Some(line), None) => format!(",line={line}"),
                _ => String::new(),
            };
            output.push_str(&format!(
                "::{} file={}{},title={}::{}\n",
                level,
                violation.file_path.display(),
                position,
                violation.rule_id,
                violation.message
            ));
        }

        for diagnostic in diagnostics {
            let position = diagnostic.line_number.map(|line| format!(",line={line}")).unwrap_or_default();
            output.push_str(&format!(
                "::warning file={}{},title={}::{}\n",
                diagnostic.file_path.display(),
                position,
                diagnostic.kind.as_str(),
                diagnostic.message
            ));
        }

        output
    }

    fn format_summary(&self, report: &ValidationReport) -> String {
        let counts = &report.summary.violations_by_severity;
        let execution_time = (report.summary.execution_time_ms as f64) / 1000.0;

        let mut parts = Vec::new();
        if counts.error > 0 {
            parts.push(self.paint(&plural(counts.error, "error"), Tone::Error));
        }
        if counts.warning > 0 {
            parts.push(self.paint(&plural(counts.warning, "warning"), Tone::Warning));
        }
        if counts.info > 0 {
            parts.push(self.paint(&format!("{} info", counts.info), Tone::Info));
        }
        if parts.is_empty() {
            parts.push(self.paint("0 violations", Tone::Success));
        }
        if report.summary.diagnostics > 0 {
            parts.push(plural(report.summary.diagnostics, "diagnostic"));
        }

        format!(
            "{} {} in {} files ({:.1}s)\n",
            self.paint("Summary:", Tone::Bold),
            parts.join(", "),
            report.summary.total_files,
            execution_time
        )
    }

    fn paint(&self, text: &str, tone: Tone) -> String {
        if self.options.use_colors {
            tone.apply(text)
        } else {
            text.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Tone {
    Error,
    Warning,
    Info,
    Success,
    Dim,
    Bold,
}

impl From<Severity> for Tone {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Error => Self::Error,
            Severity::Warning => Self::Warning,
            Severity::Info => Self::Info,
        }
    }
}

impl Tone {
    #[cfg(feature = "colors")]
    fn apply(self, text: &str) -> String {
        use colored::Colorize;

        match self {
            Self::Error => text.red().bold().to_string(),
            Self::Warning => text.yellow().to_string(),
            Self::Info => text.cyan().to_string(),
            Self::Success => text.green().to_string(),
            Self::Dim => text.dimmed().to_string(),
            Self::Bold => text.bold().to_string(),
        }
    }

    #[cfg(not(feature = "colors"))]
    fn apply(self, text: &str) -> String {
        text.to_string()
    }
}

fn plural(count: usize, noun: &str) -> String {
    format!("{} {}{}", count, noun, if count == 1 { "" } else { "s" })
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::violations::ScanDiagnostic;
    use std::path::PathBuf;

    fn plain_options() -> ReportOptions {
        ReportOptions { use_colors: false, ..Default::default() }
    }

    fn create_test_report() -> ValidationReport {
        let mut report = ValidationReport::new();

        report.add_violation(
            Violation::new(
                "private-field-naming",
                Severity::Warning,
                PathBuf::from("Assets/Player.cs"),
                "_camelCase",
                "health",
            )
            .with_position(3, 17)
            .with_context("    private int health;")
            .with_suggestion("_health"),
        );
        report.add_violation(
            Violation::new(
                "constant-naming",
                Severity::Error,
                PathBuf::from("Assets/Player.cs"),
                "UPPER_SNAKE_CASE",
                "MAXHEALTH",
            )
            .with_position(5, 23),
        );
        report.add_diagnostic(FileDiagnostic::scan(
            PathBuf::from("Assets/Enemy.cs"),
            ScanDiagnostic::new(9, 1, "unmatched `}`"),
        ));

        report.set_files_analyzed(2);
        report.set_execution_time(1200);
        report
    }

    #[test]
    fn test_plain_format() {
        let formatter = ReportFormatter::new(plain_options());
        let output = formatter.format(&create_test_report(), OutputFormat::Plain).unwrap();

        assert_eq!(
            output,
            "Assets/Player.cs:3: private-field-naming expected _camelCase, found health\n\
             Assets/Player.cs:5: constant-naming expected UPPER_SNAKE_CASE, found MAXHEALTH\n\
             Assets/Enemy.cs:9: scan-error: unmatched `}`\n"
        );
    }

    #[test]
    fn test_plain_format_of_empty_report_is_empty() {
        let output = ReportFormatter::default().format(&ValidationReport::new(), OutputFormat::Plain).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_human_format() {
        let formatter = ReportFormatter::new(plain_options());
        let output = formatter.format(&create_test_report(), OutputFormat::Human).unwrap();

        assert!(output.contains("Style Violations Found"));
        assert!(output.contains("Assets/Player.cs"));
        assert!(output.contains("3:17 [warning] private-field-naming"));
        assert!(output.contains("|     private int health;"));
        assert!(output.contains("rename to `_health`"));
        assert!(output.contains("Assets/Enemy.cs:9: scan-error: unmatched `}`"));
        assert!(output.contains("Summary: 1 error, 1 warning, 1 diagnostic in 2 files (1.2s)"));
    }

    #[test]
    fn test_human_format_without_context_or_suggestions() {
        let formatter = ReportFormatter::new(ReportOptions {
            show_context: false,
            show_suggestions: false,
            ..plain_options()
        });
        let output = formatter.format(&create_test_report(), OutputFormat::Human).unwrap();
        assert!(!output.contains("private int health;"));
        assert!(!output.contains("rename to"));
    }

    #[test]
    fn test_empty_report() {
        let formatter = ReportFormatter::new(plain_options());
        let output = formatter.format(&ValidationReport::new(), OutputFormat::Human).unwrap();

        assert!(output.contains("No style violations found"));
        assert!(output.contains("0 violations in 0 files"));
    }

    #[test]
    fn test_json_format() {
        let output = ReportFormatter::default().format(&create_test_report(), OutputFormat::Json).unwrap();

        let json: JsonValue = serde_json::from_str(&output).unwrap();
        assert_eq!(json["violations"].as_array().unwrap().len(), 2);
        assert_eq!(json["violations"][0]["rule_id"], "private-field-naming");
        assert_eq!(json["violations"][0]["found"], "health");
        assert_eq!(json["diagnostics"][0]["kind"], "scan-error");
        assert_eq!(json["summary"]["total_files"], 2);
    }

    #[test]
    fn test_junit_format() {
        let output = ReportFormatter::default().format(&create_test_report(), OutputFormat::Junit).unwrap();

        assert!(output.starts_with("<?xml version=\"1.0\""));
        assert!(output.contains("<testsuite name=\"checkstyle\" tests=\"2\" failures=\"1\" errors=\"1\""));
        assert!(output.contains("classname=\"constant-naming\""));
        assert!(output.contains("<failure"));
        assert!(output.contains("unmatched `}`"));
    }

    #[test]
    fn test_junit_escapes_configured_rule_ids() {
        let mut report = ValidationReport::new();
        report.add_violation(
            Violation::new("no-\"raw\"<tags>", Severity::Error, PathBuf::from("A&B.cs"), "CompareTag", "tag ==")
                .with_position(4, 9),
        );

        let output = ReportFormatter::default().format(&report, OutputFormat::Junit).unwrap();
        assert!(output.contains("<testcase classname=\"no-&quot;raw&quot;&lt;tags&gt;\" name=\"A&amp;B.cs:4\">"));
        assert!(!output.contains("\"raw\""));
    }

    #[test]
    fn test_sarif_format() {
        let output = ReportFormatter::default().format(&create_test_report(), OutputFormat::Sarif).unwrap();

        let json: JsonValue = serde_json::from_str(&output).unwrap();
        let results = json["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["level"], "warning");
        assert_eq!(results[1]["level"], "error");
        assert_eq!(results[0]["locations"][0]["physicalLocation"]["region"]["startLine"], 3);
    }

    #[test]
    fn test_github_format() {
        let output = ReportFormatter::default().format(&create_test_report(), OutputFormat::GitHub).unwrap();

        assert!(output.contains("::warning file=Assets/Player.cs,line=3,col=17,title=private-field-naming::"));
        assert!(output.contains("::error file=Assets/Player.cs,line=5,col=23,title=constant-naming::"));
        assert!(output.contains("::warning file=Assets/Enemy.cs,line=9,title=scan-error::unmatched `}`"));
    }

    #[test]
    fn test_severity_filtering_and_limit() {
        let report = create_test_report();

        let errors_only = ReportFormatter::new(ReportOptions { min_severity: Some(Severity::Error), ..plain_options() });
        let output = errors_only.format(&report, OutputFormat::Plain).unwrap();
        assert!(!output.contains("private-field-naming"));
        assert!(output.contains("constant-naming"));

        let limited = ReportFormatter::new(ReportOptions { max_violations: Some(1), ..plain_options() });
        let output = limited.format(&report, OutputFormat::Plain).unwrap();
        assert_eq!(output.lines().filter(|line| !line.contains("scan-error")).count(), 1);
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("github".parse::<OutputFormat>().unwrap(), OutputFormat::GitHub);
        assert_eq!("PLAIN".parse::<OutputFormat>().unwrap(), OutputFormat::Plain);
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::default().to_string(), "plain");
    }

    #[test]
    fn test_write_report() {
        let mut buffer = Vec::new();
        ReportFormatter::new(plain_options())
            .write_report(&create_test_report(), OutputFormat::Plain, &mut buffer)
            .unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap().lines().count(), 3);
    }
}
