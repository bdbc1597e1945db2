//! Main analysis orchestrator
//!
//! CDD Principle: Domain Services - Analyzer orchestrates complex validation workflows
//! - Coordinates path filtering, scanning, rule checking and result aggregation
//! - Provides clean interface for validating single files, sources or directory trees
//! - Files are independent, so they are processed in parallel and merged in path order

pub mod checker;
pub mod script;

use crate::analyzer::script::ScriptAnalyzer;
use crate::config::{RuleRegistry, StyleConfig};
use crate::domain::violations::{FileDiagnostic, ScanDiagnostic, StyleError, StyleResult, ValidationReport, Violation};
use crate::patterns::PathFilter;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

pub use checker::ConformanceChecker;

/// Main analyzer that orchestrates the entire validation process
pub struct Analyzer {
    config: StyleConfig,
    script_analyzer: ScriptAnalyzer,
    path_filter: PathFilter,
}

/// Options for customizing analysis behavior
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Whether to use parallel processing
    pub parallel: bool,
    /// Maximum number of files to analyze
    pub max_files: Option<usize>,
    /// Abort on the first unreadable file instead of recording a diagnostic
    pub fail_fast: bool,
    /// Additional paths to exclude for this run
    pub exclude_patterns: Vec<String>,
    /// Whether to ignore `.styleignore` files
    pub ignore_ignore_files: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            max_files: None,
            fail_fast: false,
            exclude_patterns: Vec::new(),
            ignore_ignore_files: false,
        }
    }
}

/// What analyzing one file produced
#[derive(Debug, Clone, Default)]
pub struct FileOutcome {
    pub violations: Vec<Violation>,
    pub diagnostics: Vec<FileDiagnostic>,
}

/// Trait for language-specific file analyzers
pub trait FileAnalyzer {
    /// Scan and check a file's content; problems become diagnostics
    fn analyze(&self, file_path: &Path, content: &str) -> FileOutcome;

    /// Check if this analyzer handles the given file type
    fn handles_file(&self, file_path: &Path) -> bool;
}

impl Analyzer {
    /// Create a new analyzer with the given configuration
    pub fn new(config: StyleConfig) -> StyleResult<Self> {
        let registry = RuleRegistry::load_rules(&config)?;

        let path_filter = PathFilter::new(
            config.paths.patterns.clone(),
            config.paths.ignore_file.clone().filter(|name| !name.is_empty()),
            config.paths.extensions.clone(),
        )
        .map_err(|e| StyleError::config(format!("Failed to create path filter: {e}")))?;

        Ok(Self {
            script_analyzer: ScriptAnalyzer::new(Arc::new(registry), config.scanner.clone()),
            config,
            path_filter,
        })
    }

    /// Create an analyzer with default configuration
    pub fn with_defaults() -> StyleResult<Self> {
        Self::new(StyleConfig::default())
    }

    pub fn config(&self) -> &StyleConfig {
        &self.config
    }

    pub fn registry(&self) -> &RuleRegistry {
        self.script_analyzer.registry()
    }

    /// Check in-memory source as if it were `file_path`
    pub fn analyze_source(&self, file_path: &Path, content: &str) -> FileOutcome {
        self.script_analyzer.analyze(file_path, content)
    }

    /// Read and check a single file
    pub fn analyze_file<P: AsRef<Path>>(&self, file_path: P) -> StyleResult<FileOutcome> {
        let file_path = file_path.as_ref();

        let bytes = fs::read(file_path).map_err(|e| {
            StyleError::analysis(file_path.display().to_string(), format!("Failed to read file: {e}"))
        })?;

        match String::from_utf8(bytes) {
            Ok(content) => Ok(self.analyze_source(file_path, &content)),
            Err(e) => {
                let content = String::from_utf8_lossy(e.as_bytes()).into_owned();
                let mut outcome = self.analyze_source(file_path, &content);
                outcome.diagnostics.insert(
                    0,
                    FileDiagnostic::scan(
                        file_path.to_path_buf(),
                        ScanDiagnostic::new(1, 1, "file is not valid UTF-8; invalid bytes were replaced"),
                    ),
                );
                Ok(outcome)
            }
        }
    }

    /// Analyze files and directories and return a complete validation report
    pub fn analyze_paths<P: AsRef<Path>>(
        &self,
        paths: &[P],
        options: &AnalysisOptions,
    ) -> StyleResult<ValidationReport> {
        let start_time = Instant::now();
        let mut report = ValidationReport::new();

        let mut filter = self.path_filter.clone();
        for pattern in &options.exclude_patterns {
            filter.add_pattern(pattern)?;
        }
        if options.ignore_ignore_files {
            filter.disable_ignore_files();
        }

        let mut files_to_analyze = Vec::new();
        let mut seen = HashSet::new();
        for path in paths {
            let path = path.as_ref();
            match filter.find_files(path) {
                Ok(found) => {
                    files_to_analyze.extend(found.into_iter().filter(|f| seen.insert(f.clone())));
                }
                Err(e) if options.fail_fast => return Err(e),
                Err(e) => {
                    tracing::warn!("Cannot analyze {}: {}", path.display(), e);
                    report.add_diagnostic(FileDiagnostic::io(path.to_path_buf(), e.to_string()));
                }
            }
        }

        files_to_analyze.retain(|f| {
            let handled = self.script_analyzer.handles_file(f);
            if !handled {
                tracing::debug!("No analyzer handles {}, skipping", f.display());
            }
            handled
        });

        if let Some(max_files) = options.max_files {
            files_to_analyze.truncate(max_files);
        }
        let total_files = files_to_analyze.len();
        tracing::debug!("Analyzing {} files", total_files);

        let results: Vec<(PathBuf, StyleResult<FileOutcome>)> = if options.parallel && total_files > 1 {
            files_to_analyze.into_par_iter().map(|f| {
                let outcome = self.analyze_file(&f);
                (f, outcome)
            }).collect()
        } else {
            files_to_analyze.into_iter().map(|f| {
                let outcome = self.analyze_file(&f);
                (f, outcome)
            }).collect()
        };

        for (file_path, result) in results {
            match result {
                Ok(outcome) => {
                    for violation in outcome.violations {
                        report.add_violation(violation);
                    }
                    for diagnostic in outcome.diagnostics {
                        report.add_diagnostic(diagnostic);
                    }
                }
                Err(e) if options.fail_fast => return Err(e),
                Err(e) => {
                    tracing::warn!("Failed to analyze {}: {}", file_path.display(), e);
                    report.add_diagnostic(FileDiagnostic::io(file_path, e.to_string()));
                }
            }
        }

        report.set_files_analyzed(total_files);
        report.set_execution_time(start_time.elapsed().as_millis() as u64);
        report.set_config_fingerprint(self.config.fingerprint());
        report.sort_violations();

        Ok(report)
    }

    /// Analyze a directory tree and return a validation report
    pub fn analyze_directory<P: AsRef<Path>>(
        &self,
        root: P,
        options: &AnalysisOptions,
    ) -> StyleResult<ValidationReport> {
        self.analyze_paths(&[root.as_ref()], options)
    }

    pub fn config_fingerprint(&self) -> String {
        self.config.fingerprint()
    }

    /// Statistics about the configured rules
    pub fn rule_stats(&self) -> RuleStats {
        let mut stats = RuleStats::default();

        for category in self.config.rules.values() {
            if category.enabled {
                stats.enabled_categories += 1;
                let enabled = category.rules.iter().filter(|rule| rule.enabled).count();
                stats.enabled_rules += enabled;
                stats.disabled_rules += category.rules.len() - enabled;
            } else {
                stats.disabled_categories += 1;
                stats.disabled_rules += category.rules.len();
            }
        }

        stats.naming_rules =
            self.registry().rules().iter().filter(|rule| rule.pattern.naming_convention().is_some()).count();
        stats
    }
}

/// Statistics about configured rules
#[derive(Debug, Default)]
pub struct RuleStats {
    pub enabled_categories: usize,
    pub disabled_categories: usize,
    pub enabled_rules: usize,
    pub disabled_rules: usize,
    /// Enabled rules that check identifier casing
    pub naming_rules: usize,
}

impl RuleStats {
    pub fn total_categories(&self) -> usize {
        self.enabled_categories + self.disabled_categories
    }

    pub fn total_rules(&self) -> usize {
        self.enabled_rules + self.disabled_rules
    }
}
