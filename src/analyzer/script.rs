//! Script-file analysis: scan source text, then check what was found
//!
//! Code Quality Principle: Specialized Analysis Services - one analyzer per source language
//! - Implements FileAnalyzer for C# game scripts
//! - Scan diagnostics are attached to the file instead of failing the analysis

use crate::analyzer::checker::ConformanceChecker;
use crate::analyzer::{FileAnalyzer, FileOutcome};
use crate::config::RuleRegistry;
use crate::domain::violations::FileDiagnostic;
use crate::scanner::{ScannerOptions, SourceScanner};
use std::path::Path;
use std::sync::Arc;

/// Analyzer for `.cs` scripts
#[derive(Debug, Clone)]
pub struct ScriptAnalyzer {
    scanner: SourceScanner,
    registry: Arc<RuleRegistry>,
}

impl ScriptAnalyzer {
    pub fn new(registry: Arc<RuleRegistry>, options: ScannerOptions) -> Self {
        Self { scanner: SourceScanner::new(options), registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }
}

impl FileAnalyzer for ScriptAnalyzer {
    fn analyze(&self, file_path: &Path, content: &str) -> FileOutcome {
        let checker = ConformanceChecker::new(&self.registry);
        let mut scan = self.scanner.scan(content);
        let violations = checker.check(scan.by_ref(), file_path);

        let diagnostics: Vec<_> = scan
            .diagnostics()
            .into_iter()
            .map(|d| FileDiagnostic::scan(file_path.to_path_buf(), d))
            .collect();
        for diagnostic in &diagnostics {
            tracing::warn!("{}", diagnostic.format_line());
        }

        tracing::debug!(
            "{}: {} violations, {} diagnostics",
            file_path.display(),
            violations.len(),
            diagnostics.len()
        );
        FileOutcome { violations, diagnostics }
    }

    fn handles_file(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("cs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> ScriptAnalyzer {
        ScriptAnalyzer::new(Arc::new(RuleRegistry::with_defaults().unwrap()), ScannerOptions::default())
    }

    #[test]
    fn test_handles_script_files() {
        let analyzer = analyzer();
        assert!(analyzer.handles_file(Path::new("Assets/Player.cs")));
        assert!(analyzer.handles_file(Path::new("Assets/Player.CS")));
        assert!(!analyzer.handles_file(Path::new("Assets/Player.cs.meta")));
        assert!(!analyzer.handles_file(Path::new("Makefile")));
    }

    #[test]
    fn test_analyze_reports_fields_and_constants() {
        let source = "public class Player : MonoBehaviour\n{\n    private int health;\n    private int _armor;\n    private const int MAXHEALTH = 100;\n}\n";
        let outcome = analyzer().analyze(Path::new("Player.cs"), source);
        let lines: Vec<_> = outcome.violations.iter().map(|v| v.format_line()).collect();

        assert_eq!(
            lines,
            vec![
                "Player.cs:3: private-field-naming expected _camelCase, found health",
                "Player.cs:5: constant-naming expected UPPER_SNAKE_CASE, found MAXHEALTH",
            ]
        );
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_analyze_keeps_going_after_scan_errors() {
        let source = "class Player\n{\n    int health;\n}\n}\n";
        let outcome = analyzer().analyze(Path::new("Player.cs"), source);

        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].format_line(), "Player.cs:5: scan-error: unmatched `}`");
    }
}
