//! Matches scanned identifiers against the rule registry
//!
//! CDD Principle: Domain Services - The checker is a pure function of identifiers and rules
//! - Identifier order is preserved, and rule order within each identifier
//! - Each failing (identifier, rule) pair yields exactly one violation
//! - No I/O; the caller decides where identifiers come from and where violations go

use crate::config::{Rule, RuleRegistry};
use crate::domain::identifiers::Identifier;
use crate::domain::violations::Violation;
use std::path::Path;

/// Checks identifiers against a loaded rule set
#[derive(Debug, Clone, Copy)]
pub struct ConformanceChecker<'r> {
    registry: &'r RuleRegistry,
}

impl<'r> ConformanceChecker<'r> {
    pub fn new(registry: &'r RuleRegistry) -> Self {
        Self { registry }
    }

    /// Violations for every identifier, in input order
    pub fn check<I>(&self, identifiers: I, file: &Path) -> Vec<Violation>
    where
        I: IntoIterator<Item = Identifier>,
    {
        identifiers
            .into_iter()
            .flat_map(|identifier| self.check_identifier(&identifier, file))
            .collect()
    }

    /// Violations for one identifier, in rule order
    pub fn check_identifier(&self, identifier: &Identifier, file: &Path) -> Vec<Violation> {
        self.registry
            .rules_for(identifier)
            .filter(|rule| !rule.pattern.matches(&identifier.name))
            .filter(|rule| {
                let excluded = rule.is_excluded(identifier, file);
                if excluded {
                    tracing::debug!(
                        "{} at {}:{} excluded from rule '{}'",
                        identifier.name,
                        file.display(),
                        identifier.line,
                        rule.id
                    );
                }
                !excluded
            })
            .map(|rule| violation(rule, identifier, file))
            .collect()
    }
}

fn violation(rule: &Rule, identifier: &Identifier, file: &Path) -> Violation {
    let mut violation = Violation::new(
        rule.id.clone(),
        rule.severity,
        file.to_path_buf(),
        rule.expected.clone(),
        identifier.name.clone(),
    )
    .with_position(identifier.line, identifier.column)
    .with_message(rule.render_message(identifier));

    if !identifier.context.is_empty() {
        violation = violation.with_context(identifier.context.clone());
    }
    if let Some(suggestion) = rule.pattern.suggest(&identifier.name) {
        violation = violation.with_suggestion(suggestion);
    }
    violation
}
