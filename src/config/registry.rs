//! Compiled, immutable rule set
//!
//! Rules are compiled once from configuration and shared read-only by every
//! file being checked.

use super::{RuleDefinition, StyleConfig};
use crate::domain::identifiers::{ConstructKind, Identifier, Visibility};
use crate::domain::violations::{Severity, StyleError, StyleResult};
use crate::patterns::NamePattern;
use std::path::Path;

/// A style rule ready for matching
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    /// Category the rule was defined in
    pub category: String,
    pub applies_to: ConstructKind,
    /// Empty means any visibility
    pub visibility: Vec<Visibility>,
    pub pattern: NamePattern,
    /// Text printed after "expected"
    pub expected: String,
    pub message: String,
    pub severity: Severity,
    excluded_names: Vec<glob::Pattern>,
    excluded_files: Vec<glob::Pattern>,
}

impl Rule {
    fn compile(category: &str, severity: Severity, definition: &RuleDefinition) -> StyleResult<Self> {
        let pattern = NamePattern::parse(&definition.pattern).map_err(|e| {
            StyleError::config(format!("Invalid pattern in rule '{}': {}", definition.id, e))
        })?;

        let globs = |patterns: &[String]| -> StyleResult<Vec<glob::Pattern>> {
            patterns
                .iter()
                .map(|p| {
                    glob::Pattern::new(p).map_err(|e| {
                        StyleError::config(format!(
                            "Invalid exclude pattern '{}' in rule '{}': {}",
                            p, definition.id, e
                        ))
                    })
                })
                .collect()
        };
        let conditions = definition.exclude_if.clone().unwrap_or_default();

        Ok(Self {
            id: definition.id.clone(),
            category: category.to_string(),
            applies_to: definition.applies_to,
            visibility: definition.visibility.clone(),
            expected: definition.expected.clone().unwrap_or_else(|| pattern.as_str().to_string()),
            pattern,
            message: definition.message.clone(),
            severity: definition.severity.unwrap_or(severity),
            excluded_names: globs(&conditions.names)?,
            excluded_files: globs(&conditions.file_patterns)?,
        })
    }

    /// Whether the rule checks this identifier at all
    pub fn applies(&self, identifier: &Identifier) -> bool {
        if identifier.kind != self.applies_to {
            return false;
        }
        match identifier.visibility {
            Some(visibility) if !self.visibility.is_empty() => self.visibility.contains(&visibility),
            None => self.visibility.is_empty(),
            Some(_) => true,
        }
    }

    /// Whether `exclude_if` suppresses this identifier in `file`
    pub fn is_excluded(&self, identifier: &Identifier, file: &Path) -> bool {
        self.excluded_names.iter().any(|p| p.matches(&identifier.name))
            || self.excluded_files.iter().any(|p| p.matches_path(file))
    }

    /// Rule message with `{name}`, `{expected}` and `{kind}` filled in
    pub fn render_message(&self, identifier: &Identifier) -> String {
        if self.message.is_empty() {
            return format!("expected {}, found {}", self.expected, identifier.name);
        }
        self.message
            .replace("{name}", &identifier.name)
            .replace("{expected}", &self.expected)
            .replace("{kind}", identifier.kind.as_str())
    }
}

/// The loaded set of rules, in configuration order
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
}

impl RuleRegistry {
    /// Compile the enabled rules of `config`
    ///
    /// Fails with a configuration error when any definition is malformed.
    pub fn load_rules(config: &StyleConfig) -> StyleResult<Self> {
        config.validate()?;

        let rules = config
            .enabled_rules()
            .map(|(category_name, category, definition)| {
                Rule::compile(category_name, category.severity, definition)
            })
            .collect::<StyleResult<Vec<_>>>()?;

        tracing::debug!("Loaded {} rules", rules.len());
        Ok(Self { rules })
    }

    /// Registry for the built-in rule set
    pub fn with_defaults() -> StyleResult<Self> {
        Self::load_rules(&StyleConfig::with_defaults())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn get(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == rule_id)
    }

    /// Rules applicable to `identifier`, in registry order
    pub fn rules_for<'r, 'i>(&'r self, identifier: &'i Identifier) -> impl Iterator<Item = &'r Rule> + 'i
    where
        'r: 'i,
    {
        self.rules.iter().filter(move |rule| rule.applies(identifier))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
