//! Configuration loading and management for the style checker
//!
//! Architecture: Anti-Corruption Layer - Configuration translates external YAML into rule data
//! - Raw YAML structures are validated before any rule is compiled
//! - The built-in rule set lives here as data, not as code paths
//! - Category order from the file is preserved so checking order is reproducible

pub mod registry;

use crate::domain::identifiers::{ConstructKind, Visibility};
use crate::domain::violations::{Severity, StyleError, StyleResult};
use crate::patterns::path_filter::{default_exclusions, DEFAULT_IGNORE_FILE};
use crate::patterns::NamePattern;
use crate::scanner::ScannerOptions;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

pub use registry::{Rule, RuleRegistry};

/// Supported configuration format versions
pub const SUPPORTED_VERSIONS: &[&str] = &["1.0"];

/// File names looked up in the working directory when no config is given
pub const DEFAULT_CONFIG_FILES: &[&str] = &["checkstyle.yaml", "checkstyle.yml", ".checkstyle.yaml"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Configuration format version
    pub version: String,
    /// Which files are checked
    #[serde(default)]
    pub paths: PathConfig,
    /// Scanner behavior
    #[serde(default)]
    pub scanner: ScannerOptions,
    /// Rule definitions grouped by category, in file order
    pub rules: IndexMap<String, RuleCategory>,
}

/// Path filtering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    /// Include/exclude patterns (gitignore-style)
    #[serde(default)]
    pub patterns: Vec<String>,
    /// Per-directory ignore file name; `null` disables ignore files
    #[serde(default = "default_ignore_file")]
    pub ignore_file: Option<String>,
    /// Script file extensions
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            patterns: default_exclusions(),
            ignore_file: default_ignore_file(),
            extensions: default_extensions(),
        }
    }
}

/// A category of rules (e.g. "naming", "unity")
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleCategory {
    /// Default severity for rules in this category
    pub severity: Severity,
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub rules: Vec<RuleDefinition>,
}

/// A single rule as written in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDefinition {
    /// Unique identifier, printed in every violation
    pub id: String,
    /// Construct kind the rule checks
    pub applies_to: ConstructKind,
    /// Restrict to these visibilities (any when empty)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visibility: Vec<Visibility>,
    /// Pattern syntax, see `NamePattern::parse`
    pub pattern: String,
    /// Text printed after "expected" (defaults to the pattern)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Description with `{name}`, `{expected}` and `{kind}` placeholders
    #[serde(default)]
    pub message: String,
    /// Severity override (uses category default if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_if: Option<ExcludeConditions>,
}

/// Conditions that keep a mismatch from being reported
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExcludeConditions {
    /// Glob patterns over the construct text (e.g. `On*`)
    #[serde(default)]
    pub names: Vec<String>,
    /// Glob patterns over the file path
    #[serde(default)]
    pub file_patterns: Vec<String>,
}

impl StyleConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> StyleResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            StyleError::config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let config: Self = serde_yaml::from_str(&contents).map_err(|e| {
            StyleError::config(format!("Failed to parse config file '{}': {}", path.display(), e))
        })?;

        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration from string content
    pub fn load_from_str(content: &str) -> StyleResult<Self> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| StyleError::config(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// First default config file present in `dir`
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_FILES.iter().map(|name| dir.join(name)).find(|path| path.is_file())
    }

    /// Built-in rule set for Unity-style scripts
    pub fn with_defaults() -> Self {
        Self {
            version: "1.0".to_string(),
            paths: PathConfig::default(),
            scanner: ScannerOptions::default(),
            rules: default_rules(),
        }
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> StyleResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version.as_str()) {
            return Err(StyleError::config(format!(
                "Unsupported configuration version: {}. Supported versions: {}",
                self.version,
                SUPPORTED_VERSIONS.join(", ")
            )));
        }

        for pattern in &self.paths.patterns {
            glob::Pattern::new(pattern.trim_start_matches('!').trim_matches('/')).map_err(|e| {
                StyleError::config(format!("Invalid path pattern '{pattern}': {e}"))
            })?;
        }

        let mut seen = HashSet::new();
        for (category_name, category) in &self.rules {
            for rule in &category.rules {
                if rule.id.trim().is_empty() {
                    return Err(StyleError::config(format!(
                        "Rule without an id in category '{category_name}'"
                    )));
                }
                if !seen.insert(rule.id.as_str()) {
                    return Err(StyleError::config(format!(
                        "Duplicate rule ID '{}' in category '{}'",
                        rule.id, category_name
                    )));
                }

                NamePattern::parse(&rule.pattern).map_err(|e| {
                    StyleError::config(format!("Invalid pattern in rule '{}': {}", rule.id, e))
                })?;

                if let Some(conditions) = &rule.exclude_if {
                    for pattern in conditions.names.iter().chain(&conditions.file_patterns) {
                        glob::Pattern::new(pattern).map_err(|e| {
                            StyleError::config(format!(
                                "Invalid exclude pattern '{}' in rule '{}': {}",
                                pattern, rule.id, e
                            ))
                        })?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Enabled rules across enabled categories, in configuration order
    pub fn enabled_rules(&self) -> impl Iterator<Item = (&String, &RuleCategory, &RuleDefinition)> {
        self.rules.iter().filter(|(_, category)| category.enabled).flat_map(|(name, category)| {
            category.rules.iter().filter(|rule| rule.enabled).map(move |rule| (name, category, rule))
        })
    }

    /// Find a rule definition and its category name by id
    pub fn find_rule(&self, rule_id: &str) -> Option<(&String, &RuleCategory, &RuleDefinition)> {
        self.rules.iter().find_map(|(name, category)| {
            category.rules.iter().find(|rule| rule.id == rule_id).map(|rule| (name, category, rule))
        })
    }

    /// Effective severity for a rule (rule override or category default)
    pub fn effective_severity(&self, category: &RuleCategory, rule: &RuleDefinition) -> Severity {
        rule.severity.unwrap_or(category.severity)
    }

    /// Convert to JSON for serialization
    pub fn to_json(&self) -> StyleResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StyleError::config(format!("Failed to serialize config: {e}")))
    }

    pub fn to_yaml(&self) -> StyleResult<String> {
        serde_yaml::to_string(self)
            .map_err(|e| StyleError::config(format!("Failed to serialize config: {e}")))
    }

    /// Stable fingerprint of the configuration for report metadata
    pub fn fingerprint(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();

        self.version.hash(&mut hasher);
        self.paths.patterns.hash(&mut hasher);
        self.paths.ignore_file.hash(&mut hasher);
        self.paths.extensions.hash(&mut hasher);
        self.scanner.hot_methods.hash(&mut hasher);

        // Category and rule order affect output order, so they are hashed as-is
        for (category_name, category) in &self.rules {
            category_name.hash(&mut hasher);
            category.severity.hash(&mut hasher);
            category.enabled.hash(&mut hasher);

            for rule in &category.rules {
                rule.id.hash(&mut hasher);
                rule.applies_to.hash(&mut hasher);
                rule.visibility.hash(&mut hasher);
                rule.pattern.hash(&mut hasher);
                rule.expected.hash(&mut hasher);
                rule.severity.hash(&mut hasher);
                rule.enabled.hash(&mut hasher);
                if let Some(conditions) = &rule.exclude_if {
                    conditions.names.hash(&mut hasher);
                    conditions.file_patterns.hash(&mut hasher);
                }
            }
        }

        format!("{:x}", hasher.finish())
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_true() -> bool {
    true
}

fn default_ignore_file() -> Option<String> {
    Some(DEFAULT_IGNORE_FILE.to_string())
}

fn default_extensions() -> Vec<String> {
    vec!["cs".to_string()]
}

fn rule(id: &str, applies_to: ConstructKind, pattern: &str, message: &str) -> RuleDefinition {
    RuleDefinition {
        id: id.to_string(),
        applies_to,
        visibility: Vec::new(),
        pattern: pattern.to_string(),
        expected: None,
        message: message.to_string(),
        severity: None,
        enabled: true,
        exclude_if: None,
    }
}

/// Per-frame lookups that should be cached outside the hot path
const HOT_PATH_LOOKUPS: &[&str] = &[
    "GetComponent",
    "GetComponents",
    "GetComponentInChildren",
    "GetComponentsInChildren",
    "GetComponentInParent",
    "GetComponentsInParent",
    "GameObject.Find",
    "GameObject.FindWithTag",
    "GameObject.FindGameObjectWithTag",
    "GameObject.FindGameObjectsWithTag",
    "FindObjectOfType",
    "FindObjectsOfType",
    "FindFirstObjectByType",
    "FindAnyObjectByType",
    "SendMessage",
    "BroadcastMessage",
];

/// The built-in rule set
fn default_rules() -> IndexMap<String, RuleCategory> {
    use ConstructKind::*;

    let mut rules = IndexMap::new();

    let field = |id: &str, visibility: Visibility, pattern: &str, message: &str| RuleDefinition {
        visibility: vec![visibility],
        ..rule(id, Field, pattern, message)
    };

    rules.insert(
        "naming".to_string(),
        RuleCategory {
            severity: Severity::Warning,
            enabled: true,
            rules: vec![
                rule("class-naming", Class, "PascalCase", "Class names use PascalCase: {name}"),
                rule("struct-naming", Struct, "PascalCase", "Struct names use PascalCase: {name}"),
                rule(
                    "interface-naming",
                    Interface,
                    "IPascalCase",
                    "Interface names start with I followed by PascalCase: {name}",
                ),
                rule("enum-naming", Enum, "PascalCase", "Enum names use PascalCase: {name}"),
                rule("enum-member-naming", EnumMember, "PascalCase", "Enum members use PascalCase: {name}"),
                rule("method-naming", Method, "PascalCase", "Method names use PascalCase: {name}"),
                rule("property-naming", Property, "PascalCase", "Property names use PascalCase: {name}"),
                field("public-field-naming", Visibility::Public, "PascalCase", "Public fields use PascalCase: {name}"),
                field(
                    "protected-field-naming",
                    Visibility::Protected,
                    "_camelCase",
                    "Protected fields use an underscore and camelCase: {name}",
                ),
                field(
                    "private-field-naming",
                    Visibility::Private,
                    "_camelCase",
                    "Private fields use an underscore and camelCase: {name}",
                ),
                rule("constant-naming", Constant, "UPPER_SNAKE_CASE", "Constants use UPPER_SNAKE_CASE: {name}"),
                RuleDefinition {
                    severity: Some(Severity::Info),
                    ..rule("parameter-naming", Parameter, "camelCase", "Parameters use camelCase: {name}")
                },
                RuleDefinition {
                    severity: Some(Severity::Info),
                    ..rule("local-naming", Local, "camelCase", "Local variables use camelCase: {name}")
                },
            ],
        },
    );

    rules.insert(
        "formatting".to_string(),
        RuleCategory {
            severity: Severity::Info,
            enabled: true,
            rules: vec![rule(
                "brace-style",
                Brace,
                "allman",
                "Opening braces go on their own line",
            )],
        },
    );

    rules.insert(
        "literals".to_string(),
        RuleCategory {
            severity: Severity::Info,
            enabled: true,
            rules: vec![RuleDefinition {
                expected: Some("named constant".to_string()),
                ..rule(
                    "magic-number",
                    NumericLiteral,
                    "literal-in:0,1,-1,2,0.5",
                    "Replace magic number {name} with a named constant or serialized field",
                )
            }],
        },
    );

    rules.insert(
        "unity".to_string(),
        RuleCategory {
            severity: Severity::Warning,
            enabled: true,
            rules: vec![
                RuleDefinition {
                    expected: Some("== null or != null".to_string()),
                    ..rule(
                        "null-check-form",
                        NullCheck,
                        "one-of:== null|!= null",
                        "`{name}` bypasses the engine's overloaded null check for destroyed objects",
                    )
                },
                RuleDefinition {
                    expected: Some("cached reference".to_string()),
                    ..rule(
                        "hot-path-lookup",
                        HotPathCall,
                        &format!("none-of:{}", HOT_PATH_LOOKUPS.join("|")),
                        "Cache the result of {name} instead of looking it up every frame",
                    )
                },
                RuleDefinition {
                    expected: Some("CompareTag".to_string()),
                    ..rule(
                        "tag-comparison",
                        TagComparison,
                        "one-of:CompareTag",
                        "Use CompareTag instead of `{name}` to avoid allocating the tag string",
                    )
                },
            ],
        },
    );

    rules
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: StyleConfig,
}

impl ConfigBuilder {
    /// Start from the built-in configuration
    pub fn new() -> Self {
        Self { config: StyleConfig::default() }
    }

    /// Start from an empty rule set
    pub fn empty() -> Self {
        Self { config: StyleConfig { rules: IndexMap::new(), ..StyleConfig::default() } }
    }

    pub fn add_path_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.paths.patterns.push(pattern.into());
        self
    }

    pub fn ignore_file(mut self, filename: impl Into<String>) -> Self {
        self.config.paths.ignore_file = Some(filename.into());
        self
    }

    pub fn hot_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.scanner.hot_methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Add or replace a rule category
    pub fn add_category(mut self, name: impl Into<String>, category: RuleCategory) -> Self {
        self.config.rules.insert(name.into(), category);
        self
    }

    /// Enable or disable a single rule wherever it is defined
    pub fn set_rule_enabled(mut self, rule_id: &str, enabled: bool) -> Self {
        for category in self.config.rules.values_mut() {
            for rule in category.rules.iter_mut().filter(|r| r.id == rule_id) {
                rule.enabled = enabled;
            }
        }
        self
    }

    /// Build the final configuration
    pub fn build(self) -> StyleResult<StyleConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let config = StyleConfig::with_defaults();
        config.validate().unwrap();
        let ids: Vec<_> = config.enabled_rules().map(|(_, _, r)| r.id.as_str()).collect();
        assert_eq!(ids.len(), 18);
        assert_eq!(ids[0], "class-naming");
        assert!(ids.contains(&"private-field-naming"));
        assert!(ids.contains(&"constant-naming"));
    }

    #[test]
    fn test_load_from_str_preserves_category_order() {
        let yaml = r#"
version: "1.0"
rules:
  zeta:
    severity: error
    rules:
      - id: z-rule
        applies_to: class
        pattern: PascalCase
  alpha:
    severity: info
    enabled: false
    rules:
      - id: a-rule
        applies_to: field
        visibility: [private, protected]
        pattern: "regex:m_[a-z]\\w*"
        exclude_if:
          names: ["m_*Legacy"]
"#;
        let config = StyleConfig::load_from_str(yaml).unwrap();
        let categories: Vec<_> = config.rules.keys().cloned().collect();
        assert_eq!(categories, vec!["zeta", "alpha"]);
        assert_eq!(config.enabled_rules().count(), 1);

        let (category, _, rule) = config.find_rule("a-rule").unwrap();
        assert_eq!(category, "alpha");
        assert_eq!(rule.visibility, vec![Visibility::Private, Visibility::Protected]);
        assert_eq!(config.paths.extensions, vec!["cs"]);
        assert_eq!(config.scanner.hot_methods, ScannerOptions::default().hot_methods);
    }

    #[test]
    fn test_malformed_configs_are_rejected() {
        let cases = [
            ("version: \"2.0\"\nrules: {}", "Unsupported configuration version"),
            ("version: \"1.0\"\nrules:\n  a:\n    severity: warning\n    rules:\n      - {id: x, applies_to: widget, pattern: PascalCase}", "Failed to parse"),
            ("version: \"1.0\"\nrules:\n  a:\n    severity: warning\n    rules:\n      - {id: x, applies_to: class, pattern: Snake}", "Invalid pattern in rule 'x'"),
            ("version: \"1.0\"\nrules:\n  a:\n    severity: warning\n    rules:\n      - {id: x, applies_to: class, pattern: PascalCase}\n  b:\n    severity: info\n    rules:\n      - {id: x, applies_to: method, pattern: PascalCase}", "Duplicate rule ID 'x'"),
            ("version: \"1.0\"\nrules:\n  a:\n    severity: warning\n    rules:\n      - {id: x, applies_to: class, pattern: PascalCase, colour: red}", "Failed to parse"),
            ("version: \"1.0\"\nrules:\n  a:\n    severity: warning\n    rules:\n      - {id: x, applies_to: class, pattern: \"regex:(\"}", "Invalid pattern in rule 'x'"),
        ];

        for (yaml, expected) in cases {
            let error = StyleConfig::load_from_str(yaml).unwrap_err();
            assert!(matches!(error, StyleError::Configuration { .. }), "{yaml}");
            assert!(error.to_string().contains(expected), "{error} should mention {expected}");
        }
    }

    #[test]
    fn test_load_from_file_and_discover() {
        let temp = TempDir::new().unwrap();
        assert!(StyleConfig::discover(temp.path()).is_none());

        let yaml = StyleConfig::with_defaults().to_yaml().unwrap();
        fs::write(temp.path().join(".checkstyle.yaml"), yaml).unwrap();

        let found = StyleConfig::discover(temp.path()).unwrap();
        let loaded = StyleConfig::load_from_file(&found).unwrap();
        assert_eq!(loaded.fingerprint(), StyleConfig::with_defaults().fingerprint());
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let error = StyleConfig::load_from_file("/no/such/checkstyle.yaml").unwrap_err();
        assert!(error.is_fatal());
    }

    #[test]
    fn test_fingerprint_tracks_changes() {
        let base = StyleConfig::with_defaults();
        assert_eq!(base.fingerprint(), StyleConfig::with_defaults().fingerprint());

        let changed = ConfigBuilder::new().set_rule_enabled("magic-number", false).build().unwrap();
        assert_ne!(base.fingerprint(), changed.fingerprint());
    }

    #[test]
    fn test_builder() {
        let config = ConfigBuilder::empty()
            .add_path_pattern("Assets/Plugins/")
            .hot_methods(["Tick"])
            .add_category(
                "naming",
                RuleCategory {
                    severity: Severity::Error,
                    enabled: true,
                    rules: vec![rule("class-naming", ConstructKind::Class, "PascalCase", "")],
                },
            )
            .build()
            .unwrap();

        assert!(config.paths.patterns.contains(&"Assets/Plugins/".to_string()));
        assert_eq!(config.scanner.hot_methods, vec!["Tick"]);
        assert_eq!(config.enabled_rules().count(), 1);

        let invalid = ConfigBuilder::empty().add_path_pattern("[bad").build();
        assert!(invalid.is_err());
    }
}
