//! Pattern engine for deciding whether construct text conforms to a rule
//!
//! Architectural Principle: Service Layer - Patterns are parsed once and matched many times
//! - Configuration strings are parsed into a closed set of matchers at load time
//! - Naming conventions use precompiled regexes shared across all rules
//! - Naming matchers can also derive a conforming rename for reports

pub mod path_filter;

use crate::domain::violations::{StyleError, StyleResult};
use heck::{ToLowerCamelCase, ToShoutySnakeCase, ToUpperCamelCase};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

pub use path_filter::PathFilter;

lazy_static! {
    static ref PASCAL_CASE: Regex = Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap();
    static ref CAMEL_CASE: Regex = Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap();
    static ref PREFIXED_CAMEL_CASE: Regex = Regex::new(r"^_[a-z][a-zA-Z0-9]*$").unwrap();
    static ref UPPER_SNAKE_CASE: Regex = Regex::new(r"^[A-Z][A-Z0-9]*(?:_[A-Z0-9]+)+$").unwrap();
    static ref INTERFACE_NAME: Regex = Regex::new(r"^I[A-Z][a-zA-Z0-9]*$").unwrap();
}

/// Identifier casing conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamingConvention {
    /// `PlayerController`
    PascalCase,
    /// `moveSpeed`
    CamelCase,
    /// `_moveSpeed`
    PrefixedCamelCase,
    /// `MAX_HEALTH`; at least two words so run-together names are caught
    UpperSnakeCase,
    /// `IDamageable`
    InterfaceName,
}

impl NamingConvention {
    fn regex(self) -> &'static Regex {
        match self {
            Self::PascalCase => &PASCAL_CASE,
            Self::CamelCase => &CAMEL_CASE,
            Self::PrefixedCamelCase => &PREFIXED_CAMEL_CASE,
            Self::UpperSnakeCase => &UPPER_SNAKE_CASE,
            Self::InterfaceName => &INTERFACE_NAME,
        }
    }

    pub fn matches(self, name: &str) -> bool {
        self.regex().is_match(name)
    }

    /// Rewrite `name` into this convention
    pub fn convert(self, name: &str) -> String {
        match self {
            Self::PascalCase => name.to_upper_camel_case(),
            Self::CamelCase => name.to_lower_camel_case(),
            Self::PrefixedCamelCase => format!("_{}", name.to_lower_camel_case()),
            Self::UpperSnakeCase => name.to_shouty_snake_case(),
            Self::InterfaceName => {
                let pascal = name.to_upper_camel_case();
                if INTERFACE_NAME.is_match(&pascal) {
                    pascal
                } else {
                    format!("I{pascal}")
                }
            }
        }
    }
}

/// Where the opening brace of a block belongs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BraceStyle {
    /// Opening brace alone on its own line
    Allman,
    /// Opening brace at the end of the line that opens the block
    KAndR,
}

impl BraceStyle {
    /// Check the source line carrying an opening brace
    pub fn matches(self, line: &str) -> bool {
        let line = line.trim();
        // Blocks opened and closed on one line satisfy either style
        if line.ends_with('}') {
            return true;
        }
        match self {
            Self::Allman => line.starts_with('{'),
            Self::KAndR => !line.starts_with('{'),
        }
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Naming(NamingConvention),
    Brace(BraceStyle),
    OneOf(Vec<String>),
    NoneOf(Vec<String>),
    LiteralIn(Vec<f64>),
    Regex(Regex),
}

/// A parsed pattern from a rule definition
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    matcher: Matcher,
}

impl NamePattern {
    /// Parse pattern syntax such as `PascalCase`, `one-of:a|b` or `regex:^m[A-Z]`
    pub fn parse(source: &str) -> StyleResult<Self> {
        let trimmed = source.trim();
        let matcher = match trimmed {
            "PascalCase" => Matcher::Naming(NamingConvention::PascalCase),
            "camelCase" => Matcher::Naming(NamingConvention::CamelCase),
            "_camelCase" => Matcher::Naming(NamingConvention::PrefixedCamelCase),
            "UPPER_SNAKE_CASE" => Matcher::Naming(NamingConvention::UpperSnakeCase),
            "IPascalCase" => Matcher::Naming(NamingConvention::InterfaceName),
            "allman" => Matcher::Brace(BraceStyle::Allman),
            "k&r" | "kr" => Matcher::Brace(BraceStyle::KAndR),
            _ => Self::parse_parameterized(trimmed)?,
        };

        tracing::debug!("Parsed pattern '{}' as {:?}", trimmed, matcher);
        Ok(Self { source: trimmed.to_string(), matcher })
    }

    fn parse_parameterized(source: &str) -> StyleResult<Matcher> {
        let Some((prefix, argument)) = source.split_once(':') else {
            return Err(StyleError::pattern(format!("Unknown pattern syntax '{source}'")));
        };

        let alternatives = || -> StyleResult<Vec<String>> {
            let items: Vec<String> = argument
                .split('|')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if items.is_empty() {
                return Err(StyleError::pattern(format!("Pattern '{source}' lists no alternatives")));
            }
            Ok(items)
        };

        match prefix.trim() {
            "one-of" => Ok(Matcher::OneOf(alternatives()?)),
            "none-of" => Ok(Matcher::NoneOf(alternatives()?)),
            "literal-in" => {
                let values = argument
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| {
                        numeric_value(s).ok_or_else(|| {
                            StyleError::pattern(format!("Invalid number '{s}' in pattern '{source}'"))
                        })
                    })
                    .collect::<StyleResult<Vec<_>>>()?;
                Ok(Matcher::LiteralIn(values))
            }
            "regex" => {
                let regex = Regex::new(&format!("^(?:{argument})$")).map_err(|e| {
                    StyleError::pattern(format!("Invalid regex '{argument}': {e}"))
                })?;
                Ok(Matcher::Regex(regex))
            }
            other => Err(StyleError::pattern(format!(
                "Unknown pattern kind '{other}' in '{source}'"
            ))),
        }
    }

    /// The pattern as written in configuration
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `text` conforms to the pattern
    pub fn matches(&self, text: &str) -> bool {
        match &self.matcher {
            Matcher::Naming(convention) => convention.matches(text),
            Matcher::Brace(style) => style.matches(text),
            Matcher::OneOf(options) => options.iter().any(|o| o == text),
            Matcher::NoneOf(options) => {
                let last_segment = text.rsplit('.').next().unwrap_or(text);
                !options.iter().any(|o| o == text || o == last_segment)
            }
            Matcher::LiteralIn(values) => numeric_value(text)
                .is_some_and(|value| values.iter().any(|v| (v - value).abs() < f64::EPSILON)),
            Matcher::Regex(regex) => regex.is_match(text),
        }
    }

    /// A conforming rename for naming patterns, when it differs from `text`
    pub fn suggest(&self, text: &str) -> Option<String> {
        let Matcher::Naming(convention) = self.matcher else {
            return None;
        };
        let candidate = convention.convert(text);
        (candidate != text && convention.matches(&candidate)).then_some(candidate)
    }

    pub fn naming_convention(&self) -> Option<NamingConvention> {
        match self.matcher {
            Matcher::Naming(convention) => Some(convention),
            _ => None,
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Value of a numeric literal such as `-1`, `0.5f`, `0xFF` or `10_000L`
pub fn numeric_value(literal: &str) -> Option<f64> {
    let literal = literal.trim().replace('_', "");
    let (negative, digits) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, literal.as_str()),
    };

    let lower = digits.to_ascii_lowercase();
    let value = if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex.trim_end_matches(['u', 'l']), 16).ok()? as f64
    } else if let Some(binary) = lower.strip_prefix("0b") {
        u64::from_str_radix(binary.trim_end_matches(['u', 'l']), 2).ok()? as f64
    } else {
        lower.trim_end_matches(['f', 'd', 'm', 'u', 'l']).parse::<f64>().ok()?
    };

    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("PascalCase", "PlayerController", true)]
    #[case("PascalCase", "OnGUI", true)]
    #[case("PascalCase", "playerController", false)]
    #[case("PascalCase", "Player_Controller", false)]
    #[case("camelCase", "moveSpeed", true)]
    #[case("camelCase", "MoveSpeed", false)]
    #[case("_camelCase", "_health", true)]
    #[case("_camelCase", "health", false)]
    #[case("_camelCase", "_Health", false)]
    #[case("_camelCase", "m_health", false)]
    #[case("UPPER_SNAKE_CASE", "MAX_HEALTH", true)]
    #[case("UPPER_SNAKE_CASE", "MAX_HEALTH_2", true)]
    #[case("UPPER_SNAKE_CASE", "MAXHEALTH", false)]
    #[case("UPPER_SNAKE_CASE", "MaxHealth", false)]
    #[case("IPascalCase", "IDamageable", true)]
    #[case("IPascalCase", "Damageable", false)]
    fn test_naming_patterns(#[case] pattern: &str, #[case] name: &str, #[case] expected: bool) {
        let pattern = NamePattern::parse(pattern).unwrap();
        assert_eq!(pattern.matches(name), expected, "{pattern} vs {name}");
    }

    #[rstest]
    #[case("allman", "{", true)]
    #[case("allman", "void Update() {", false)]
    #[case("allman", "public int Health { get { return _health; } }", true)]
    #[case("k&r", "void Update() {", true)]
    #[case("k&r", "{", false)]
    fn test_brace_patterns(#[case] pattern: &str, #[case] line: &str, #[case] expected: bool) {
        assert_eq!(NamePattern::parse(pattern).unwrap().matches(line), expected);
    }

    #[test]
    fn test_one_of_and_none_of() {
        let null_form = NamePattern::parse("one-of:== null|!= null").unwrap();
        assert!(null_form.matches("== null"));
        assert!(!null_form.matches("?."));
        assert!(!null_form.matches("is null"));

        let lookups = NamePattern::parse("none-of:GetComponent|GameObject.Find|FindObjectOfType").unwrap();
        assert!(!lookups.matches("GetComponent"));
        assert!(!lookups.matches("player.GetComponent"));
        assert!(!lookups.matches("GameObject.Find"));
        assert!(lookups.matches("body.AddForce"));
    }

    #[test]
    fn test_literal_in() {
        let allowed = NamePattern::parse("literal-in:0,1,-1,2,0.5").unwrap();
        for literal in ["0", "1", "-1", "2f", "0.5f", "1.0", "0x1", "1L"] {
            assert!(allowed.matches(literal), "{literal} should be allowed");
        }
        for literal in ["10f", "100", "-7", "0.25", "0xFF"] {
            assert!(!allowed.matches(literal), "{literal} should be rejected");
        }
    }

    #[test]
    fn test_regex_pattern_matches_whole_text() {
        let pattern = NamePattern::parse("regex:On[A-Z]\\w*").unwrap();
        assert!(pattern.matches("OnTriggerEnter"));
        assert!(!pattern.matches("HandleOnTrigger"));
    }

    #[rstest]
    #[case("Snake_case")]
    #[case("oneof:a")]
    #[case("one-of:")]
    #[case("literal-in:1,two")]
    #[case("regex:(unclosed")]
    fn test_invalid_patterns(#[case] source: &str) {
        let error = NamePattern::parse(source).unwrap_err();
        assert!(matches!(error, StyleError::Pattern { .. }));
    }

    #[test]
    fn test_suggestions() {
        let field = NamePattern::parse("_camelCase").unwrap();
        assert_eq!(field.suggest("health"), Some("_health".to_string()));
        assert_eq!(field.suggest("MoveSpeed"), Some("_moveSpeed".to_string()));
        assert_eq!(field.suggest("_health"), None);

        let constant = NamePattern::parse("UPPER_SNAKE_CASE").unwrap();
        assert_eq!(constant.suggest("maxHealth"), Some("MAX_HEALTH".to_string()));
        // No word boundary to recover
        assert_eq!(constant.suggest("MAXHEALTH"), None);

        let interface = NamePattern::parse("IPascalCase").unwrap();
        assert_eq!(interface.suggest("damageable"), Some("IDamageable".to_string()));

        assert_eq!(NamePattern::parse("allman").unwrap().suggest("void A() {"), None);
    }

    #[test]
    fn test_numeric_value() {
        assert_eq!(numeric_value("10_000L"), Some(10000.0));
        assert_eq!(numeric_value("0xFF"), Some(255.0));
        assert_eq!(numeric_value("0b101"), Some(5.0));
        assert_eq!(numeric_value("1e3"), Some(1000.0));
        assert_eq!(numeric_value("-2.5f"), Some(-2.5));
        assert_eq!(numeric_value("abc"), None);
    }
}
