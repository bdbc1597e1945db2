//! Identifiers and other checked constructs extracted from source text

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of construct a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstructKind {
    Class,
    Struct,
    Interface,
    Enum,
    EnumMember,
    Method,
    Property,
    Field,
    Constant,
    Parameter,
    Local,
    /// Opening brace of a declaration or control-flow block
    #[serde(alias = "brace-style")]
    Brace,
    /// Number literal inside a method body
    NumericLiteral,
    /// A null test such as `== null` or `?.`
    NullCheck,
    /// Call made from a per-frame callback
    HotPathCall,
    /// `tag ==` comparison or `CompareTag` call
    TagComparison,
}

impl ConstructKind {
    pub const ALL: [ConstructKind; 16] = [
        Self::Class,
        Self::Struct,
        Self::Interface,
        Self::Enum,
        Self::EnumMember,
        Self::Method,
        Self::Property,
        Self::Field,
        Self::Constant,
        Self::Parameter,
        Self::Local,
        Self::Brace,
        Self::NumericLiteral,
        Self::NullCheck,
        Self::HotPathCall,
        Self::TagComparison,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::EnumMember => "enum-member",
            Self::Method => "method",
            Self::Property => "property",
            Self::Field => "field",
            Self::Constant => "constant",
            Self::Parameter => "parameter",
            Self::Local => "local",
            Self::Brace => "brace",
            Self::NumericLiteral => "numeric-literal",
            Self::NullCheck => "null-check",
            Self::HotPathCall => "hot-path-call",
            Self::TagComparison => "tag-comparison",
        }
    }

    /// Whether the construct is a declared name (as opposed to a code shape)
    pub fn is_declaration(self) -> bool {
        !matches!(
            self,
            Self::Brace
                | Self::NumericLiteral
                | Self::NullCheck
                | Self::HotPathCall
                | Self::TagComparison
        )
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared accessibility of a type or member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Protected,
    Internal,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Internal => "internal",
            Self::Private => "private",
        }
    }

    /// Resolve a run of modifier keywords, falling back to `default`
    pub fn from_modifiers<'a>(modifiers: impl IntoIterator<Item = &'a str>, default: Self) -> Self {
        let mut resolved: Option<Self> = None;
        for modifier in modifiers {
            let next = match modifier {
                "public" => Self::Public,
                "protected" => Self::Protected,
                "internal" => Self::Internal,
                "private" => Self::Private,
                _ => continue,
            };
            // `protected internal` and `private protected` both widen to protected
            resolved = Some(match (resolved, next) {
                (Some(Self::Protected), _) | (Some(_), Self::Protected) => Self::Protected,
                _ => next,
            });
        }
        resolved.unwrap_or(default)
    }
}

/// A named program construct (or code shape) extracted from source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifier {
    /// Declared name, or the construct text for code shapes
    pub name: String,
    pub kind: ConstructKind,
    /// Accessibility for type and member declarations
    pub visibility: Option<Visibility>,
    pub line: u32,
    pub column: u32,
    /// Trimmed source line the construct appears on
    pub context: String,
}

impl Identifier {
    pub fn new(name: impl Into<String>, kind: ConstructKind, line: u32, column: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            visibility: None,
            line,
            column,
            context: String::new(),
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_from_modifiers() {
        assert_eq!(
            Visibility::from_modifiers(["static", "readonly"], Visibility::Private),
            Visibility::Private
        );
        assert_eq!(
            Visibility::from_modifiers(["public", "static"], Visibility::Private),
            Visibility::Public
        );
        assert_eq!(
            Visibility::from_modifiers(["protected", "internal"], Visibility::Private),
            Visibility::Protected
        );
        assert_eq!(
            Visibility::from_modifiers(["private", "protected"], Visibility::Private),
            Visibility::Protected
        );
    }

    #[test]
    fn test_construct_kind_serde_names() {
        let kind: ConstructKind = serde_yaml::from_str("enum-member").unwrap();
        assert_eq!(kind, ConstructKind::EnumMember);

        let kind: ConstructKind = serde_yaml::from_str("brace-style").unwrap();
        assert_eq!(kind, ConstructKind::Brace);

        for kind in ConstructKind::ALL {
            let yaml = serde_yaml::to_string(&kind).unwrap();
            assert_eq!(yaml.trim(), kind.as_str());
        }
    }
}
