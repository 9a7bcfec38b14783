//! Core type definitions for schema representation.

use serde::{Deserialize, Serialize};

/// Semantic type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Short single-line text.
    String,
    /// Long multi-line text.
    Text,
    /// Whole numbers.
    Integer,
    /// Fixed-precision numbers.
    Decimal,
    /// Floating-point numbers.
    Float,
    /// Monetary amounts.
    Money,
    /// Boolean values (true/false).
    Boolean,
    /// Date and time.
    DateTime,
    /// Date only (no time component).
    Date,
    /// Email address.
    Email,
    /// Phone number.
    Phone,
    /// Web address.
    Url,
    /// Value from a named option set.
    Choice,
    /// Globally unique identifier.
    Guid,
    /// Type keyword not recognized.
    Unknown,
}

impl SemanticType {
    /// Get the lowercase keyword used in diagrams and reports.
    pub fn keyword(&self) -> &'static str {
        match self {
            SemanticType::String => "string",
            SemanticType::Text => "text",
            SemanticType::Integer => "integer",
            SemanticType::Decimal => "decimal",
            SemanticType::Float => "float",
            SemanticType::Money => "money",
            SemanticType::Boolean => "boolean",
            SemanticType::DateTime => "datetime",
            SemanticType::Date => "date",
            SemanticType::Email => "email",
            SemanticType::Phone => "phone",
            SemanticType::Url => "url",
            SemanticType::Choice => "choice",
            SemanticType::Guid => "guid",
            SemanticType::Unknown => "unknown",
        }
    }

    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            SemanticType::Integer | SemanticType::Decimal | SemanticType::Float | SemanticType::Money
        )
    }

    /// Returns true if this type is stored as text.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            SemanticType::String
                | SemanticType::Text
                | SemanticType::Email
                | SemanticType::Phone
                | SemanticType::Url
        )
    }
}

impl Default for SemanticType {
    fn default() -> Self {
        SemanticType::String
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One half of a cardinality marker pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Multiplicity {
    /// `||`
    ExactlyOne,
    /// `|o` / `o|`
    ZeroOrOne,
    /// `}|` / `|{`
    OneOrMore,
    /// `}o` / `o{`
    ZeroOrMore,
}

impl Multiplicity {
    /// Parse a marker written on the left side of the connector.
    pub fn from_left_marker(marker: &str) -> Option<Self> {
        match marker {
            "||" => Some(Multiplicity::ExactlyOne),
            "|o" => Some(Multiplicity::ZeroOrOne),
            "}|" => Some(Multiplicity::OneOrMore),
            "}o" => Some(Multiplicity::ZeroOrMore),
            _ => None,
        }
    }

    /// Parse a marker written on the right side of the connector.
    pub fn from_right_marker(marker: &str) -> Option<Self> {
        match marker {
            "||" => Some(Multiplicity::ExactlyOne),
            "o|" => Some(Multiplicity::ZeroOrOne),
            "|{" => Some(Multiplicity::OneOrMore),
            "o{" => Some(Multiplicity::ZeroOrMore),
            _ => None,
        }
    }

    /// Marker text when written on the left side.
    pub fn left_marker(&self) -> &'static str {
        match self {
            Multiplicity::ExactlyOne => "||",
            Multiplicity::ZeroOrOne => "|o",
            Multiplicity::OneOrMore => "}|",
            Multiplicity::ZeroOrMore => "}o",
        }
    }

    /// Marker text when written on the right side.
    pub fn right_marker(&self) -> &'static str {
        match self {
            Multiplicity::ExactlyOne => "||",
            Multiplicity::ZeroOrOne => "o|",
            Multiplicity::OneOrMore => "|{",
            Multiplicity::ZeroOrMore => "o{",
        }
    }

    /// Returns true if this side admits more than one row.
    pub fn is_many(&self) -> bool {
        matches!(self, Multiplicity::OneOrMore | Multiplicity::ZeroOrMore)
    }
}

/// Resolved cardinality of a relationship, read from source to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// One source row relates to many target rows.
    OneToMany,
    /// Many source rows relate to one target row.
    ManyToOne,
    /// Many on both sides; must be resolved through a junction entity.
    ManyToMany,
}

impl Cardinality {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Cardinality::OneToMany => "one-to-many",
            Cardinality::ManyToOne => "many-to-one",
            Cardinality::ManyToMany => "many-to-many",
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_sides() {
        assert_eq!(Multiplicity::from_left_marker("}o"), Some(Multiplicity::ZeroOrMore));
        assert_eq!(Multiplicity::from_right_marker("o{"), Some(Multiplicity::ZeroOrMore));
        // Left-only spelling is not valid on the right.
        assert_eq!(Multiplicity::from_right_marker("}o"), None);
        assert_eq!(Multiplicity::from_right_marker("o|"), Some(Multiplicity::ZeroOrOne));
    }

    #[test]
    fn test_marker_text_roundtrip() {
        for m in [
            Multiplicity::ExactlyOne,
            Multiplicity::ZeroOrOne,
            Multiplicity::OneOrMore,
            Multiplicity::ZeroOrMore,
        ] {
            assert_eq!(Multiplicity::from_left_marker(m.left_marker()), Some(m));
            assert_eq!(Multiplicity::from_right_marker(m.right_marker()), Some(m));
        }
    }

    #[test]
    fn test_type_keywords() {
        assert_eq!(SemanticType::DateTime.to_string(), "datetime");
        assert!(SemanticType::Money.is_numeric());
        assert!(SemanticType::Email.is_textual());
        assert!(!SemanticType::Guid.is_textual());
    }
}
