//! Entity and attribute definitions.

use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};

use super::types::SemanticType;
use super::normalize_key;

fn is_false(value: &bool) -> bool {
    !*value
}

/// A single attribute (column) of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name as written in the diagram.
    pub name: String,
    /// Semantic type after inference.
    pub semantic_type: SemanticType,
    /// Type keyword as written, when one was given.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub raw_type: Option<String>,
    /// Marked `PK`.
    #[serde(default)]
    pub is_primary_key: bool,
    /// Marked `FK`.
    #[serde(default)]
    pub is_foreign_key: bool,
    /// Marked `UK`.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_unique: bool,
    /// Free-text description.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub description: Option<String>,
    /// Option set bound to a choice attribute.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub option_set: Option<String>,
    /// Declared `PK` but demoted because an earlier attribute already was.
    #[serde(default, skip_serializing_if = "is_false")]
    pub demoted_primary_key: bool,
    /// Source line (1-based).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<usize>,
}

impl Attribute {
    /// Create a plain attribute.
    pub fn new(name: impl Into<String>, semantic_type: SemanticType) -> Self {
        Self {
            name: name.into(),
            semantic_type,
            raw_type: None,
            is_primary_key: false,
            is_foreign_key: false,
            is_unique: false,
            description: None,
            option_set: None,
            demoted_primary_key: false,
            line: None,
        }
    }

    /// Mark as primary key.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Mark as foreign key.
    pub fn foreign_key(mut self) -> Self {
        self.is_foreign_key = true;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the source line.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Trimmed, lowercased comparison key.
    pub fn key(&self) -> String {
        normalize_key(&self.name)
    }

    /// Returns true if the description carries any text.
    pub fn has_description(&self) -> bool {
        self.description.as_deref().is_some_and(|d| !d.trim().is_empty())
    }
}

/// An entity (table) in the diagram.
///
/// Serializes with a derived `has_primary_key` flag; the flag is ignored when reading.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Entity {
    /// Entity name as written in the diagram.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Attributes in declaration order.
    pub attributes: Vec<Attribute>,
    /// Source line of the declaration.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<usize>,
    /// Created by the auto-fix engine rather than declared.
    #[serde(default, skip_serializing_if = "is_false")]
    pub synthesized: bool,
}

impl Entity {
    /// Create an entity with a display name derived from its identifier.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: super::title_case(&name),
            name,
            attributes: Vec::new(),
            line: None,
            synthesized: false,
        }
    }

    /// Set the attributes.
    pub fn with_attributes(mut self, attributes: Vec<Attribute>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Whether any attribute is marked primary key.
    pub fn has_primary_key(&self) -> bool {
        self.attributes.iter().any(|a| a.is_primary_key)
    }

    /// The first primary-key attribute.
    pub fn primary_key(&self) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.is_primary_key)
    }

    /// Find an attribute by case-insensitive name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        let key = normalize_key(name);
        self.attributes.iter().find(|a| a.key() == key)
    }

    /// Trimmed, lowercased comparison key.
    pub fn key(&self) -> String {
        normalize_key(&self.name)
    }

    /// Get all attribute names.
    pub fn attribute_names(&self) -> Vec<&str> {
        self.attributes.iter().map(|a| a.name.as_str()).collect()
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Entity", 6)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("display_name", &self.display_name)?;
        state.serialize_field("attributes", &self.attributes)?;
        state.serialize_field("has_primary_key", &self.has_primary_key())?;
        match self.line {
            Some(line) => state.serialize_field("line", &line)?,
            None => state.skip_field("line")?,
        }
        if self.synthesized {
            state.serialize_field("synthesized", &true)?;
        } else {
            state.skip_field("synthesized")?;
        }
        state.end()
    }
}
