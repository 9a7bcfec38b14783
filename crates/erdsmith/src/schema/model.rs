//! The schema model aggregate: entities, relationships and option sets.

use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::normalize_key;
use super::types::{Cardinality, Multiplicity};

/// A relationship between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Entity written on the left of the markers.
    pub source: String,
    /// Entity written on the right of the markers.
    pub target: String,
    /// Multiplicity on the source side.
    pub source_multiplicity: Multiplicity,
    /// Multiplicity on the target side.
    pub target_multiplicity: Multiplicity,
    /// Resolved cardinality.
    pub cardinality: Cardinality,
    /// Relationship label.
    #[serde(default)]
    pub label: String,
    /// Source and target are the same entity.
    #[serde(default)]
    pub is_self_referencing: bool,
    /// Solid (`--`) rather than dotted (`..`) connector.
    #[serde(default = "default_identifying")]
    pub identifying: bool,
    /// Source line (1-based).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<usize>,
}

fn default_identifying() -> bool {
    true
}

impl Relationship {
    /// Create a one-to-many relationship from `source` to `target`.
    pub fn one_to_many(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            is_self_referencing: normalize_key(&source) == normalize_key(&target),
            source,
            target,
            source_multiplicity: Multiplicity::ExactlyOne,
            target_multiplicity: Multiplicity::ZeroOrMore,
            cardinality: Cardinality::OneToMany,
            label: label.into(),
            identifying: true,
            line: None,
        }
    }

    /// The entity on the "one" side, when the cardinality has one.
    pub fn referenced_entity(&self) -> Option<&str> {
        match self.cardinality {
            Cardinality::OneToMany => Some(&self.source),
            Cardinality::ManyToOne => Some(&self.target),
            Cardinality::ManyToMany => None,
        }
    }

    /// The entity on the "many" side, when the cardinality has one "one" side.
    pub fn referencing_entity(&self) -> Option<&str> {
        match self.cardinality {
            Cardinality::OneToMany => Some(&self.target),
            Cardinality::ManyToOne => Some(&self.source),
            Cardinality::ManyToMany => None,
        }
    }

    /// Returns true if both ends are the given entities, in either order.
    pub fn connects(&self, a: &str, b: &str) -> bool {
        let (s, t) = (normalize_key(&self.source), normalize_key(&self.target));
        let (a, b) = (normalize_key(a), normalize_key(b));
        (s == a && t == b) || (s == b && t == a)
    }

    /// Render the relationship back into diagram syntax.
    pub fn to_diagram_line(&self) -> String {
        let connector = if self.identifying { "--" } else { ".." };
        let mut line = format!(
            "{} {}{}{} {}",
            self.source,
            self.source_multiplicity.left_marker(),
            connector,
            self.target_multiplicity.right_marker(),
            self.target
        );
        if !self.label.is_empty() {
            line.push_str(&format!(" : \"{}\"", self.label));
        }
        line
    }
}

/// One option of an option set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionValue {
    /// Display label.
    pub label: String,
    /// Numeric value; assigned on export when absent.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<i64>,
}

impl OptionValue {
    /// Create an option without an explicit value.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
        }
    }
}

/// A named, reusable option set ("global choice").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSet {
    /// Option set name.
    pub name: String,
    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub display_name: Option<String>,
    /// Options in declaration order.
    #[serde(default)]
    pub options: Vec<OptionValue>,
}

impl OptionSet {
    /// Create an option set from labels.
    pub fn from_labels<I, S>(name: impl Into<String>, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            display_name: None,
            options: labels.into_iter().map(OptionValue::new).collect(),
        }
    }
}

/// The aggregate root of a compiled diagram.
///
/// Values are never mutated in place by the pipeline: each fix produces a new
/// model from the previous one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SchemaModel {
    /// Entities in declaration order.
    pub entities: Vec<Entity>,
    /// Relationships in declaration order.
    pub relationships: Vec<Relationship>,
    /// Option set definitions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub option_sets: Vec<OptionSet>,
}

impl SchemaModel {
    /// Create a model from entities and relationships.
    pub fn new(entities: Vec<Entity>, relationships: Vec<Relationship>) -> Self {
        Self {
            entities,
            relationships,
            option_sets: Vec::new(),
        }
    }

    /// Set the option sets.
    pub fn with_option_sets(mut self, option_sets: Vec<OptionSet>) -> Self {
        self.option_sets = option_sets;
        self
    }

    /// Find an entity by case-insensitive name.
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        let key = normalize_key(name);
        self.entities.iter().find(|e| e.key() == key)
    }

    /// Position of an entity by case-insensitive name.
    pub fn entity_index(&self, name: &str) -> Option<usize> {
        let key = normalize_key(name);
        self.entities.iter().position(|e| e.key() == key)
    }

    /// Returns true if an entity with this name exists.
    pub fn has_entity(&self, name: &str) -> bool {
        self.entity_index(name).is_some()
    }

    /// Find an option set by case-insensitive name.
    pub fn option_set(&self, name: &str) -> Option<&OptionSet> {
        let key = normalize_key(name);
        self.option_sets.iter().find(|o| normalize_key(&o.name) == key)
    }

    /// Get all entity names.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.name.as_str()).collect()
    }

    /// Relationships touching the given entity.
    pub fn relationships_of<'a>(&'a self, entity: &str) -> impl Iterator<Item = &'a Relationship> {
        let key = normalize_key(entity);
        self.relationships.iter().filter(move |r| {
            normalize_key(&r.source) == key || normalize_key(&r.target) == key
        })
    }

    /// Total number of attributes across all entities.
    pub fn attribute_count(&self) -> usize {
        self.entities.iter().map(|e| e.attributes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, SemanticType};

    #[test]
    fn test_relationship_sides() {
        let rel = Relationship::one_to_many("CUSTOMER", "ORDER", "places");
        assert_eq!(rel.referenced_entity(), Some("CUSTOMER"));
        assert_eq!(rel.referencing_entity(), Some("ORDER"));
        assert!(!rel.is_self_referencing);
        assert!(rel.connects("order", "customer"));
    }

    #[test]
    fn test_diagram_line() {
        let rel = Relationship::one_to_many("A", "B", "has");
        assert_eq!(rel.to_diagram_line(), "A ||--o{ B : \"has\"");
    }

    #[test]
    fn test_entity_lookup() {
        let model = SchemaModel::new(
            vec![Entity::new("Customer")
                .with_attributes(vec![Attribute::new("id", SemanticType::Guid).primary_key()])],
            vec![],
        );
        assert!(model.has_entity("CUSTOMER"));
        assert_eq!(model.entity_index("customer"), Some(0));
        assert_eq!(model.attribute_count(), 1);
    }
}
