//! Cardinality classification of relationship declarations.

use crate::input::RelationshipDecl;
use crate::schema::{normalize_key, Cardinality, Multiplicity, Relationship};

/// Turns parsed relationship lines into model relationships.
#[derive(Debug, Clone, Default)]
pub struct RelationshipResolver;

impl RelationshipResolver {
    /// Create a new resolver.
    pub fn new() -> Self {
        Self
    }

    /// Classify a marker pair read from left to right.
    ///
    /// Both sides "one" has no direct representation and resolves to
    /// one-to-many; see [`is_one_to_one`].
    pub fn classify(left: Multiplicity, right: Multiplicity) -> Cardinality {
        match (left.is_many(), right.is_many()) {
            (true, true) => Cardinality::ManyToMany,
            (true, false) => Cardinality::ManyToOne,
            (false, _) => Cardinality::OneToMany,
        }
    }

    /// Resolve one declaration.
    pub fn resolve_one(&self, decl: &RelationshipDecl) -> Relationship {
        Relationship {
            source: decl.left.clone(),
            target: decl.right.clone(),
            source_multiplicity: decl.left_multiplicity,
            target_multiplicity: decl.right_multiplicity,
            cardinality: Self::classify(decl.left_multiplicity, decl.right_multiplicity),
            label: decl.label.clone().unwrap_or_default(),
            is_self_referencing: normalize_key(&decl.left) == normalize_key(&decl.right),
            identifying: decl.identifying,
            line: Some(decl.line),
        }
    }

    /// Resolve every declaration, preserving order. Duplicates are kept so the
    /// validator can report them.
    pub fn resolve(&self, decls: &[RelationshipDecl]) -> Vec<Relationship> {
        decls.iter().map(|d| self.resolve_one(d)).collect()
    }
}

/// Returns true if a relationship was written with "one" on both sides.
pub fn is_one_to_one(rel: &Relationship) -> bool {
    !rel.source_multiplicity.is_many() && !rel.target_multiplicity.is_many()
}
