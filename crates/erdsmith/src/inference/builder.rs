//! Builds the typed schema model from parsed declarations.

use tracing::debug;

use crate::input::{AttributeLine, EntityDecl, KeyMarker, ParsedDocument};
use crate::schema::{normalize_key, title_case, Attribute, Entity, OptionSet, SchemaModel, SemanticType};

use super::heuristics::infer_type;
use super::relationship::RelationshipResolver;

/// Converts a [`ParsedDocument`] into a [`SchemaModel`].
///
/// The builder only reshapes what was written. Problems such as missing keys
/// or dangling relationship endpoints are left for the validator to report.
#[derive(Debug, Clone, Default)]
pub struct EntityModelBuilder {
    option_sets: Vec<OptionSet>,
    resolver: RelationshipResolver,
}

impl EntityModelBuilder {
    /// Create a builder with no option sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Option sets that choice attributes may bind to.
    pub fn with_option_sets(mut self, option_sets: Vec<OptionSet>) -> Self {
        self.option_sets = option_sets;
        self
    }

    /// Build the model.
    pub fn build(&self, document: &ParsedDocument) -> SchemaModel {
        let entities: Vec<Entity> = document.entities.iter().map(|d| self.build_entity(d)).collect();
        let relationships = self.resolver.resolve(&document.relationships);

        debug!(
            entities = entities.len(),
            relationships = relationships.len(),
            "Built schema model"
        );

        SchemaModel::new(entities, relationships).with_option_sets(self.option_sets.clone())
    }

    fn build_entity(&self, decl: &EntityDecl) -> Entity {
        let mut seen_pk = false;
        let attributes = decl
            .attributes
            .iter()
            .map(|line| {
                let mut attr = self.build_attribute(&decl.name, line);
                if attr.is_primary_key {
                    if seen_pk {
                        attr.is_primary_key = false;
                        attr.demoted_primary_key = true;
                    }
                    seen_pk = true;
                }
                attr
            })
            .collect();

        let mut entity = Entity::new(decl.name.clone()).with_attributes(attributes);
        entity.display_name = decl
            .alias
            .clone()
            .unwrap_or_else(|| title_case(&decl.name));
        entity.line = Some(decl.line_start);
        entity
    }

    fn build_attribute(&self, entity: &str, line: &AttributeLine) -> Attribute {
        let semantic_type = infer_type(line.type_keyword.as_deref(), &line.name);
        let mut attr = Attribute::new(line.name.clone(), semantic_type).at_line(line.line);
        attr.raw_type = line.type_keyword.clone();
        attr.is_primary_key = line.has_key(KeyMarker::Pk);
        attr.is_foreign_key = line.has_key(KeyMarker::Fk);
        attr.is_unique = line.has_key(KeyMarker::Uk);
        attr.description = line.comment.clone();

        if semantic_type == SemanticType::Choice {
            attr.option_set = self.bind_option_set(entity, &line.name);
        }
        attr
    }

    /// Find the option set named after the attribute, or `entity_attribute`.
    fn bind_option_set(&self, entity: &str, attribute: &str) -> Option<String> {
        let direct = normalize_key(attribute);
        let qualified = normalize_key(&format!("{}_{}", entity, attribute));
        self.option_sets
            .iter()
            .find(|o| normalize_key(&o.name) == direct)
            .or_else(|| self.option_sets.iter().find(|o| normalize_key(&o.name) == qualified))
            .map(|o| o.name.clone())
    }
}
