//! Fix operations: pure transformations from one model to the next.

use serde::{Deserialize, Serialize};

use crate::schema::{
    normalize_key, title_case, Attribute, Entity, Relationship, SchemaModel, SemanticType,
};
use crate::validation::IssueKind;

/// A change the auto-fix engine can make to a model.
///
/// Indices refer to the model the operation was planned against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FixOperation {
    /// Fold a repeated entity declaration into the first one.
    MergeEntity {
        name: String,
        keep: usize,
        remove: usize,
    },

    /// Declare an entity that relationships refer to.
    AddStubEntity { name: String, primary_key: String },

    /// Rename an entity and every relationship endpoint that names it.
    RenameEntity { index: usize, from: String, to: String },

    /// Remove an attribute.
    DropAttribute {
        entity: usize,
        attribute: usize,
        name: String,
    },

    /// Change an attribute's semantic type.
    RetypeAttribute {
        entity: usize,
        attribute: usize,
        name: String,
        to: SemanticType,
    },

    /// Fold a repeated attribute into the first one.
    MergeAttributes {
        entity: usize,
        keep: usize,
        remove: usize,
        name: String,
    },

    /// Keep one primary key and clear the rest.
    DemotePrimaryKeys {
        entity: usize,
        keep: usize,
        name: String,
    },

    /// Insert a new identifier attribute marked primary key.
    AddPrimaryKey {
        entity: usize,
        entity_name: String,
        name: String,
    },

    /// Mark an existing attribute as primary key.
    PromotePrimaryKey {
        entity: usize,
        attribute: usize,
        name: String,
    },

    /// Rename an attribute.
    RenameAttribute {
        entity: usize,
        attribute: usize,
        from: String,
        to: String,
    },

    /// Remove repeated options from an option set.
    DedupeOptions { option_set: usize, name: String },

    /// Remove a relationship.
    DropRelationship {
        index: usize,
        source: String,
        target: String,
    },

    /// Give a relationship a label.
    LabelRelationship { index: usize, label: String },

    /// Replace a many-to-many relationship with a junction entity and two
    /// one-to-many relationships.
    SynthesizeJunction {
        index: usize,
        source: String,
        target: String,
        junction: String,
        primary_key: String,
        source_key: String,
        source_key_type: SemanticType,
        target_key: String,
        target_key_type: SemanticType,
    },

    /// Add a foreign-key attribute.
    AddForeignKey {
        entity: usize,
        entity_name: String,
        name: String,
        semantic_type: SemanticType,
        references: String,
    },

    /// Mark an existing attribute as foreign key.
    MarkForeignKey {
        entity: usize,
        attribute: usize,
        name: String,
        references: String,
    },
}

/// Merge `other` into `target`, keeping the union of flags and the first
/// non-empty description.
fn merge_attribute(target: &mut Attribute, other: &Attribute) {
    target.is_primary_key |= other.is_primary_key;
    target.is_foreign_key |= other.is_foreign_key;
    target.is_unique |= other.is_unique;
    target.demoted_primary_key |= other.demoted_primary_key;

    if !target.has_description() && other.has_description() {
        target.description = other.description.clone();
    }
    let generic = matches!(target.semantic_type, SemanticType::String | SemanticType::Unknown);
    if generic && !matches!(other.semantic_type, SemanticType::String | SemanticType::Unknown) {
        target.semantic_type = other.semantic_type;
        target.raw_type = other.raw_type.clone();
    }
    if target.option_set.is_none() {
        target.option_set = other.option_set.clone();
    }
}

impl FixOperation {
    /// Get a human-readable description of the operation.
    pub fn description(&self) -> String {
        match self {
            FixOperation::MergeEntity { name, .. } => {
                format!("Merge repeated declaration of '{}' into the first", name)
            }
            FixOperation::AddStubEntity { name, primary_key } => {
                format!("Declare entity '{}' with primary key '{}'", name, primary_key)
            }
            FixOperation::RenameEntity { from, to, .. } => {
                format!("Rename entity '{}' → '{}'", from, to)
            }
            FixOperation::DropAttribute { name, .. } => format!("Drop column '{}'", name),
            FixOperation::RetypeAttribute { name, to, .. } => {
                format!("Change '{}' to {}", name, to)
            }
            FixOperation::MergeAttributes { name, .. } => {
                format!("Merge duplicate column '{}'", name)
            }
            FixOperation::DemotePrimaryKeys { name, .. } => {
                format!("Keep '{}' as the only primary key", name)
            }
            FixOperation::AddPrimaryKey { entity_name, name, .. } => {
                format!("Add primary key '{}' to '{}'", name, entity_name)
            }
            FixOperation::PromotePrimaryKey { name, .. } => {
                format!("Mark '{}' as primary key", name)
            }
            FixOperation::RenameAttribute { from, to, .. } => {
                format!("Rename column '{}' → '{}'", from, to)
            }
            FixOperation::DedupeOptions { name, .. } => {
                format!("Remove repeated options from '{}'", name)
            }
            FixOperation::DropRelationship { source, target, .. } => {
                format!("Remove relationship '{}' → '{}'", source, target)
            }
            FixOperation::LabelRelationship { label, .. } => {
                format!("Label relationship '{}'", label)
            }
            FixOperation::SynthesizeJunction {
                source,
                target,
                junction,
                ..
            } => format!(
                "Replace many-to-many '{}' ↔ '{}' with junction entity '{}'",
                source, target, junction
            ),
            FixOperation::AddForeignKey {
                entity_name,
                name,
                references,
                ..
            } => format!(
                "Add foreign key '{}.{}' referencing '{}'",
                entity_name, name, references
            ),
            FixOperation::MarkForeignKey { name, references, .. } => {
                format!("Mark '{}' as foreign key to '{}'", name, references)
            }
        }
    }

    /// Apply the operation, producing a new model. The input is not modified.
    pub fn apply(&self, model: &SchemaModel) -> SchemaModel {
        let mut next = model.clone();

        match self {
            FixOperation::MergeEntity { keep, remove, .. } => {
                if *keep >= next.entities.len() || *remove >= next.entities.len() || keep == remove {
                    return next;
                }
                let removed = next.entities.remove(*remove);
                let keep = if *remove < *keep { keep - 1 } else { *keep };
                let target = &mut next.entities[keep];
                for attr in removed.attributes {
                    match target.attributes.iter_mut().find(|a| a.key() == attr.key()) {
                        Some(existing) => merge_attribute(existing, &attr),
                        None => target.attributes.push(attr),
                    }
                }
            }

            FixOperation::AddStubEntity { name, primary_key } => {
                if !next.has_entity(name) {
                    let mut entity = Entity::new(name.clone()).with_attributes(vec![
                        Attribute::new(primary_key.clone(), SemanticType::Guid).primary_key(),
                    ]);
                    entity.synthesized = true;
                    next.entities.push(entity);
                }
            }

            FixOperation::RenameEntity { index, from, to } => {
                if let Some(entity) = next.entities.get_mut(*index) {
                    if entity.display_name == title_case(from) {
                        entity.display_name = title_case(to);
                    }
                    entity.name = to.clone();
                    let old = normalize_key(from);
                    for rel in &mut next.relationships {
                        if normalize_key(&rel.source) == old {
                            rel.source = to.clone();
                        }
                        if normalize_key(&rel.target) == old {
                            rel.target = to.clone();
                        }
                    }
                }
            }

            FixOperation::DropAttribute { entity, attribute, .. } => {
                if let Some(e) = next.entities.get_mut(*entity) {
                    if *attribute < e.attributes.len() {
                        e.attributes.remove(*attribute);
                    }
                }
            }

            FixOperation::RetypeAttribute { entity, attribute, to, .. } => {
                if let Some(attr) = next
                    .entities
                    .get_mut(*entity)
                    .and_then(|e| e.attributes.get_mut(*attribute))
                {
                    attr.semantic_type = *to;
                    attr.option_set = None;
                }
            }

            FixOperation::MergeAttributes { entity, keep, remove, .. } => {
                if let Some(e) = next.entities.get_mut(*entity) {
                    if *keep < e.attributes.len() && *remove < e.attributes.len() && keep != remove {
                        let removed = e.attributes.remove(*remove);
                        let keep = if *remove < *keep { keep - 1 } else { *keep };
                        merge_attribute(&mut e.attributes[keep], &removed);
                    }
                }
            }

            FixOperation::DemotePrimaryKeys { entity, keep, .. } => {
                if let Some(e) = next.entities.get_mut(*entity) {
                    for (i, attr) in e.attributes.iter_mut().enumerate() {
                        attr.is_primary_key = i == *keep;
                        attr.demoted_primary_key = false;
                    }
                }
            }

            FixOperation::AddPrimaryKey { entity, name, .. } => {
                if let Some(e) = next.entities.get_mut(*entity) {
                    e.attributes
                        .insert(0, Attribute::new(name.clone(), SemanticType::Guid).primary_key());
                }
            }

            FixOperation::PromotePrimaryKey { entity, attribute, .. } => {
                if let Some(attr) = next
                    .entities
                    .get_mut(*entity)
                    .and_then(|e| e.attributes.get_mut(*attribute))
                {
                    attr.is_primary_key = true;
                }
            }

            FixOperation::RenameAttribute { entity, attribute, to, .. } => {
                if let Some(attr) = next
                    .entities
                    .get_mut(*entity)
                    .and_then(|e| e.attributes.get_mut(*attribute))
                {
                    attr.name = to.clone();
                }
            }

            FixOperation::DedupeOptions { option_set, .. } => {
                if let Some(set) = next.option_sets.get_mut(*option_set) {
                    let mut seen = std::collections::HashSet::new();
                    set.options.retain(|o| seen.insert(normalize_key(&o.label)));
                }
            }

            FixOperation::DropRelationship { index, .. } => {
                if *index < next.relationships.len() {
                    next.relationships.remove(*index);
                }
            }

            FixOperation::LabelRelationship { index, label } => {
                if let Some(rel) = next.relationships.get_mut(*index) {
                    rel.label = label.clone();
                }
            }

            FixOperation::SynthesizeJunction {
                index,
                source,
                target,
                junction,
                primary_key,
                source_key,
                source_key_type,
                target_key,
                target_key_type,
            } => {
                if *index >= next.relationships.len() {
                    return next;
                }
                let original = next.relationships.remove(*index);

                let mut entity = Entity::new(junction.clone()).with_attributes(vec![
                    Attribute::new(primary_key.clone(), SemanticType::Guid).primary_key(),
                    Attribute::new(source_key.clone(), *source_key_type).foreign_key(),
                    Attribute::new(target_key.clone(), *target_key_type).foreign_key(),
                ]);
                entity.synthesized = true;
                next.entities.push(entity);

                let halves = [source, target].map(|side| {
                    let mut rel = Relationship::one_to_many(side.clone(), junction.clone(), original.label.clone());
                    rel.identifying = original.identifying;
                    rel.line = original.line;
                    rel
                });
                next.relationships.splice(*index..*index, halves);
            }

            FixOperation::AddForeignKey {
                entity,
                name,
                semantic_type,
                ..
            } => {
                if let Some(e) = next.entities.get_mut(*entity) {
                    e.attributes
                        .push(Attribute::new(name.clone(), *semantic_type).foreign_key());
                }
            }

            FixOperation::MarkForeignKey { entity, attribute, .. } => {
                if let Some(attr) = next
                    .entities
                    .get_mut(*entity)
                    .and_then(|e| e.attributes.get_mut(*attribute))
                {
                    attr.is_foreign_key = true;
                }
            }
        }

        next
    }
}

/// A planned correction for one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoFix {
    /// Id of the issue this fix resolves.
    pub issue_id: String,
    /// Kind of that issue.
    pub kind: IssueKind,
    /// Description of the change.
    pub description: String,
    /// The transformation.
    pub operation: FixOperation,
}

impl AutoFix {
    /// Create a fix for an issue.
    pub fn new(issue_id: impl Into<String>, kind: IssueKind, operation: FixOperation) -> Self {
        Self {
            issue_id: issue_id.into(),
            kind,
            description: operation.description(),
            operation,
        }
    }

    /// Apply the fix, producing a new model.
    pub fn apply(&self, model: &SchemaModel) -> SchemaModel {
        self.operation.apply(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Cardinality;

    fn pk() -> Attribute {
        Attribute::new("id", SemanticType::Guid).primary_key()
    }

    #[test]
    fn test_apply_does_not_touch_input() {
        let model = SchemaModel::new(vec![Entity::new("A")], vec![]);
        let op = FixOperation::AddPrimaryKey {
            entity: 0,
            entity_name: "A".to_string(),
            name: "id".to_string(),
        };
        let fixed = op.apply(&model);
        assert!(model.entities[0].attributes.is_empty());
        assert!(fixed.entities[0].has_primary_key());
    }

    #[test]
    fn test_merge_attributes_keeps_union() {
        let model = SchemaModel::new(
            vec![Entity::new("A").with_attributes(vec![
                pk(),
                Attribute::new("email", SemanticType::String),
                Attribute::new("Email", SemanticType::Email).with_description("Work address"),
            ])],
            vec![],
        );
        let fixed = FixOperation::MergeAttributes {
            entity: 0,
            keep: 1,
            remove: 2,
            name: "Email".to_string(),
        }
        .apply(&model);

        let attrs = &fixed.entities[0].attributes;
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[1].semantic_type, SemanticType::Email);
        assert_eq!(attrs[1].description.as_deref(), Some("Work address"));
    }

    #[test]
    fn test_rename_entity_rewrites_relationships() {
        let model = SchemaModel::new(
            vec![Entity::new("order-line").with_attributes(vec![pk()])],
            vec![Relationship::one_to_many("ORDER", "order-line", "has")],
        );
        let fixed = FixOperation::RenameEntity {
            index: 0,
            from: "order-line".to_string(),
            to: "order_line".to_string(),
        }
        .apply(&model);
        assert_eq!(fixed.entities[0].name, "order_line");
        assert_eq!(fixed.relationships[0].target, "order_line");
    }

    #[test]
    fn test_synthesize_junction() {
        let mut rel = Relationship::one_to_many("STUDENT", "COURSE", "enrolled_in");
        rel.cardinality = Cardinality::ManyToMany;
        let model = SchemaModel::new(
            vec![
                Entity::new("STUDENT").with_attributes(vec![pk()]),
                Entity::new("COURSE").with_attributes(vec![pk()]),
            ],
            vec![rel],
        );

        let fixed = FixOperation::SynthesizeJunction {
            index: 0,
            source: "STUDENT".to_string(),
            target: "COURSE".to_string(),
            junction: "STUDENT_COURSE".to_string(),
            primary_key: "id".to_string(),
            source_key: "student_id".to_string(),
            source_key_type: SemanticType::Guid,
            target_key: "course_id".to_string(),
            target_key_type: SemanticType::Guid,
        }
        .apply(&model);

        let junction = fixed.entity("STUDENT_COURSE").unwrap();
        assert!(junction.synthesized);
        assert!(junction.attribute("student_id").unwrap().is_foreign_key);
        assert_eq!(fixed.relationships.len(), 2);
        assert!(fixed
            .relationships
            .iter()
            .all(|r| r.cardinality == Cardinality::OneToMany && r.target == "STUDENT_COURSE"));
    }

    #[test]
    fn test_merge_entity() {
        let model = SchemaModel::new(
            vec![
                Entity::new("A").with_attributes(vec![pk()]),
                Entity::new("B").with_attributes(vec![pk()]),
                Entity::new("a").with_attributes(vec![Attribute::new("name", SemanticType::String)]),
            ],
            vec![],
        );
        let fixed = FixOperation::MergeEntity {
            name: "a".to_string(),
            keep: 0,
            remove: 2,
        }
        .apply(&model);
        assert_eq!(fixed.entities.len(), 2);
        assert_eq!(fixed.entities[0].attribute_names(), vec!["id", "name"]);
    }

    #[test]
    fn test_description() {
        let op = FixOperation::DropRelationship {
            index: 1,
            source: "A".to_string(),
            target: "B".to_string(),
        };
        assert_eq!(op.description(), "Remove relationship 'A' → 'B'");
    }
}
