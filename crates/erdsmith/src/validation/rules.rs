//! The validation rule catalog.
//!
//! Every rule is a pure function of the model and the rule context. Rules do
//! not look at each other's output, so catalog order only affects the order of
//! issues within a severity level.

use std::collections::{HashMap, HashSet};

use crate::inference::is_one_to_one;
use crate::schema::{compact_key, normalize_key, Cardinality, Entity, Relationship, SchemaModel, SemanticType};

use super::issue::{IssueKind, Subject, ValidationIssue};
use super::naming::NamingPolicy;

/// Settings shared by all rules.
#[derive(Debug, Clone)]
pub struct RuleContext {
    /// Naming policy.
    pub naming: NamingPolicy,
    /// Many-to-many patterns are resolved by junction synthesis.
    pub synthesize_junctions: bool,
}

impl Default for RuleContext {
    fn default() -> Self {
        Self {
            naming: NamingPolicy::default(),
            synthesize_junctions: true,
        }
    }
}

/// Trait for validation rules.
pub trait Rule: Send + Sync {
    /// Rule name, recorded on every issue it raises.
    fn name(&self) -> &'static str;

    /// Check the model and return issues.
    fn check(&self, model: &SchemaModel, ctx: &RuleContext) -> Vec<ValidationIssue>;
}

fn entity_subject(entity: &Entity, index: usize) -> Subject {
    Subject::entity(entity.name.clone(), index)
}

fn attribute_subject(entity: &Entity, entity_index: usize, attr_index: usize) -> Subject {
    Subject::Attribute {
        entity: entity.name.clone(),
        attribute: entity.attributes[attr_index].name.clone(),
        entity_index,
        index: attr_index,
    }
}

fn relationship_subject(rel: &Relationship, index: usize) -> Subject {
    Subject::Relationship {
        source: rel.source.clone(),
        target: rel.target.clone(),
        label: rel.label.clone(),
        index,
    }
}

/// Entities must carry at least one attribute.
pub struct EmptyEntityRule;

impl Rule for EmptyEntityRule {
    fn name(&self) -> &'static str {
        "empty_entity"
    }

    fn check(&self, model: &SchemaModel, _ctx: &RuleContext) -> Vec<ValidationIssue> {
        model
            .entities
            .iter()
            .enumerate()
            .filter(|(_, e)| e.attributes.is_empty())
            .map(|(i, e)| {
                ValidationIssue::new(
                    IssueKind::EmptyEntity,
                    entity_subject(e, i),
                    format!("Entity '{}' has no attributes", e.name),
                )
                .with_line(e.line)
            })
            .collect()
    }
}

/// Exactly one primary key per entity.
pub struct PrimaryKeyRule;

impl Rule for PrimaryKeyRule {
    fn name(&self) -> &'static str {
        "primary_key"
    }

    fn check(&self, model: &SchemaModel, _ctx: &RuleContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (i, entity) in model.entities.iter().enumerate() {
            let declared = entity
                .attributes
                .iter()
                .filter(|a| a.is_primary_key || a.demoted_primary_key)
                .count();

            if declared == 0 {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::MissingPrimaryKey,
                        entity_subject(entity, i),
                        format!("Entity '{}' has no primary key", entity.name),
                    )
                    .with_line(entity.line),
                );
            } else if declared > 1 {
                let names: Vec<&str> = entity
                    .attributes
                    .iter()
                    .filter(|a| a.is_primary_key || a.demoted_primary_key)
                    .map(|a| a.name.as_str())
                    .collect();
                issues.push(
                    ValidationIssue::new(
                        IssueKind::MultiplePrimaryKeys,
                        entity_subject(entity, i),
                        format!(
                            "Entity '{}' declares {} primary keys ({}); only '{}' is kept",
                            entity.name,
                            declared,
                            names.join(", "),
                            names[0]
                        ),
                    )
                    .with_line(entity.line),
                );
            }
        }

        issues
    }
}

/// Attribute names are unique within an entity.
pub struct DuplicateColumnRule;

impl Rule for DuplicateColumnRule {
    fn name(&self) -> &'static str {
        "duplicate_columns"
    }

    fn check(&self, model: &SchemaModel, _ctx: &RuleContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (ei, entity) in model.entities.iter().enumerate() {
            let mut seen: HashMap<String, usize> = HashMap::new();
            for (ai, attr) in entity.attributes.iter().enumerate() {
                match seen.get(&attr.key()) {
                    Some(&first) => issues.push(
                        ValidationIssue::new(
                            IssueKind::DuplicateColumns,
                            attribute_subject(entity, ei, ai),
                            format!(
                                "Attribute '{}' of '{}' duplicates '{}'",
                                attr.name, entity.name, entity.attributes[first].name
                            ),
                        )
                        .with_line(attr.line),
                    ),
                    None => {
                        seen.insert(attr.key(), ai);
                    }
                }
            }
        }

        issues
    }
}

/// Entity names are unique within the model.
pub struct DuplicateEntityRule;

impl Rule for DuplicateEntityRule {
    fn name(&self) -> &'static str {
        "duplicate_entity"
    }

    fn check(&self, model: &SchemaModel, _ctx: &RuleContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for (i, entity) in model.entities.iter().enumerate() {
            if !seen.insert(entity.key()) {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::DuplicateEntity,
                        entity_subject(entity, i),
                        format!("Entity '{}' is declared more than once", entity.name),
                    )
                    .with_line(entity.line),
                );
            }
        }

        issues
    }
}

/// Entity names follow the naming policy.
pub struct EntityNameRule;

impl Rule for EntityNameRule {
    fn name(&self) -> &'static str {
        "entity_name"
    }

    fn check(&self, model: &SchemaModel, ctx: &RuleContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let max = ctx.naming.max_entity_len();

        for (i, entity) in model.entities.iter().enumerate() {
            let subject = entity_subject(entity, i);

            if !NamingPolicy::is_valid_name(&entity.name) {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::InvalidEntityName,
                        subject.clone(),
                        format!(
                            "Entity name '{}' must start with a letter and contain only letters, digits and underscores",
                            entity.name
                        ),
                    )
                    .with_line(entity.line),
                );
            }

            let length = entity.name.chars().count();
            if length > max {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::EntityNameTooLong,
                        subject.clone(),
                        format!(
                            "Entity name '{}' is {} characters long (limit {})",
                            entity.name, length, max
                        ),
                    )
                    .with_line(entity.line),
                );
            }

            if ctx.naming.is_reserved_entity(&entity.name) {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::ReservedEntityName,
                        subject,
                        format!("Entity name '{}' is reserved by the platform", entity.name),
                    )
                    .with_line(entity.line),
                );
            }
        }

        issues
    }
}

/// Attribute names follow the naming policy.
pub struct AttributeNameRule;

impl Rule for AttributeNameRule {
    fn name(&self) -> &'static str {
        "attribute_name"
    }

    fn check(&self, model: &SchemaModel, ctx: &RuleContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let max = ctx.naming.max_attribute_len();

        for (ei, entity) in model.entities.iter().enumerate() {
            for (ai, attr) in entity.attributes.iter().enumerate() {
                let subject = attribute_subject(entity, ei, ai);

                if !NamingPolicy::is_valid_name(&attr.name) {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::InvalidAttributeName,
                            subject.clone(),
                            format!("Attribute name '{}.{}' is not a valid identifier", entity.name, attr.name),
                        )
                        .with_line(attr.line),
                    );
                }

                let length = attr.name.chars().count();
                if length > max {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::AttributeNameTooLong,
                            subject.clone(),
                            format!(
                                "Attribute name '{}.{}' is {} characters long (limit {})",
                                entity.name, attr.name, length, max
                            ),
                        )
                        .with_line(attr.line),
                    );
                }

                if NamingPolicy::is_reserved_attribute(&attr.name) {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::ReservedAttributeName,
                            subject,
                            format!(
                                "Attribute '{}.{}' collides with a platform-managed column",
                                entity.name, attr.name
                            ),
                        )
                        .with_line(attr.line),
                    );
                }
            }
        }

        issues
    }
}

/// Status-like columns give way to built-in state handling.
pub struct StatusColumnRule;

impl Rule for StatusColumnRule {
    fn name(&self) -> &'static str {
        "status_column"
    }

    fn check(&self, model: &SchemaModel, _ctx: &RuleContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (ei, entity) in model.entities.iter().enumerate() {
            for (ai, attr) in entity.attributes.iter().enumerate() {
                let status_like = NamingPolicy::is_status_column(&attr.name)
                    || (compact_key(&attr.name) == "state" && attr.semantic_type == SemanticType::Choice);
                if status_like
                    && !attr.is_primary_key
                    && !attr.is_foreign_key
                {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::StatusColumnIgnored,
                            attribute_subject(entity, ei, ai),
                            format!(
                                "Column '{}.{}' is dropped in favor of built-in status handling",
                                entity.name, attr.name
                            ),
                        )
                        .with_line(attr.line),
                    );
                }
            }
        }

        issues
    }
}

/// Choice attributes need an option set that exists.
pub struct ChoiceRule;

impl Rule for ChoiceRule {
    fn name(&self) -> &'static str {
        "choice"
    }

    fn check(&self, model: &SchemaModel, _ctx: &RuleContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (ei, entity) in model.entities.iter().enumerate() {
            for (ai, attr) in entity.attributes.iter().enumerate() {
                if attr.semantic_type != SemanticType::Choice {
                    continue;
                }
                let bound = attr
                    .option_set
                    .as_deref()
                    .is_some_and(|name| model.option_set(name).is_some());
                if !bound {
                    issues.push(
                        ValidationIssue::new(
                            IssueKind::ChoiceDowngraded,
                            attribute_subject(entity, ei, ai),
                            format!(
                                "Choice column '{}.{}' has no option set and becomes text",
                                entity.name, attr.name
                            ),
                        )
                        .with_line(attr.line),
                    );
                }
            }
        }

        issues
    }
}

/// Option sets have options, each listed once.
pub struct OptionSetRule;

impl Rule for OptionSetRule {
    fn name(&self) -> &'static str {
        "option_set"
    }

    fn check(&self, model: &SchemaModel, _ctx: &RuleContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (i, set) in model.option_sets.iter().enumerate() {
            let subject = Subject::OptionSet {
                name: set.name.clone(),
                index: i,
            };

            if set.options.is_empty() {
                issues.push(ValidationIssue::new(
                    IssueKind::EmptyOptionSet,
                    subject,
                    format!("Option set '{}' has no options", set.name),
                ));
                continue;
            }

            let mut seen = HashSet::new();
            for option in &set.options {
                if !seen.insert(normalize_key(&option.label)) {
                    issues.push(ValidationIssue::new(
                        IssueKind::DuplicateOption,
                        subject.clone(),
                        format!("Option '{}' appears more than once in '{}'", option.label, set.name),
                    ));
                }
            }
        }

        issues
    }
}

/// Relationship endpoints must be declared entities.
pub struct MissingEntityRule;

impl Rule for MissingEntityRule {
    fn name(&self) -> &'static str {
        "missing_entity"
    }

    fn check(&self, model: &SchemaModel, _ctx: &RuleContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut reported = HashSet::new();

        for rel in &model.relationships {
            for name in [&rel.source, &rel.target] {
                if model.has_entity(name) || !reported.insert(normalize_key(name)) {
                    continue;
                }
                issues.push(
                    ValidationIssue::new(
                        IssueKind::MissingEntity,
                        Subject::Entity {
                            entity: name.clone(),
                            index: None,
                        },
                        format!("Entity '{}' is used in a relationship but never declared", name),
                    )
                    .with_line(rel.line),
                );
            }
        }

        issues
    }
}

/// Relationships from an entity to itself.
pub struct SelfReferenceRule;

impl Rule for SelfReferenceRule {
    fn name(&self) -> &'static str {
        "self_reference"
    }

    fn check(&self, model: &SchemaModel, _ctx: &RuleContext) -> Vec<ValidationIssue> {
        model
            .relationships
            .iter()
            .enumerate()
            .filter(|(_, r)| normalize_key(&r.source) == normalize_key(&r.target))
            .map(|(i, r)| {
                ValidationIssue::new(
                    IssueKind::SelfReferencingRelationship,
                    relationship_subject(r, i),
                    format!("Relationship from '{}' to itself", r.source),
                )
                .with_line(r.line)
            })
            .collect()
    }
}

/// Identity of the link a relationship expresses, independent of writing direction.
fn link_key(rel: &Relationship) -> (bool, String, String) {
    let (a, b) = match (rel.referenced_entity(), rel.referencing_entity()) {
        (Some(one), Some(many)) => (normalize_key(one), normalize_key(many)),
        _ => {
            let (s, t) = (normalize_key(&rel.source), normalize_key(&rel.target));
            if s <= t { (s, t) } else { (t, s) }
        }
    };
    (rel.cardinality == Cardinality::ManyToMany, a, b)
}

/// Relationships written twice, verbatim or mirrored.
pub struct DuplicateRelationshipRule;

impl Rule for DuplicateRelationshipRule {
    fn name(&self) -> &'static str {
        "duplicate_relationship"
    }

    fn check(&self, model: &SchemaModel, _ctx: &RuleContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let rels = &model.relationships;

        for (j, rel) in rels.iter().enumerate() {
            if rel.is_self_referencing {
                continue;
            }
            let triple = (
                normalize_key(&rel.source),
                normalize_key(&rel.target),
                normalize_key(&rel.label),
            );

            let duplicate = rels[..j].iter().any(|earlier| {
                (
                    normalize_key(&earlier.source),
                    normalize_key(&earlier.target),
                    normalize_key(&earlier.label),
                ) == triple
            });
            if duplicate {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::DuplicateRelationship,
                        relationship_subject(rel, j),
                        format!(
                            "Relationship '{}' -> '{}' ({}) is declared more than once",
                            rel.source, rel.target, rel.label
                        ),
                    )
                    .with_line(rel.line),
                );
                continue;
            }

            let mirrored = rels[..j].iter().any(|earlier| {
                !earlier.is_self_referencing
                    && normalize_key(&earlier.source) != triple.0
                    && link_key(earlier) == link_key(rel)
            });
            if mirrored {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::RedundantRelationship,
                        relationship_subject(rel, j),
                        format!(
                            "Relationship '{}' -> '{}' restates an earlier relationship in the opposite direction",
                            rel.source, rel.target
                        ),
                    )
                    .with_line(rel.line),
                );
            }
        }

        issues
    }
}

/// Relationships carry a label.
pub struct RelationshipLabelRule;

impl Rule for RelationshipLabelRule {
    fn name(&self) -> &'static str {
        "relationship_label"
    }

    fn check(&self, model: &SchemaModel, _ctx: &RuleContext) -> Vec<ValidationIssue> {
        model
            .relationships
            .iter()
            .enumerate()
            .filter(|(_, r)| r.label.trim().is_empty())
            .map(|(i, r)| {
                ValidationIssue::new(
                    IssueKind::MissingRelationshipLabel,
                    relationship_subject(r, i),
                    format!("Relationship '{}' -> '{}' has no label", r.source, r.target),
                )
                .with_line(r.line)
            })
            .collect()
    }
}

/// Cardinalities the target platform cannot express directly.
pub struct CardinalityRule;

impl Rule for CardinalityRule {
    fn name(&self) -> &'static str {
        "cardinality"
    }

    fn check(&self, model: &SchemaModel, ctx: &RuleContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (i, rel) in model.relationships.iter().enumerate() {
            if rel.is_self_referencing {
                continue;
            }
            if rel.cardinality == Cardinality::ManyToMany {
                let message = if ctx.synthesize_junctions {
                    format!(
                        "Many-to-many relationship '{}' -> '{}' will be replaced by a junction entity",
                        rel.source, rel.target
                    )
                } else {
                    format!(
                        "Many-to-many relationship '{}' -> '{}' needs an explicit junction entity",
                        rel.source, rel.target
                    )
                };
                issues.push(
                    ValidationIssue::new(IssueKind::ManyToManyDetected, relationship_subject(rel, i), message)
                        .with_fixable(ctx.synthesize_junctions)
                        .with_line(rel.line),
                );
            } else if is_one_to_one(rel) {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::OneToOneDowngraded,
                        relationship_subject(rel, i),
                        format!(
                            "One-to-one relationship '{}' -> '{}' is treated as one-to-many",
                            rel.source, rel.target
                        ),
                    )
                    .with_line(rel.line),
                );
            }
        }

        issues
    }
}

/// Returns true if the attribute name refers to the given entity.
///
/// Accepts `customer_id`, `CustomerId` and prefixed forms such as
/// `billing_customer_id`. A name that merely contains the entity name does not count.
pub(crate) fn references_entity(attribute: &str, entity: &str) -> bool {
    let entity_key = compact_key(entity);
    if entity_key.is_empty() {
        return false;
    }
    if compact_key(attribute) == format!("{}id", entity_key) {
        return true;
    }

    let conventional = NamingPolicy::foreign_key_name(entity);
    let name = normalize_key(attribute);
    name == conventional || name.ends_with(&format!("_{}", conventional))
}

/// Foreign keys agree with relationships.
pub struct ForeignKeyRule;

impl Rule for ForeignKeyRule {
    fn name(&self) -> &'static str {
        "foreign_key"
    }

    fn check(&self, model: &SchemaModel, _ctx: &RuleContext) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (i, rel) in model.relationships.iter().enumerate() {
            if rel.is_self_referencing {
                continue;
            }
            let (Some(one), Some(many)) = (rel.referenced_entity(), rel.referencing_entity()) else {
                continue;
            };
            let (Some(one_entity), Some(many_entity)) = (model.entity(one), model.entity(many)) else {
                continue;
            };

            let has_fk = many_entity
                .attributes
                .iter()
                .any(|a| a.is_foreign_key && references_entity(&a.name, &one_entity.name));
            if !has_fk {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::MissingForeignKey,
                        relationship_subject(rel, i),
                        format!(
                            "Entity '{}' has no foreign key to '{}'",
                            many_entity.name, one_entity.name
                        ),
                    )
                    .with_line(rel.line),
                );
            }
        }

        for (ei, entity) in model.entities.iter().enumerate() {
            let partners: Vec<&str> = model
                .relationships_of(&entity.name)
                .map(|r| {
                    if normalize_key(&r.source) == entity.key() {
                        r.target.as_str()
                    } else {
                        r.source.as_str()
                    }
                })
                .collect();

            for (ai, attr) in entity.attributes.iter().enumerate() {
                if !attr.is_foreign_key {
                    continue;
                }
                if partners.iter().any(|p| references_entity(&attr.name, p)) {
                    continue;
                }
                issues.push(
                    ValidationIssue::new(
                        IssueKind::OrphanForeignKey,
                        attribute_subject(entity, ei, ai),
                        format!(
                            "Foreign key '{}.{}' does not match any relationship of '{}'",
                            entity.name, attr.name, entity.name
                        ),
                    )
                    .with_line(attr.line),
                );
            }
        }

        issues
    }
}

/// The full rule catalog in evaluation order.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(EmptyEntityRule),
        Box::new(PrimaryKeyRule),
        Box::new(DuplicateColumnRule),
        Box::new(DuplicateEntityRule),
        Box::new(EntityNameRule),
        Box::new(AttributeNameRule),
        Box::new(StatusColumnRule),
        Box::new(ChoiceRule),
        Box::new(OptionSetRule),
        Box::new(MissingEntityRule),
        Box::new(SelfReferenceRule),
        Box::new(DuplicateRelationshipRule),
        Box::new(RelationshipLabelRule),
        Box::new(CardinalityRule),
        Box::new(ForeignKeyRule),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, OptionSet};

    fn kinds(rule: &dyn Rule, model: &SchemaModel) -> Vec<IssueKind> {
        rule.check(model, &RuleContext::default())
            .into_iter()
            .map(|i| i.kind)
            .collect()
    }

    fn pk() -> Attribute {
        Attribute::new("id", SemanticType::Guid).primary_key()
    }

    #[test]
    fn test_primary_key_rule() {
        let mut demoted = Attribute::new("code", SemanticType::String);
        demoted.demoted_primary_key = true;
        let model = SchemaModel::new(
            vec![
                Entity::new("A").with_attributes(vec![Attribute::new("name", SemanticType::String)]),
                Entity::new("B").with_attributes(vec![pk(), demoted]),
                Entity::new("C").with_attributes(vec![pk()]),
            ],
            vec![],
        );
        assert_eq!(
            kinds(&PrimaryKeyRule, &model),
            vec![IssueKind::MissingPrimaryKey, IssueKind::MultiplePrimaryKeys]
        );
    }

    #[test]
    fn test_duplicate_columns_case_insensitive() {
        let model = SchemaModel::new(
            vec![Entity::new("A").with_attributes(vec![
                pk(),
                Attribute::new("Email", SemanticType::Email),
                Attribute::new("email", SemanticType::String),
            ])],
            vec![],
        );
        let issues = DuplicateColumnRule.check(&model, &RuleContext::default());
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0].subject, Subject::Attribute { index: 2, .. }));
    }

    #[test]
    fn test_entity_name_rule() {
        let long = "A".repeat(60);
        let model = SchemaModel::new(
            vec![
                Entity::new("order-line").with_attributes(vec![pk()]),
                Entity::new(long).with_attributes(vec![pk()]),
                Entity::new("Team").with_attributes(vec![pk()]),
            ],
            vec![],
        );
        assert_eq!(
            kinds(&EntityNameRule, &model),
            vec![
                IssueKind::InvalidEntityName,
                IssueKind::EntityNameTooLong,
                IssueKind::ReservedEntityName
            ]
        );
    }

    #[test]
    fn test_caller_reserved_names() {
        let ctx = RuleContext {
            naming: NamingPolicy::default().with_reserved_names(["Invoice"]),
            ..RuleContext::default()
        };
        let model = SchemaModel::new(vec![Entity::new("INVOICE").with_attributes(vec![pk()])], vec![]);
        let issues = EntityNameRule.check(&model, &ctx);
        assert_eq!(issues[0].kind, IssueKind::ReservedEntityName);
    }

    #[test]
    fn test_status_and_reserved_attributes() {
        let model = SchemaModel::new(
            vec![Entity::new("Ticket").with_attributes(vec![
                pk(),
                Attribute::new("status", SemanticType::String),
                Attribute::new("created_on", SemanticType::DateTime),
            ])],
            vec![],
        );
        assert_eq!(kinds(&StatusColumnRule, &model), vec![IssueKind::StatusColumnIgnored]);
        assert_eq!(kinds(&AttributeNameRule, &model), vec![IssueKind::ReservedAttributeName]);
    }

    #[test]
    fn test_choice_and_option_sets() {
        let mut bound = Attribute::new("priority", SemanticType::Choice);
        bound.option_set = Some("priority".to_string());
        let model = SchemaModel::new(
            vec![Entity::new("Ticket").with_attributes(vec![
                pk(),
                bound,
                Attribute::new("color", SemanticType::Choice),
            ])],
            vec![],
        )
        .with_option_sets(vec![
            OptionSet::from_labels("priority", ["Low", "low", "High"]),
            OptionSet::from_labels("empty", Vec::<String>::new()),
        ]);

        assert_eq!(kinds(&ChoiceRule, &model), vec![IssueKind::ChoiceDowngraded]);
        assert_eq!(
            kinds(&OptionSetRule, &model),
            vec![IssueKind::DuplicateOption, IssueKind::EmptyOptionSet]
        );
    }

    #[test]
    fn test_missing_entity_reported_once() {
        let model = SchemaModel::new(
            vec![Entity::new("A").with_attributes(vec![pk()])],
            vec![
                Relationship::one_to_many("A", "B", "x"),
                Relationship::one_to_many("A", "b", "y"),
            ],
        );
        let issues = MissingEntityRule.check(&model, &RuleContext::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].subject.entity_name(), Some("B"));
    }

    #[test]
    fn test_duplicate_and_redundant_relationships() {
        let mut mirrored = Relationship::one_to_many("A", "B", "has");
        mirrored.source = "B".to_string();
        mirrored.target = "A".to_string();
        mirrored.cardinality = Cardinality::ManyToOne;

        let model = SchemaModel::new(
            vec![],
            vec![
                Relationship::one_to_many("A", "B", "has"),
                Relationship::one_to_many("A", "B", "has"),
                Relationship::one_to_many("A", "B", "owns"),
                mirrored,
            ],
        );
        let issues = DuplicateRelationshipRule.check(&model, &RuleContext::default());
        let found: Vec<(IssueKind, usize)> = issues
            .iter()
            .map(|i| match i.subject {
                Subject::Relationship { index, .. } => (i.kind, index),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            found,
            vec![
                (IssueKind::DuplicateRelationship, 1),
                (IssueKind::RedundantRelationship, 3)
            ]
        );
    }

    #[test]
    fn test_many_to_many_fixability_follows_policy() {
        let mut rel = Relationship::one_to_many("STUDENT", "COURSE", "enrolled_in");
        rel.cardinality = Cardinality::ManyToMany;
        let model = SchemaModel::new(vec![], vec![rel]);

        let issues = CardinalityRule.check(&model, &RuleContext::default());
        assert!(issues[0].auto_fixable);

        let ctx = RuleContext {
            synthesize_junctions: false,
            ..RuleContext::default()
        };
        let issues = CardinalityRule.check(&model, &ctx);
        assert_eq!(issues[0].kind, IssueKind::ManyToManyDetected);
        assert!(!issues[0].auto_fixable);
    }

    #[test]
    fn test_foreign_key_rule() {
        let model = SchemaModel::new(
            vec![
                Entity::new("CUSTOMER").with_attributes(vec![pk()]),
                Entity::new("ORDER").with_attributes(vec![
                    pk(),
                    Attribute::new("region_id", SemanticType::Guid).foreign_key(),
                ]),
            ],
            vec![Relationship::one_to_many("CUSTOMER", "ORDER", "places")],
        );
        assert_eq!(
            kinds(&ForeignKeyRule, &model),
            vec![IssueKind::MissingForeignKey, IssueKind::OrphanForeignKey]
        );
    }

    #[test]
    fn test_foreign_key_satisfied() {
        let model = SchemaModel::new(
            vec![
                Entity::new("CUSTOMER").with_attributes(vec![pk()]),
                Entity::new("ORDER").with_attributes(vec![
                    pk(),
                    Attribute::new("CustomerId", SemanticType::Guid).foreign_key(),
                ]),
            ],
            vec![Relationship::one_to_many("CUSTOMER", "ORDER", "places")],
        );
        assert!(kinds(&ForeignKeyRule, &model).is_empty());
    }

    #[test]
    fn test_unrelated_foreign_key_is_not_a_reference() {
        let model = SchemaModel::new(
            vec![
                Entity::new("A").with_attributes(vec![pk()]),
                Entity::new("B").with_attributes(vec![
                    pk(),
                    Attribute::new("data_id", SemanticType::Guid).foreign_key(),
                ]),
            ],
            vec![Relationship::one_to_many("A", "B", "has")],
        );
        assert_eq!(
            kinds(&ForeignKeyRule, &model),
            vec![IssueKind::MissingForeignKey, IssueKind::OrphanForeignKey]
        );
    }

    #[test]
    fn test_references_entity_naming_forms() {
        assert!(references_entity("customer_id", "CUSTOMER"));
        assert!(references_entity("CustomerID", "CUSTOMER"));
        assert!(references_entity("billing_customer_id", "CUSTOMER"));
        assert!(references_entity("lineitem_id", "LineItem"));
        assert!(references_entity("line_item_id", "LineItem"));

        assert!(!references_entity("customer_address_id", "CUSTOMER"));
        assert!(!references_entity("data_id", "A"));
        assert!(!references_entity("customer", "CUSTOMER"));
        assert!(!references_entity("user_id", "custom_USER"));
    }

    #[test]
    fn test_plain_state_column_is_kept() {
        let mut choice = Attribute::new("state", SemanticType::Choice);
        choice.option_set = Some("state".to_string());
        let model = SchemaModel::new(
            vec![
                Entity::new("ADDRESS").with_attributes(vec![
                    pk(),
                    Attribute::new("state", SemanticType::String),
                    Attribute::new("city", SemanticType::String),
                ]),
                Entity::new("ISSUE").with_attributes(vec![pk(), choice]),
            ],
            vec![],
        );
        let issues = StatusColumnRule.check(&model, &RuleContext::default());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].subject.entity_name(), Some("ISSUE"));
    }
}
