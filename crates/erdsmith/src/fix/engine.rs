//! Auto-fix engine: plans fixes for issues and applies them in dependency order.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{CompilerConfig, FixConfig};
use crate::schema::{normalize_key, SchemaModel, SemanticType};
use crate::validation::{IssueKind, NamingPolicy, Subject, ValidationEngine, ValidationIssue};

use super::operations::{AutoFix, FixOperation};

/// Fix phases. Earlier phases always run before later ones: entities must
/// exist before they are renamed, and keys must be settled before
/// relationships add foreign keys.
const PHASES: &[&[IssueKind]] = &[
    &[IssueKind::DuplicateEntity, IssueKind::MissingEntity],
    &[
        IssueKind::InvalidEntityName,
        IssueKind::EntityNameTooLong,
        IssueKind::ReservedEntityName,
    ],
    &[
        IssueKind::StatusColumnIgnored,
        IssueKind::ChoiceDowngraded,
        IssueKind::DuplicateColumns,
        IssueKind::MultiplePrimaryKeys,
        IssueKind::MissingPrimaryKey,
        IssueKind::InvalidAttributeName,
        IssueKind::AttributeNameTooLong,
        IssueKind::ReservedAttributeName,
        IssueKind::DuplicateOption,
    ],
    &[
        IssueKind::SelfReferencingRelationship,
        IssueKind::DuplicateRelationship,
        IssueKind::RedundantRelationship,
        IssueKind::MissingRelationshipLabel,
        IssueKind::ManyToManyDetected,
        IssueKind::MissingForeignKey,
    ],
];

/// Result of a fix run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixOutcome {
    /// The fixed model.
    pub model: SchemaModel,
    /// Fixes applied, in order.
    pub applied: Vec<AutoFix>,
    /// Issues reported by the final validation.
    pub remaining: Vec<ValidationIssue>,
    /// Remaining issues of a kind that was fixed during the run.
    pub regressions: Vec<ValidationIssue>,
    /// Every fixable issue was resolved within the iteration limit.
    pub converged: bool,
}

impl FixOutcome {
    /// Returns true if no fixed kind reappeared.
    pub fn is_idempotent(&self) -> bool {
        self.regressions.is_empty()
    }
}

/// Computes and applies corrective patches.
pub struct AutoFixEngine {
    validator: ValidationEngine,
    config: FixConfig,
}

impl AutoFixEngine {
    /// Create an engine with default settings.
    pub fn new() -> Self {
        Self {
            validator: ValidationEngine::new(),
            config: FixConfig::default(),
        }
    }

    /// Create an engine from a compiler config.
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            validator: ValidationEngine::from_config(config),
            config: config.fix.clone(),
        }
    }

    /// Use a specific validator (for instance one with a reserved-name registry).
    pub fn with_validator(mut self, validator: ValidationEngine) -> Self {
        self.validator = validator;
        self
    }

    /// The validator used between fixes.
    pub fn validator(&self) -> &ValidationEngine {
        &self.validator
    }

    fn naming(&self) -> &NamingPolicy {
        &self.validator.context().naming
    }

    /// List, without applying, the fix each currently fixable issue would get.
    pub fn preview(&self, model: &SchemaModel, issues: &[ValidationIssue]) -> Vec<AutoFix> {
        issues
            .iter()
            .filter(|i| i.auto_fixable)
            .filter_map(|i| self.plan(model, i))
            .collect()
    }

    /// Fix the model until no fixable issue remains or the iteration limit is hit.
    pub fn fix(&self, model: &SchemaModel) -> FixOutcome {
        let mut current = model.clone();
        let mut issues = self.validator.validate(&current);
        let mut applied: Vec<AutoFix> = Vec::new();
        let mut stalled: HashSet<String> = HashSet::new();
        let mut converged = true;

        loop {
            let Some(fix) = self.next_fix(&current, &issues, &stalled) else {
                break;
            };
            if applied.len() >= self.config.max_iterations {
                warn!(
                    max_iterations = self.config.max_iterations,
                    "Fix loop stopped at iteration limit"
                );
                converged = false;
                break;
            }

            let updated = fix.apply(&current);
            if updated == current {
                warn!(issue = %fix.issue_id, kind = %fix.kind, "Fix made no progress");
                stalled.insert(fix.issue_id.clone());
                continue;
            }

            debug!(kind = %fix.kind, change = %fix.description, "Applied fix");
            current = updated;
            applied.push(fix);
            issues = self.validator.validate(&current);
        }

        if !stalled.is_empty() {
            converged = false;
        }

        let fixed_kinds: BTreeSet<IssueKind> = applied.iter().map(|f| f.kind).collect();
        let regressions: Vec<ValidationIssue> = issues
            .iter()
            .filter(|i| fixed_kinds.contains(&i.kind))
            .cloned()
            .collect();

        debug!(
            applied = applied.len(),
            remaining = issues.len(),
            regressions = regressions.len(),
            "Auto-fix finished"
        );

        FixOutcome {
            model: current,
            applied,
            remaining: issues,
            regressions,
            converged,
        }
    }

    /// The first fixable issue in phase order, with its planned fix.
    fn next_fix(
        &self,
        model: &SchemaModel,
        issues: &[ValidationIssue],
        stalled: &HashSet<String>,
    ) -> Option<AutoFix> {
        for phase in PHASES {
            for kind in phase.iter() {
                for issue in issues.iter().filter(|i| i.kind == *kind) {
                    if !issue.auto_fixable || stalled.contains(&issue.id) {
                        continue;
                    }
                    if let Some(fix) = self.plan(model, issue) {
                        return Some(fix);
                    }
                }
            }
        }
        None
    }

    /// Plan the fix for one issue against the model it was raised on.
    pub fn plan(&self, model: &SchemaModel, issue: &ValidationIssue) -> Option<AutoFix> {
        let operation = match (&issue.kind, &issue.subject) {
            (IssueKind::DuplicateEntity, Subject::Entity { entity, index: Some(remove) }) => {
                let key = normalize_key(entity);
                let keep = model.entities.iter().position(|e| e.key() == key)?;
                FixOperation::MergeEntity {
                    name: entity.clone(),
                    keep,
                    remove: *remove,
                }
            }

            (IssueKind::MissingEntity, Subject::Entity { entity, .. }) => FixOperation::AddStubEntity {
                name: entity.clone(),
                primary_key: self.naming().primary_key_name().to_string(),
            },

            (
                IssueKind::InvalidEntityName | IssueKind::EntityNameTooLong | IssueKind::ReservedEntityName,
                Subject::Entity { entity, index: Some(index) },
            ) => {
                let others: Vec<String> = model
                    .entities
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| i != index)
                    .map(|(_, e)| e.name.clone())
                    .collect();
                let to = self.naming().fit_entity_name(entity, &others);
                if &to == entity {
                    return None;
                }
                FixOperation::RenameEntity {
                    index: *index,
                    from: entity.clone(),
                    to,
                }
            }

            (IssueKind::StatusColumnIgnored, Subject::Attribute { entity_index, index, attribute, .. }) => {
                FixOperation::DropAttribute {
                    entity: *entity_index,
                    attribute: *index,
                    name: attribute.clone(),
                }
            }

            (IssueKind::ChoiceDowngraded, Subject::Attribute { entity_index, index, attribute, .. }) => {
                FixOperation::RetypeAttribute {
                    entity: *entity_index,
                    attribute: *index,
                    name: attribute.clone(),
                    to: SemanticType::String,
                }
            }

            (IssueKind::DuplicateColumns, Subject::Attribute { entity_index, index, attribute, .. }) => {
                let entity = model.entities.get(*entity_index)?;
                let key = normalize_key(attribute);
                let keep = entity.attributes.iter().position(|a| a.key() == key)?;
                FixOperation::MergeAttributes {
                    entity: *entity_index,
                    keep,
                    remove: *index,
                    name: attribute.clone(),
                }
            }

            (IssueKind::MultiplePrimaryKeys, Subject::Entity { index: Some(index), .. }) => {
                let entity = model.entities.get(*index)?;
                let keep = entity
                    .attributes
                    .iter()
                    .position(|a| a.is_primary_key)
                    .or_else(|| entity.attributes.iter().position(|a| a.demoted_primary_key))?;
                FixOperation::DemotePrimaryKeys {
                    entity: *index,
                    keep,
                    name: entity.attributes[keep].name.clone(),
                }
            }

            (IssueKind::MissingPrimaryKey, Subject::Entity { entity, index: Some(index) }) => {
                let target = model.entities.get(*index)?;
                let pk_name = self.naming().primary_key_name();
                let existing = target
                    .attributes
                    .iter()
                    .position(|a| a.key() == normalize_key(pk_name) && !a.is_foreign_key);
                match existing {
                    Some(attribute) => FixOperation::PromotePrimaryKey {
                        entity: *index,
                        attribute,
                        name: target.attributes[attribute].name.clone(),
                    },
                    None => {
                        let names: Vec<String> =
                            target.attributes.iter().map(|a| a.name.clone()).collect();
                        FixOperation::AddPrimaryKey {
                            entity: *index,
                            entity_name: entity.clone(),
                            name: self.naming().fit_attribute_name(pk_name, &names),
                        }
                    }
                }
            }

            (
                IssueKind::InvalidAttributeName | IssueKind::AttributeNameTooLong | IssueKind::ReservedAttributeName,
                Subject::Attribute { entity, attribute, entity_index, index },
            ) => {
                let owner = model.entities.get(*entity_index)?;
                let others: Vec<String> = owner
                    .attributes
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| i != index)
                    .map(|(_, a)| a.name.clone())
                    .collect();
                let candidate = if issue.kind == IssueKind::ReservedAttributeName {
                    format!("{}_{}", entity.to_lowercase(), attribute)
                } else {
                    attribute.clone()
                };
                let to = self.naming().fit_attribute_name(&candidate, &others);
                if &to == attribute {
                    return None;
                }
                FixOperation::RenameAttribute {
                    entity: *entity_index,
                    attribute: *index,
                    from: attribute.clone(),
                    to,
                }
            }

            (IssueKind::DuplicateOption, Subject::OptionSet { name, index }) => FixOperation::DedupeOptions {
                option_set: *index,
                name: name.clone(),
            },

            (
                IssueKind::SelfReferencingRelationship
                | IssueKind::DuplicateRelationship
                | IssueKind::RedundantRelationship,
                Subject::Relationship { source, target, index, .. },
            ) => FixOperation::DropRelationship {
                index: *index,
                source: source.clone(),
                target: target.clone(),
            },

            (IssueKind::MissingRelationshipLabel, Subject::Relationship { source, target, index, .. }) => {
                FixOperation::LabelRelationship {
                    index: *index,
                    label: format!("{}_{}", source, target).to_lowercase(),
                }
            }

            (IssueKind::ManyToManyDetected, Subject::Relationship { index, .. }) => {
                if !self.config.synthesize_junctions {
                    return None;
                }
                self.plan_junction(model, *index)?
            }

            (IssueKind::MissingForeignKey, Subject::Relationship { index, .. }) => {
                self.plan_foreign_key(model, *index)?
            }

            _ => return None,
        };

        Some(AutoFix::new(issue.id.clone(), issue.kind, operation))
    }

    fn plan_junction(&self, model: &SchemaModel, index: usize) -> Option<FixOperation> {
        let rel = model.relationships.get(index)?;
        let source = model.entity(&rel.source)?;
        let target = model.entity(&rel.target)?;
        let naming = self.naming();

        let entity_names: Vec<String> = model.entities.iter().map(|e| e.name.clone()).collect();
        let junction = naming.fit_entity_name(&format!("{}_{}", source.name, target.name), &entity_names);

        let primary_key = naming.primary_key_name().to_string();
        let mut taken = vec![primary_key.clone()];
        let source_key = naming.fit_attribute_name(&NamingPolicy::foreign_key_name(&source.name), &taken);
        taken.push(source_key.clone());
        let target_key = naming.fit_attribute_name(&NamingPolicy::foreign_key_name(&target.name), &taken);

        Some(FixOperation::SynthesizeJunction {
            index,
            source: source.name.clone(),
            target: target.name.clone(),
            junction,
            primary_key,
            source_key,
            source_key_type: key_type(source),
            target_key,
            target_key_type: key_type(target),
        })
    }

    fn plan_foreign_key(&self, model: &SchemaModel, index: usize) -> Option<FixOperation> {
        let rel = model.relationships.get(index)?;
        let one = model.entity(rel.referenced_entity()?)?;
        let many_index = model.entity_index(rel.referencing_entity()?)?;
        let many = &model.entities[many_index];

        let conventional = NamingPolicy::foreign_key_name(&one.name);
        if let Some(attribute) = many.attributes.iter().position(|a| a.key() == conventional) {
            return Some(FixOperation::MarkForeignKey {
                entity: many_index,
                attribute,
                name: many.attributes[attribute].name.clone(),
                references: one.name.clone(),
            });
        }

        let names: Vec<String> = many.attributes.iter().map(|a| a.name.clone()).collect();
        Some(FixOperation::AddForeignKey {
            entity: many_index,
            entity_name: many.name.clone(),
            name: self.naming().fit_attribute_name(&conventional, &names),
            semantic_type: key_type(one),
            references: one.name.clone(),
        })
    }
}

impl Default for AutoFixEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Type a foreign key to this entity should carry.
fn key_type(entity: &crate::schema::Entity) -> SemanticType {
    entity
        .primary_key()
        .map(|a| a.semantic_type)
        .filter(|t| *t != SemanticType::Unknown)
        .unwrap_or(SemanticType::Guid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::EntityModelBuilder;
    use crate::input::Parser;
    use crate::schema::Cardinality;

    fn model(text: &str) -> SchemaModel {
        EntityModelBuilder::new().build(&Parser::new().parse(text))
    }

    fn kinds(issues: &[ValidationIssue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_missing_primary_key_fixed() {
        let outcome = AutoFixEngine::new().fix(&model("erDiagram\n CUSTOMER { string name }"));
        let customer = outcome.model.entity("CUSTOMER").unwrap();
        assert_eq!(customer.attributes[0].name, "id");
        assert!(customer.attributes[0].is_primary_key);
        assert!(outcome.is_idempotent());
        assert!(!kinds(&outcome.remaining).contains(&IssueKind::MissingPrimaryKey));
    }

    #[test]
    fn test_existing_id_is_promoted() {
        let outcome = AutoFixEngine::new().fix(&model("A {\n  guid id\n  string name\n}"));
        let entity = &outcome.model.entities[0];
        assert_eq!(entity.attributes.len(), 2);
        assert!(entity.attributes[0].is_primary_key);
    }

    #[test]
    fn test_many_to_many_junction() {
        let outcome = AutoFixEngine::new().fix(&model("STUDENT }o--o{ COURSE : enrolled_in"));
        let fixed = &outcome.model;

        let junction = fixed.entity("STUDENT_COURSE").unwrap();
        assert!(junction.attribute("student_id").unwrap().is_foreign_key);
        assert!(junction.attribute("course_id").unwrap().is_foreign_key);
        assert_eq!(fixed.relationships.len(), 2);
        assert!(fixed
            .relationships
            .iter()
            .all(|r| r.cardinality == Cardinality::OneToMany));
        assert!(outcome.is_idempotent());
        assert!(outcome.converged);
    }

    #[test]
    fn test_many_to_many_left_alone_when_disabled() {
        let mut config = CompilerConfig::default();
        config.fix.synthesize_junctions = false;
        let outcome = AutoFixEngine::from_config(&config).fix(&model("STUDENT }o--o{ COURSE : enrolled_in"));

        assert_eq!(outcome.model.relationships.len(), 1);
        let m2m = outcome
            .remaining
            .iter()
            .find(|i| i.kind == IssueKind::ManyToManyDetected)
            .unwrap();
        assert!(!m2m.auto_fixable);
        assert!(outcome.is_idempotent());
    }

    #[test]
    fn test_duplicate_relationship_removed() {
        let outcome = AutoFixEngine::new().fix(&model("A ||--o{ B : \"has\"\nA ||--o{ B : \"has\""));
        assert_eq!(outcome.model.relationships.len(), 1);
        assert!(!kinds(&outcome.remaining).contains(&IssueKind::DuplicateRelationship));
    }

    #[test]
    fn test_foreign_key_added_with_referenced_type() {
        let outcome = AutoFixEngine::new().fix(&model(
            "CUSTOMER {\n  int id PK\n}\nORDER {\n  guid id PK\n}\nCUSTOMER ||--o{ ORDER : places",
        ));
        let fk = outcome.model.entity("ORDER").unwrap().attribute("customer_id").unwrap();
        assert!(fk.is_foreign_key);
        assert_eq!(fk.semantic_type, SemanticType::Integer);
    }

    #[test]
    fn test_naming_fixes() {
        let outcome = AutoFixEngine::new().fix(&model(
            "order-line {\n  guid id PK\n  string first-name\n  datetime createdon\n  string status\n}",
        ));
        let entity = &outcome.model.entities[0];
        assert_eq!(entity.name, "order_line");
        assert_eq!(entity.attribute_names(), vec!["id", "first_name", "order_line_createdon"]);
        assert!(outcome.is_idempotent());
    }

    #[test]
    fn test_reserved_entity_renamed_with_relationships() {
        let outcome = AutoFixEngine::new().fix(&model(
            "USER {\n  guid id PK\n}\nTASK {\n  guid id PK\n  guid user_id FK\n}\nUSER ||--o{ TASK : owns",
        ));
        assert!(outcome.model.has_entity("custom_USER"));
        assert_eq!(outcome.model.relationships[0].source, "custom_USER");
        assert!(outcome.is_idempotent());
    }

    #[test]
    fn test_preview_does_not_apply() {
        let engine = AutoFixEngine::new();
        let m = model("A { string name }");
        let issues = engine.validator().validate(&m);
        let preview = engine.preview(&m, &issues);
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].kind, IssueKind::MissingPrimaryKey);
        assert_eq!(preview[0].description, "Add primary key 'id' to 'A'");
        assert!(!m.entities[0].has_primary_key());
    }

    #[test]
    fn test_iteration_limit() {
        let mut config = CompilerConfig::default();
        config.fix.max_iterations = 1;
        let outcome = AutoFixEngine::from_config(&config)
            .fix(&model("A { string name }\nB { string name }"));
        assert_eq!(outcome.applied.len(), 1);
        assert!(!outcome.converged);
    }
}
