//! Validation engine: the rule catalog, naming policy and issue types.

mod engine;
mod issue;
mod naming;
mod rules;

pub use engine::{syntax_issues, ValidationEngine, RULE_CATALOG_VERSION};
pub(crate) use engine::assign_ids;
pub use issue::{IssueKind, Severity, Subject, ValidationIssue};
pub use naming::NamingPolicy;
pub use rules::{
    default_rules, AttributeNameRule, CardinalityRule, ChoiceRule, DuplicateColumnRule,
    DuplicateEntityRule, DuplicateRelationshipRule, EmptyEntityRule, EntityNameRule,
    ForeignKeyRule, MissingEntityRule, OptionSetRule, PrimaryKeyRule, RelationshipLabelRule, Rule,
    RuleContext, SelfReferenceRule, StatusColumnRule,
};
pub(crate) use rules::references_entity;
