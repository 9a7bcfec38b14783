//! Runs the rule catalog over a model.

use std::collections::HashMap;

use tracing::debug;

use crate::config::CompilerConfig;
use crate::input::SyntaxError;
use crate::schema::SchemaModel;

use super::issue::{IssueKind, Subject, ValidationIssue};
use super::naming::NamingPolicy;
use super::rules::{default_rules, Rule, RuleContext};

/// Version of the rule catalog. Bumped whenever a rule is added, removed or
/// changes what it reports.
pub const RULE_CATALOG_VERSION: &str = "1.0.0";

/// Runs validation rules and collects issues.
pub struct ValidationEngine {
    rules: Vec<Box<dyn Rule>>,
    context: RuleContext,
}

impl ValidationEngine {
    /// Create an engine with the full catalog and default settings.
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
            context: RuleContext::default(),
        }
    }

    /// Create an engine using the naming and fix settings of a config.
    pub fn from_config(config: &CompilerConfig) -> Self {
        Self {
            rules: default_rules(),
            context: RuleContext {
                naming: NamingPolicy::new(config.naming.clone()),
                synthesize_junctions: config.fix.synthesize_junctions,
            },
        }
    }

    /// Extend the reserved entity names with a caller registry.
    pub fn with_reserved_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.context.naming = self.context.naming.clone().with_reserved_names(names);
        self
    }

    /// The context handed to every rule.
    pub fn context(&self) -> &RuleContext {
        &self.context
    }

    /// Names of the rules in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Run all rules and collect issues, errors first.
    pub fn validate(&self, model: &SchemaModel) -> Vec<ValidationIssue> {
        self.validate_document(model, &[])
    }

    /// Validate a model together with the syntax errors its parse produced.
    pub fn validate_document(
        &self,
        model: &SchemaModel,
        syntax_errors: &[SyntaxError],
    ) -> Vec<ValidationIssue> {
        let mut all_issues = syntax_issues(syntax_errors);

        for rule in &self.rules {
            let issues = rule.check(model, &self.context);
            all_issues.extend(issues.into_iter().map(|i| i.with_rule(rule.name())));
        }

        // Sort by severity (errors first); stable, so catalog order is kept within a level
        all_issues.sort_by(|a, b| b.severity.cmp(&a.severity));
        assign_ids(&mut all_issues);

        debug!(
            issues = all_issues.len(),
            catalog = RULE_CATALOG_VERSION,
            "Validated schema model"
        );
        all_issues
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert parser syntax errors into issues.
pub fn syntax_issues(errors: &[SyntaxError]) -> Vec<ValidationIssue> {
    errors
        .iter()
        .map(|e| {
            ValidationIssue::new(IssueKind::SyntaxError, Subject::Document, e.to_string())
                .with_line(Some(e.line_start))
                .with_rule("parser")
        })
        .collect()
}

pub(crate) fn assign_ids(issues: &mut [ValidationIssue]) {
    let mut occurrences: HashMap<(IssueKind, String), usize> = HashMap::new();
    for issue in issues.iter_mut() {
        let counter = occurrences
            .entry((issue.kind, issue.subject.key()))
            .or_insert(0);
        issue.assign_id(*counter);
        *counter += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::EntityModelBuilder;
    use crate::input::Parser;
    use crate::validation::Severity;

    fn validate(text: &str) -> Vec<ValidationIssue> {
        let doc = Parser::new().parse(text);
        let model = EntityModelBuilder::new().build(&doc);
        ValidationEngine::new().validate_document(&model, &doc.syntax_errors)
    }

    #[test]
    fn test_missing_primary_key_scenario() {
        let issues = validate("erDiagram\n CUSTOMER { string name }");
        let pk = issues
            .iter()
            .find(|i| i.kind == IssueKind::MissingPrimaryKey)
            .unwrap();
        assert_eq!(pk.severity, Severity::Error);
        assert!(pk.auto_fixable);
        assert_eq!(pk.line, Some(2));
    }

    #[test]
    fn test_sorted_by_severity() {
        let issues = validate("A {\n  string status\n}\nA ||--o{ B : has\nB ||--o{ B : parent");
        let severities: Vec<Severity> = issues.iter().map(|i| i.severity).collect();
        let mut sorted = severities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(severities, sorted);
    }

    #[test]
    fn test_deterministic_ids() {
        let text = "A ||--o{ B : has\nA ||--o{ B : has\nA { string name }";
        let first = validate(text);
        let second = validate(text);
        assert_eq!(first, second);

        let ids: std::collections::HashSet<&str> = first.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), first.len());
    }

    #[test]
    fn test_syntax_errors_become_issues() {
        let issues = validate("A { string name }\n?? junk");
        let syntax = issues
            .iter()
            .find(|i| i.kind == IssueKind::SyntaxError)
            .unwrap();
        assert_eq!(syntax.line, Some(2));
        assert!(!syntax.auto_fixable);
        assert_eq!(syntax.rule, "parser");
    }

    #[test]
    fn test_rule_catalog() {
        let engine = ValidationEngine::new();
        assert_eq!(engine.rule_names().len(), 15);
        assert_eq!(engine.rule_names()[0], "empty_entity");
    }

    #[test]
    fn test_duplicate_relationship_scenario() {
        let issues = validate("A ||--o{ B : \"has\"\nA ||--o{ B : \"has\"");
        let dupes: Vec<_> = issues
            .iter()
            .filter(|i| i.kind == IssueKind::DuplicateRelationship)
            .collect();
        assert_eq!(dupes.len(), 1);
        assert_eq!(dupes[0].line, Some(2));
    }
}
