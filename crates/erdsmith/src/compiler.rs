//! The compiler facade and public pipeline API.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CompilerConfig;
use crate::error::{ErdError, Result};
use crate::export::{ExportedSchema, SchemaExporter};
use crate::fix::{AutoFix, AutoFixEngine};
use crate::inference::EntityModelBuilder;
use crate::input::{ParsedDocument, Parser, SourceMetadata};
use crate::matching::{StandardCatalog, StandardEntityMatch, StandardEntityMatcher};
use crate::schema::{OptionSet, SchemaModel};
use crate::validation::{Severity, ValidationEngine, ValidationIssue};

/// Stages a diagram passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Raw,
    Parsed,
    Validated,
    AutoFixed,
    Matched,
    Exported,
    Rejected,
}

impl PipelineStage {
    /// The stage a compile attempt ended in.
    pub fn of(result: &Result<CompileResult>) -> PipelineStage {
        match result {
            Ok(r) => r.stage(),
            Err(ErdError::NoEntities { .. }) => PipelineStage::Rejected,
            Err(_) => PipelineStage::Raw,
        }
    }
}

/// Per-invocation inputs supplied by the caller.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Extra entity names that must not be used as-is.
    pub reserved_names: Vec<String>,
    /// Option sets available to choice attributes.
    pub option_sets: Vec<OptionSet>,
    /// Catalog to match against instead of the built-in one.
    pub catalog: Option<Arc<StandardCatalog>>,
    /// Run the auto-fix stage.
    pub run_fix: bool,
    /// Run the standard-entity matcher.
    pub run_match: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            reserved_names: Vec::new(),
            option_sets: Vec::new(),
            catalog: None,
            run_fix: true,
            run_match: true,
        }
    }
}

impl CompileOptions {
    pub fn with_reserved_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_option_sets(mut self, option_sets: Vec<OptionSet>) -> Self {
        self.option_sets = option_sets;
        self
    }

    pub fn with_catalog(mut self, catalog: Arc<StandardCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Validate only; skip auto-fix.
    pub fn without_fix(mut self) -> Self {
        self.run_fix = false;
        self
    }

    pub fn without_match(mut self) -> Self {
        self.run_match = false;
        self
    }
}

/// Counts of issues by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCounts {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl IssueCounts {
    fn tally<'a>(issues: impl IntoIterator<Item = &'a ValidationIssue>) -> Self {
        let mut counts = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::Error => counts.error += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }
}

/// Summary of a compile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileSummary {
    pub entities: usize,
    pub attributes: usize,
    pub relationships: usize,
    /// Issues found before fixing, by severity.
    pub initial: IssueCounts,
    /// Issues left after fixing and exporting, by severity.
    pub remaining: IssueCounts,
    /// Remaining issues by kind.
    pub remaining_by_kind: IndexMap<String, usize>,
    pub fixes_applied: usize,
    /// Entities with at least one standard-entity candidate.
    pub matched_entities: usize,
    /// Human-readable recommendation.
    pub recommendation: String,
}

/// Everything a compile produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileResult {
    /// Metadata about the input.
    pub source: SourceMetadata,
    /// Stages visited, in order.
    pub stages: Vec<PipelineStage>,
    /// The final (fixed) model.
    pub model: SchemaModel,
    /// Issues of the model as parsed, syntax errors included.
    pub issues: Vec<ValidationIssue>,
    /// The fix each initially fixable issue would get.
    pub fix_previews: Vec<AutoFix>,
    /// Fixes actually applied.
    pub applied_fixes: Vec<AutoFix>,
    /// Issues of the final model, syntax errors included.
    pub remaining_issues: Vec<ValidationIssue>,
    /// Remaining issues of a kind that was fixed.
    pub regressions: Vec<ValidationIssue>,
    /// The fix loop finished within its limits.
    pub converged: bool,
    /// Standard-entity candidates per entity.
    pub matches: IndexMap<String, Vec<StandardEntityMatch>>,
    /// The exported schema.
    pub export: ExportedSchema,
    pub summary: CompileSummary,
}

impl CompileResult {
    /// The last stage reached.
    pub fn stage(&self) -> PipelineStage {
        self.stages.last().copied().unwrap_or(PipelineStage::Raw)
    }

    /// Error-severity issues left in the model or raised by the exporter.
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.remaining_issues
            .iter()
            .chain(self.export.issues.iter())
            .filter(|i| i.severity == Severity::Error)
    }

    /// Returns true if no error-severity issue is left.
    pub fn is_clean(&self) -> bool {
        self.errors().next().is_none()
    }
}

/// Compiles diagram text into a validated, fixed, and exported schema.
#[derive(Debug, Clone, Default)]
pub struct ErdCompiler {
    config: CompilerConfig,
    parser: Parser,
}

impl ErdCompiler {
    /// Create a compiler with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compiler with custom configuration.
    pub fn with_config(config: CompilerConfig) -> Self {
        Self {
            config,
            parser: Parser::new(),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile diagram text.
    pub fn compile(&self, text: &str, options: &CompileOptions) -> Result<CompileResult> {
        let (document, source) = self.parser.parse_text(text)?;
        Ok(self.run(&document, source, options))
    }

    /// Compile raw bytes, which must be UTF-8.
    pub fn compile_bytes(&self, bytes: &[u8], options: &CompileOptions) -> Result<CompileResult> {
        let (document, source) = self.parser.parse_bytes(bytes)?;
        Ok(self.run(&document, source, options))
    }

    /// Read and compile a diagram file.
    pub fn compile_file(&self, path: impl AsRef<Path>, options: &CompileOptions) -> Result<CompileResult> {
        let (document, source) = self.parser.parse_file(path)?;
        Ok(self.run(&document, source, options))
    }

    fn validator(&self, options: &CompileOptions) -> ValidationEngine {
        ValidationEngine::from_config(&self.config).with_reserved_names(&options.reserved_names)
    }

    fn run(&self, document: &ParsedDocument, source: SourceMetadata, options: &CompileOptions) -> CompileResult {
        let mut stages = vec![PipelineStage::Raw];

        let parsed = EntityModelBuilder::new()
            .with_option_sets(options.option_sets.clone())
            .build(document);
        stages.push(PipelineStage::Parsed);

        let fixer = AutoFixEngine::from_config(&self.config).with_validator(self.validator(options));
        let validator = fixer.validator();
        let issues = validator.validate_document(&parsed, &document.syntax_errors);
        let fix_previews = fixer.preview(&parsed, &issues);
        stages.push(PipelineStage::Validated);
        debug!(
            issues = issues.len(),
            fixable = fix_previews.len(),
            "Validated parsed model"
        );

        let (model, applied_fixes, remaining_issues, regressions, converged) =
            if self.config.fix.enabled && options.run_fix {
                let outcome = fixer.fix(&parsed);
                stages.push(PipelineStage::AutoFixed);
                let remaining = validator.validate_document(&outcome.model, &document.syntax_errors);
                stages.push(PipelineStage::Validated);
                (outcome.model, outcome.applied, remaining, outcome.regressions, outcome.converged)
            } else {
                (parsed, Vec::new(), issues.clone(), Vec::new(), true)
            };

        let matches = if options.run_match {
            let mut matcher = StandardEntityMatcher::from_config(&self.config.matcher);
            if let Some(catalog) = &options.catalog {
                matcher = matcher.with_catalog(Arc::clone(catalog));
            }
            let matches = matcher.match_model(&model);
            stages.push(PipelineStage::Matched);
            matches
        } else {
            IndexMap::new()
        };

        let export = SchemaExporter::from_config(&self.config.export).export(&model);
        stages.push(PipelineStage::Exported);

        let summary = summarize(&model, &issues, &remaining_issues, &export, applied_fixes.len(), &matches);
        debug!(
            stage = ?stages.last(),
            fixes = applied_fixes.len(),
            remaining = remaining_issues.len(),
            "Compile finished"
        );

        CompileResult {
            source,
            stages,
            model,
            issues,
            fix_previews,
            applied_fixes,
            remaining_issues,
            regressions,
            converged,
            matches,
            export,
            summary,
        }
    }
}

fn summarize(
    model: &SchemaModel,
    initial: &[ValidationIssue],
    remaining: &[ValidationIssue],
    export: &ExportedSchema,
    fixes_applied: usize,
    matches: &IndexMap<String, Vec<StandardEntityMatch>>,
) -> CompileSummary {
    let left: Vec<&ValidationIssue> = remaining.iter().chain(export.issues.iter()).collect();

    let mut remaining_by_kind: IndexMap<String, usize> = IndexMap::new();
    for issue in &left {
        *remaining_by_kind.entry(issue.kind.to_string()).or_insert(0) += 1;
    }

    let remaining_counts = IssueCounts::tally(left.iter().copied());
    let recommendation = recommend(&remaining_counts, fixes_applied);

    CompileSummary {
        entities: model.entities.len(),
        attributes: model.attribute_count(),
        relationships: model.relationships.len(),
        initial: IssueCounts::tally(initial),
        remaining: remaining_counts,
        remaining_by_kind,
        fixes_applied,
        matched_entities: matches.values().filter(|m| !m.is_empty()).count(),
        recommendation,
    }
}

fn recommend(counts: &IssueCounts, fixes_applied: usize) -> String {
    if counts.error > 0 {
        format!(
            "Resolve {} error-level issues before handing the schema off.",
            counts.error
        )
    } else if counts.warning > 0 {
        format!(
            "Schema is usable; review {} remaining warnings.",
            counts.warning
        )
    } else if fixes_applied > 0 {
        format!("Schema is ready after {} automatic fixes.", fixes_applied)
    } else {
        "Schema is ready.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::IssueKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ORDERS: &str = "erDiagram
    CUSTOMER ||--o{ ORDER : places
    CUSTOMER {
        guid id PK
        string email
    }
    ORDER {
        guid id PK
        guid customer_id FK
        decimal total
    }
";

    #[test]
    fn test_clean_diagram() {
        let result = ErdCompiler::new().compile(ORDERS, &CompileOptions::default()).unwrap();

        assert!(result.is_clean());
        assert!(result.applied_fixes.is_empty());
        assert_eq!(result.stage(), PipelineStage::Exported);
        assert_eq!(
            result.stages,
            vec![
                PipelineStage::Raw,
                PipelineStage::Parsed,
                PipelineStage::Validated,
                PipelineStage::AutoFixed,
                PipelineStage::Validated,
                PipelineStage::Matched,
                PipelineStage::Exported,
            ]
        );
        assert_eq!(result.summary.entities, 2);
        assert_eq!(result.export.relationships.len(), 1);
        assert_eq!(result.source.entity_declarations, 2);
        assert_eq!(result.summary.recommendation, "Schema is ready.");
    }

    #[test]
    fn test_fix_disabled() {
        let options = CompileOptions::default().without_fix().without_match();
        let result = ErdCompiler::new()
            .compile("erDiagram\n CUSTOMER { string name }", &options)
            .unwrap();

        assert!(result.applied_fixes.is_empty());
        assert_eq!(result.issues, result.remaining_issues);
        assert_eq!(result.fix_previews.len(), 1);
        assert!(result.matches.is_empty());
        assert!(!result.stages.contains(&PipelineStage::AutoFixed));
        assert!(!result.is_clean());
    }

    #[test]
    fn test_remaining_by_kind_follows_issue_order() {
        let options = CompileOptions::default().without_fix().without_match();
        let result = ErdCompiler::new()
            .compile("A {\n  string name\n  string Name\n}\nB {\n  string code\n}", &options)
            .unwrap();

        let mut expected: Vec<String> = Vec::new();
        for issue in result.remaining_issues.iter().chain(result.export.issues.iter()) {
            let kind = issue.kind.to_string();
            if !expected.contains(&kind) {
                expected.push(kind);
            }
        }
        let keys: Vec<String> = result.summary.remaining_by_kind.keys().cloned().collect();
        assert_eq!(keys, expected);
        assert_eq!(
            result.summary.remaining_by_kind.values().sum::<usize>(),
            result.remaining_issues.len() + result.export.issues.len()
        );
    }

    #[test]
    fn test_missing_key_is_fixed() {
        let result = ErdCompiler::new()
            .compile("erDiagram\n CUSTOMER { string name }", &CompileOptions::default())
            .unwrap();

        assert!(result.issues.iter().any(|i| i.kind == IssueKind::MissingPrimaryKey));
        assert!(result.model.entities[0].has_primary_key());
        assert!(result.is_clean());
        assert_eq!(result.summary.fixes_applied, 1);
    }

    #[test]
    fn test_rejected_input() {
        let result = ErdCompiler::new().compile("erDiagram\n }}}\n", &CompileOptions::default());
        assert!(matches!(result, Err(ErdError::NoEntities { .. })));
        assert_eq!(PipelineStage::of(&result), PipelineStage::Rejected);

        let blank = ErdCompiler::new().compile("   \n", &CompileOptions::default());
        assert!(matches!(blank, Err(ErdError::EmptyInput(_))));
    }

    #[test]
    fn test_compile_file_records_path() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(ORDERS.as_bytes()).unwrap();

        let result = ErdCompiler::new()
            .compile_file(file.path(), &CompileOptions::default())
            .unwrap();
        assert_eq!(result.source.path.as_deref(), Some(file.path()));
        assert!(result.source.hash.starts_with("sha256:"));
    }

    #[test]
    fn test_invalid_utf8() {
        let result = ErdCompiler::new().compile_bytes(&[0xff, 0xfe, 0x00], &CompileOptions::default());
        assert!(matches!(result, Err(ErdError::Encoding(_))));
    }
}
