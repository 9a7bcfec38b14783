//! Maps a finalized model to the target-neutral export schema.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ExportConfig;
use crate::error::{ErdError, Result};
use crate::schema::{Attribute, Cardinality, Entity, SchemaModel, SemanticType};
use crate::validation::{assign_ids, references_entity, IssueKind, Subject, ValidationIssue};

/// Target representation of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    ShortText,
    MultilineText,
    WholeNumber,
    PreciseNumber,
    FloatingNumber,
    Currency,
    TwoOption,
    DateAndTime,
    DateOnly,
    Email,
    Phone,
    Url,
    Choice,
    UniqueIdentifier,
    Lookup,
}

impl TargetType {
    /// Stable snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::ShortText => "short_text",
            TargetType::MultilineText => "multiline_text",
            TargetType::WholeNumber => "whole_number",
            TargetType::PreciseNumber => "precise_number",
            TargetType::FloatingNumber => "floating_number",
            TargetType::Currency => "currency",
            TargetType::TwoOption => "two_option",
            TargetType::DateAndTime => "date_and_time",
            TargetType::DateOnly => "date_only",
            TargetType::Email => "email",
            TargetType::Phone => "phone",
            TargetType::Url => "url",
            TargetType::Choice => "choice",
            TargetType::UniqueIdentifier => "unique_identifier",
            TargetType::Lookup => "lookup",
        }
    }
}

/// Semantic type to target type. Types missing here are reported as unmapped.
const TYPE_MAP: &[(SemanticType, TargetType)] = &[
    (SemanticType::String, TargetType::ShortText),
    (SemanticType::Text, TargetType::MultilineText),
    (SemanticType::Integer, TargetType::WholeNumber),
    (SemanticType::Decimal, TargetType::PreciseNumber),
    (SemanticType::Float, TargetType::FloatingNumber),
    (SemanticType::Money, TargetType::Currency),
    (SemanticType::Boolean, TargetType::TwoOption),
    (SemanticType::DateTime, TargetType::DateAndTime),
    (SemanticType::Date, TargetType::DateOnly),
    (SemanticType::Email, TargetType::Email),
    (SemanticType::Phone, TargetType::Phone),
    (SemanticType::Url, TargetType::Url),
    (SemanticType::Choice, TargetType::Choice),
    (SemanticType::Guid, TargetType::UniqueIdentifier),
];

/// Fallback for unmapped types.
const FALLBACK_TYPE: TargetType = TargetType::ShortText;

static TYPE_PARAMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\)").expect("type parameter pattern is valid"));

/// Look up the target type for a semantic type.
pub fn target_type(semantic_type: SemanticType) -> Option<TargetType> {
    TYPE_MAP
        .iter()
        .find(|(s, _)| *s == semantic_type)
        .map(|(_, t)| *t)
}

/// An exported attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedAttribute {
    pub name: String,
    pub display_name: String,
    pub target_type: TargetType,
    pub semantic_type: SemanticType,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub is_unique: bool,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookup_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_set: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An exported entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedEntity {
    pub name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_key: Option<String>,
    pub attributes: Vec<ExportedAttribute>,
    #[serde(default)]
    pub synthesized: bool,
}

/// A relationship in one-to-many orientation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedRelationship {
    /// The "one" side.
    pub referenced_entity: String,
    /// The "many" side.
    pub referencing_entity: String,
    /// Foreign key on the many side, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referencing_attribute: Option<String>,
    pub label: String,
    pub identifying: bool,
}

/// An exported option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedOption {
    pub label: String,
    pub value: i64,
}

/// An exported option set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedOptionSet {
    pub name: String,
    pub display_name: String,
    pub options: Vec<ExportedOption>,
}

/// The exported schema.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExportedSchema {
    pub entities: Vec<ExportedEntity>,
    pub relationships: Vec<ExportedRelationship>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub option_sets: Vec<ExportedOptionSet>,
    /// Problems found while exporting.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<ValidationIssue>,
}

impl ExportedSchema {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One CSV row per attribute.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.write_record([
            "entity",
            "attribute",
            "display_name",
            "target_type",
            "semantic_type",
            "primary_key",
            "foreign_key",
            "required",
            "unique",
            "lookup_target",
            "option_set",
            "description",
        ])?;

        for entity in &self.entities {
            for attr in &entity.attributes {
                writer.write_record([
                    entity.name.as_str(),
                    attr.name.as_str(),
                    attr.display_name.as_str(),
                    attr.target_type.as_str(),
                    attr.semantic_type.keyword(),
                    bool_cell(attr.is_primary_key),
                    bool_cell(attr.is_foreign_key),
                    bool_cell(attr.required),
                    bool_cell(attr.is_unique),
                    attr.lookup_target.as_deref().unwrap_or(""),
                    attr.option_set.as_deref().unwrap_or(""),
                    attr.description.as_deref().unwrap_or(""),
                ])?;
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| ErdError::Encoding(e.utf8_error()))
    }
}

fn bool_cell(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Maps models to [`ExportedSchema`].
#[derive(Debug, Clone, Default)]
pub struct SchemaExporter {
    config: ExportConfig,
}

impl SchemaExporter {
    /// Create an exporter with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an exporter with specific settings.
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Export a model. Never fails; problems are attached as issues.
    pub fn export(&self, model: &SchemaModel) -> ExportedSchema {
        let mut issues = Vec::new();

        let entities: Vec<ExportedEntity> = model
            .entities
            .iter()
            .enumerate()
            .map(|(ei, entity)| ExportedEntity {
                name: entity.name.clone(),
                display_name: entity.display_name.clone(),
                primary_key: entity.primary_key().map(|a| a.name.clone()),
                attributes: entity
                    .attributes
                    .iter()
                    .enumerate()
                    .map(|(ai, attr)| self.export_attribute(model, entity, ei, ai, attr, &mut issues))
                    .collect(),
                synthesized: entity.synthesized,
            })
            .collect();

        let mut relationships = Vec::new();
        for (i, rel) in model.relationships.iter().enumerate() {
            let (Some(one), Some(many)) = (rel.referenced_entity(), rel.referencing_entity()) else {
                issues.push(
                    ValidationIssue::new(
                        IssueKind::UnresolvedManyToMany,
                        Subject::Relationship {
                            source: rel.source.clone(),
                            target: rel.target.clone(),
                            label: rel.label.clone(),
                            index: i,
                        },
                        format!(
                            "Many-to-many relationship '{}' -> '{}' was not resolved and is omitted",
                            rel.source, rel.target
                        ),
                    )
                    .with_line(rel.line)
                    .with_rule("exporter"),
                );
                continue;
            };

            let referencing_attribute = model.entity(many).and_then(|e| {
                e.attributes
                    .iter()
                    .find(|a| a.is_foreign_key && references_entity(&a.name, one))
                    .map(|a| a.name.clone())
            });

            relationships.push(ExportedRelationship {
                referenced_entity: one.to_string(),
                referencing_entity: many.to_string(),
                referencing_attribute,
                label: rel.label.clone(),
                identifying: rel.identifying,
            });
        }

        let option_sets = model
            .option_sets
            .iter()
            .map(|set| ExportedOptionSet {
                name: set.name.clone(),
                display_name: set
                    .display_name
                    .clone()
                    .unwrap_or_else(|| crate::schema::title_case(&set.name)),
                options: set
                    .options
                    .iter()
                    .enumerate()
                    .map(|(i, o)| ExportedOption {
                        label: o.label.clone(),
                        value: o
                            .value
                            .unwrap_or(self.config.option_value_base.saturating_add(i as i64)),
                    })
                    .collect(),
            })
            .collect();

        assign_ids(&mut issues);
        debug!(
            entities = entities.len(),
            relationships = relationships.len(),
            issues = issues.len(),
            "Exported schema"
        );

        ExportedSchema {
            entities,
            relationships,
            option_sets,
            issues,
        }
    }

    fn export_attribute(
        &self,
        model: &SchemaModel,
        entity: &Entity,
        entity_index: usize,
        index: usize,
        attr: &Attribute,
        issues: &mut Vec<ValidationIssue>,
    ) -> ExportedAttribute {
        let mapped = target_type(attr.semantic_type);
        if mapped.is_none() {
            issues.push(
                ValidationIssue::new(
                    IssueKind::UnmappedType,
                    Subject::Attribute {
                        entity: entity.name.clone(),
                        attribute: attr.name.clone(),
                        entity_index,
                        index,
                    },
                    format!(
                        "Type '{}' of '{}.{}' has no mapping; exported as {}",
                        attr.raw_type.as_deref().unwrap_or(attr.semantic_type.keyword()),
                        entity.name,
                        attr.name,
                        FALLBACK_TYPE.as_str()
                    ),
                )
                .with_line(attr.line)
                .with_rule("exporter"),
            );
        }

        let lookup_target = if attr.is_foreign_key {
            find_lookup_target(model, entity, attr)
        } else {
            None
        };
        let target = if lookup_target.is_some() {
            TargetType::Lookup
        } else {
            mapped.unwrap_or(FALLBACK_TYPE)
        };

        let (max_length, precision) = type_parameters(attr);

        ExportedAttribute {
            name: attr.name.clone(),
            display_name: crate::schema::title_case(&attr.name),
            target_type: target,
            semantic_type: attr.semantic_type,
            is_primary_key: attr.is_primary_key,
            is_foreign_key: attr.is_foreign_key,
            is_unique: attr.is_unique,
            required: attr.is_primary_key,
            lookup_target,
            option_set: attr.option_set.clone(),
            max_length,
            precision,
            description: attr.description.clone(),
        }
    }
}

/// The entity a foreign key points at, through the relationships of its owner.
fn find_lookup_target(model: &SchemaModel, entity: &Entity, attr: &Attribute) -> Option<String> {
    model
        .relationships_of(&entity.name)
        .filter(|r| r.cardinality != Cardinality::ManyToMany)
        .filter(|r| r.referencing_entity().is_some_and(|m| crate::schema::normalize_key(m) == entity.key()))
        .filter_map(|r| r.referenced_entity())
        .find(|one| references_entity(&attr.name, one))
        .map(|one| one.to_string())
}

/// `varchar(255)` gives a max length; `decimal(10,2)` gives a precision.
fn type_parameters(attr: &Attribute) -> (Option<u32>, Option<u32>) {
    let Some(caps) = attr.raw_type.as_deref().and_then(|t| TYPE_PARAMS.captures(t)) else {
        return (None, None);
    };
    let first = caps.get(1).and_then(|m| m.as_str().parse().ok());
    let second = caps.get(2).and_then(|m| m.as_str().parse().ok());

    match attr.semantic_type {
        t if t.is_textual() => (first, None),
        SemanticType::Decimal | SemanticType::Money | SemanticType::Float => (None, second),
        _ => (None, None),
    }
}
