//! Validation issue types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind of validation issue. The set is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// A block or line the parser skipped.
    SyntaxError,
    /// Entity with no attributes.
    EmptyEntity,
    /// Entity with no primary key.
    MissingPrimaryKey,
    /// More than one attribute declared as primary key.
    MultiplePrimaryKeys,
    /// Two attributes share a name within an entity.
    DuplicateColumns,
    /// Two entity blocks share a name.
    DuplicateEntity,
    /// Entity name breaks the naming policy.
    InvalidEntityName,
    /// Attribute name breaks the naming policy.
    InvalidAttributeName,
    /// Entity name longer than allowed.
    EntityNameTooLong,
    /// Attribute name longer than allowed.
    AttributeNameTooLong,
    /// Entity name collides with a platform or caller-reserved name.
    ReservedEntityName,
    /// Attribute name collides with a platform-managed column.
    ReservedAttributeName,
    /// Status-like column superseded by built-in state handling.
    StatusColumnIgnored,
    /// Choice attribute without a usable option set.
    ChoiceDowngraded,
    /// Option set with no options.
    EmptyOptionSet,
    /// Option label repeated within an option set.
    DuplicateOption,
    /// Relationship endpoint not declared as an entity.
    MissingEntity,
    /// Relationship from an entity to itself.
    SelfReferencingRelationship,
    /// Same (source, target, label) written twice.
    DuplicateRelationship,
    /// Same link written again in the opposite direction.
    RedundantRelationship,
    /// Relationship without a label.
    MissingRelationshipLabel,
    /// Many on both sides.
    ManyToManyDetected,
    /// One on both sides, treated as one-to-many.
    OneToOneDowngraded,
    /// Many side has no foreign key to the one side.
    MissingForeignKey,
    /// Foreign key not backed by any relationship.
    OrphanForeignKey,
    /// Semantic type with no export mapping.
    UnmappedType,
    /// Many-to-many relationship reached the exporter.
    UnresolvedManyToMany,
}

impl IssueKind {
    /// Stable snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::SyntaxError => "syntax_error",
            IssueKind::EmptyEntity => "empty_entity",
            IssueKind::MissingPrimaryKey => "missing_primary_key",
            IssueKind::MultiplePrimaryKeys => "multiple_primary_keys",
            IssueKind::DuplicateColumns => "duplicate_columns",
            IssueKind::DuplicateEntity => "duplicate_entity",
            IssueKind::InvalidEntityName => "invalid_entity_name",
            IssueKind::InvalidAttributeName => "invalid_attribute_name",
            IssueKind::EntityNameTooLong => "entity_name_too_long",
            IssueKind::AttributeNameTooLong => "attribute_name_too_long",
            IssueKind::ReservedEntityName => "reserved_entity_name",
            IssueKind::ReservedAttributeName => "reserved_attribute_name",
            IssueKind::StatusColumnIgnored => "status_column_ignored",
            IssueKind::ChoiceDowngraded => "choice_downgraded",
            IssueKind::EmptyOptionSet => "empty_option_set",
            IssueKind::DuplicateOption => "duplicate_option",
            IssueKind::MissingEntity => "missing_entity",
            IssueKind::SelfReferencingRelationship => "self_referencing_relationship",
            IssueKind::DuplicateRelationship => "duplicate_relationship",
            IssueKind::RedundantRelationship => "redundant_relationship",
            IssueKind::MissingRelationshipLabel => "missing_relationship_label",
            IssueKind::ManyToManyDetected => "many_to_many_detected",
            IssueKind::OneToOneDowngraded => "one_to_one_downgraded",
            IssueKind::MissingForeignKey => "missing_foreign_key",
            IssueKind::OrphanForeignKey => "orphan_foreign_key",
            IssueKind::UnmappedType => "unmapped_type",
            IssueKind::UnresolvedManyToMany => "unresolved_many_to_many",
        }
    }

    /// Severity an issue of this kind carries.
    pub fn default_severity(&self) -> Severity {
        match self {
            IssueKind::SyntaxError
            | IssueKind::EmptyEntity
            | IssueKind::MissingPrimaryKey
            | IssueKind::MultiplePrimaryKeys
            | IssueKind::EmptyOptionSet
            | IssueKind::MissingEntity
            | IssueKind::UnresolvedManyToMany => Severity::Error,
            IssueKind::StatusColumnIgnored
            | IssueKind::ChoiceDowngraded
            | IssueKind::OneToOneDowngraded => Severity::Info,
            _ => Severity::Warning,
        }
    }

    /// Whether the auto-fix engine knows how to resolve this kind.
    pub fn fixable_by_default(&self) -> bool {
        !matches!(
            self,
            IssueKind::SyntaxError
                | IssueKind::EmptyEntity
                | IssueKind::EmptyOptionSet
                | IssueKind::OneToOneDowngraded
                | IssueKind::OrphanForeignKey
                | IssueKind::UnmappedType
                | IssueKind::UnresolvedManyToMany
        )
    }
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity level of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; applied automatically.
    Info,
    /// Should be reviewed.
    Warning,
    /// Must be addressed before export.
    Error,
}

impl Severity {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
        }
    }
}

/// What an issue is about.
///
/// Indices refer to positions in the model the issue was raised against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Subject {
    /// The document as a whole.
    Document,
    /// An entity (or a name used as one).
    Entity {
        entity: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        index: Option<usize>,
    },
    /// An attribute of an entity.
    Attribute {
        entity: String,
        attribute: String,
        entity_index: usize,
        index: usize,
    },
    /// A relationship.
    Relationship {
        source: String,
        target: String,
        label: String,
        index: usize,
    },
    /// An option set.
    OptionSet { name: String, index: usize },
}

impl Subject {
    /// Subject for an entity at a known position.
    pub fn entity(entity: impl Into<String>, index: usize) -> Self {
        Subject::Entity {
            entity: entity.into(),
            index: Some(index),
        }
    }

    /// Name-only key, independent of positions.
    pub fn key(&self) -> String {
        match self {
            Subject::Document => "document".to_string(),
            Subject::Entity { entity, .. } => format!("entity:{}", entity),
            Subject::Attribute { entity, attribute, .. } => {
                format!("attribute:{}.{}", entity, attribute)
            }
            Subject::Relationship { source, target, label, .. } => {
                format!("relationship:{}->{}:{}", source, target, label)
            }
            Subject::OptionSet { name, .. } => format!("option_set:{}", name),
        }
    }

    /// Entity name the subject belongs to, if any.
    pub fn entity_name(&self) -> Option<&str> {
        match self {
            Subject::Entity { entity, .. } | Subject::Attribute { entity, .. } => Some(entity),
            _ => None,
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subject::Document => f.write_str("document"),
            Subject::Entity { entity, .. } => write!(f, "{}", entity),
            Subject::Attribute { entity, attribute, .. } => write!(f, "{}.{}", entity, attribute),
            Subject::Relationship { source, target, label, .. } if label.is_empty() => {
                write!(f, "{} -> {}", source, target)
            }
            Subject::Relationship { source, target, label, .. } => {
                write!(f, "{} -> {} ({})", source, target, label)
            }
            Subject::OptionSet { name, .. } => write!(f, "option set {}", name),
        }
    }
}

/// A problem found in a schema model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Identifier derived from kind, subject and occurrence.
    pub id: String,
    /// Kind of issue.
    pub kind: IssueKind,
    /// Severity level.
    pub severity: Severity,
    /// What the issue is about.
    pub subject: Subject,
    /// Whether the auto-fix engine will resolve it.
    pub auto_fixable: bool,
    /// Human-readable description.
    pub message: String,
    /// Source line, when known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<usize>,
    /// Rule that raised the issue.
    #[serde(default)]
    pub rule: String,
}

impl ValidationIssue {
    /// Create an issue with the kind's default severity and fixability.
    pub fn new(kind: IssueKind, subject: Subject, message: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            kind,
            severity: kind.default_severity(),
            subject,
            auto_fixable: kind.fixable_by_default(),
            message: message.into(),
            line: None,
            rule: String::new(),
        }
    }

    /// Set the source line.
    pub fn with_line(mut self, line: Option<usize>) -> Self {
        self.line = line;
        self
    }

    /// Override fixability.
    pub fn with_fixable(mut self, fixable: bool) -> Self {
        self.auto_fixable = fixable;
        self
    }

    /// Set the rule name.
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = rule.into();
        self
    }

    /// Derive the id from kind, subject key and occurrence number.
    pub(crate) fn assign_id(&mut self, occurrence: usize) {
        let mut hasher = Sha256::new();
        hasher.update(self.kind.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(self.subject.key().as_bytes());
        hasher.update(b"|");
        hasher.update(occurrence.to_string().as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        self.id = format!("iss_{}", &digest[..12]);
    }
}
