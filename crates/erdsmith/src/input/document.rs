//! Structural tokens produced by the parser.

use serde::{Deserialize, Serialize};

use crate::schema::{normalize_key, Multiplicity};

/// Key marker written after an attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyMarker {
    Pk,
    Fk,
    Uk,
}

impl KeyMarker {
    /// Parse a marker word, case-insensitively.
    pub fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "PK" => Some(KeyMarker::Pk),
            "FK" => Some(KeyMarker::Fk),
            "UK" => Some(KeyMarker::Uk),
            _ => None,
        }
    }
}

/// A tokenized attribute line inside an entity block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeLine {
    /// Line number (1-based).
    pub line: usize,
    /// The line as written, trimmed.
    pub raw: String,
    /// Type keyword, absent for bare-name lines.
    pub type_keyword: Option<String>,
    /// Attribute name.
    pub name: String,
    /// Key markers in the order written.
    pub keys: Vec<KeyMarker>,
    /// Quoted comment.
    pub comment: Option<String>,
}

impl AttributeLine {
    /// Returns true if the given marker was written.
    pub fn has_key(&self, marker: KeyMarker) -> bool {
        self.keys.contains(&marker)
    }
}

/// An entity block (or bare entity reference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDecl {
    /// Entity name.
    pub name: String,
    /// Display alias from `NAME["Alias"]`.
    pub alias: Option<String>,
    /// First line of the declaration.
    pub line_start: usize,
    /// Last line of the declaration.
    pub line_end: usize,
    /// Attribute lines in order.
    pub attributes: Vec<AttributeLine>,
}

/// A relationship line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipDecl {
    /// Entity on the left of the markers.
    pub left: String,
    /// Left-hand multiplicity.
    pub left_multiplicity: Multiplicity,
    /// `--` rather than `..`.
    pub identifying: bool,
    /// Right-hand multiplicity.
    pub right_multiplicity: Multiplicity,
    /// Entity on the right of the markers.
    pub right: String,
    /// Label after `:`, unquoted.
    pub label: Option<String>,
    /// Line number (1-based).
    pub line: usize,
}

/// A block or line that could not be parsed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxError {
    /// First line of the skipped region.
    pub line_start: usize,
    /// Last line of the skipped region.
    pub line_end: usize,
    /// What went wrong.
    pub message: String,
}

impl SyntaxError {
    pub(crate) fn new(line_start: usize, line_end: usize, message: impl Into<String>) -> Self {
        Self {
            line_start,
            line_end,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line_start == self.line_end {
            write!(f, "line {}: {}", self.line_start, self.message)
        } else {
            write!(f, "lines {}-{}: {}", self.line_start, self.line_end, self.message)
        }
    }
}

/// Everything recovered from one input document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub entities: Vec<EntityDecl>,
    pub relationships: Vec<RelationshipDecl>,
    pub syntax_errors: Vec<SyntaxError>,
}

impl ParsedDocument {
    /// Number of distinct entities recovered, counting both declared blocks
    /// and entities named by relationship lines.
    pub fn recoverable_entity_count(&self) -> usize {
        let mut seen = std::collections::HashSet::new();
        for decl in &self.entities {
            seen.insert(normalize_key(&decl.name));
        }
        for rel in &self.relationships {
            seen.insert(normalize_key(&rel.left));
            seen.insert(normalize_key(&rel.right));
        }
        seen.len()
    }

    /// Returns true if nothing usable was recovered.
    pub fn is_rejected(&self) -> bool {
        self.recoverable_entity_count() == 0
    }
}
