//! Input source metadata.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::document::ParsedDocument;

/// Metadata about a compiled diagram source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// File name without path, when read from disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Full path to the file, when read from disk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// SHA-256 hash of the text.
    pub hash: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Number of lines.
    pub line_count: usize,
    /// Entity blocks recovered.
    pub entity_declarations: usize,
    /// Relationship lines recovered.
    pub relationship_declarations: usize,
    /// Blocks or lines skipped.
    pub syntax_errors: usize,
}

impl SourceMetadata {
    /// Describe in-memory text that has been parsed.
    pub fn from_text(text: &str, document: &ParsedDocument) -> Self {
        Self {
            file: None,
            path: None,
            hash: content_hash(text),
            size_bytes: text.len() as u64,
            line_count: text.lines().count(),
            entity_declarations: document.entities.len(),
            relationship_declarations: document.relationships.len(),
            syntax_errors: document.syntax_errors.len(),
        }
    }

    /// Attach the file the text was read from.
    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.file = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned());
        self.path = Some(path);
        self
    }
}

/// Compute the `sha256:<hex>` digest of some text.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("sha256:{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        let a = content_hash("CUSTOMER { string name }");
        let b = content_hash("CUSTOMER { string name }");
        assert_eq!(a, b);
        assert!(a.starts_with("sha256:"));
        assert_eq!(a.len(), "sha256:".len() + 64);
    }

    #[test]
    fn test_with_path() {
        let meta = SourceMetadata::from_text("A { }", &ParsedDocument::default())
            .with_path(PathBuf::from("/tmp/model.mmd"));
        assert_eq!(meta.file.as_deref(), Some("model.mmd"));
        assert_eq!(meta.line_count, 1);
    }
}
