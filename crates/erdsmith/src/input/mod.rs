//! Diagram parsing and source handling.

mod document;
mod parser;
mod source;

pub use document::{
    AttributeLine, EntityDecl, KeyMarker, ParsedDocument, RelationshipDecl, SyntaxError,
};
pub use parser::Parser;
pub use source::{content_hash, SourceMetadata};
