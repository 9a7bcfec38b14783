//! erdsmith: compiles textual entity-relationship diagrams into validated schemas.
//!
//! A diagram is parsed with error recovery, turned into a typed model,
//! checked against a catalog of structural and naming rules, repaired by an
//! auto-fix engine, matched against a catalog of standard business entities,
//! and finally exported as a target-neutral schema.
//!
//! # Core Principles
//!
//! - **Recoverable**: A malformed block is skipped, never the whole diagram
//! - **Immutable**: Every stage returns a new model
//! - **Deterministic**: Identical input gives identical issues and exports
//!
//! # Example
//!
//! ```no_run
//! use erdsmith::{CompileOptions, ErdCompiler};
//!
//! let compiler = ErdCompiler::new();
//! let result = compiler
//!     .compile_file("model.mmd", &CompileOptions::default())
//!     .unwrap();
//!
//! println!("Entities: {}", result.model.entities.len());
//! println!("Fixes applied: {}", result.applied_fixes.len());
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod fix;
pub mod inference;
pub mod input;
pub mod matching;
pub mod schema;
pub mod validation;

mod compiler;

pub use crate::compiler::{
    CompileOptions, CompileResult, CompileSummary, ErdCompiler, IssueCounts, PipelineStage,
};
pub use config::CompilerConfig;
pub use error::{ErdError, Result};
pub use export::{ExportedSchema, SchemaExporter, TargetType};
pub use fix::{AutoFix, AutoFixEngine, FixOperation, FixOutcome};
pub use input::{ParsedDocument, Parser, SourceMetadata};
pub use matching::{StandardCatalog, StandardEntityMatch, StandardEntityMatcher};
pub use schema::{Attribute, Cardinality, Entity, OptionSet, Relationship, SchemaModel, SemanticType};
pub use validation::{IssueKind, Severity, Subject, ValidationEngine, ValidationIssue};
