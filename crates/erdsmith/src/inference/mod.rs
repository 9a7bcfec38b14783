//! Model construction: type inference, entity building and relationship resolution.

mod builder;
mod heuristics;
mod relationship;

pub use builder::EntityModelBuilder;
pub use heuristics::{heuristics, infer_type, normalize_type_keyword, TypeHeuristic};
pub use relationship::{is_one_to_one, RelationshipResolver};
