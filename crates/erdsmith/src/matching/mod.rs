//! Advisory matching against a catalog of standard entities.

mod catalog;
mod matcher;

pub use catalog::{infer_role, AttributeRole, CanonicalAttribute, StandardCatalog, StandardEntity};
pub use matcher::{StandardEntityMatch, StandardEntityMatcher};
