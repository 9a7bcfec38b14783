//! Export of finalized models to a target-neutral schema.

mod exporter;

pub use exporter::{
    target_type, ExportedAttribute, ExportedEntity, ExportedOption, ExportedOptionSet,
    ExportedRelationship, ExportedSchema, SchemaExporter, TargetType,
};
