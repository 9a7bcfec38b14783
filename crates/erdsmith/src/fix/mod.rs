//! Auto-fix engine for resolving validation issues.

mod engine;
mod operations;

pub use engine::{AutoFixEngine, FixOutcome};
pub use operations::{AutoFix, FixOperation};
