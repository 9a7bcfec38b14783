//! Compiler configuration (erdsmith.toml).
//!
//! Every section is optional in the TOML file; missing keys fall back to
//! their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ErdError, Result};

/// Naming policy applied by validation rules and naming fixes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Maximum length of an entity name.
    pub max_entity_name_length: usize,
    /// Maximum length of an attribute name.
    pub max_attribute_name_length: usize,
    /// Name of the identifier injected for entities without a primary key.
    pub primary_key_name: String,
    /// Prefix applied to entities whose names collide with platform tables.
    pub reserved_entity_prefix: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            max_entity_name_length: 50,
            max_attribute_name_length: 50,
            primary_key_name: "id".to_string(),
            reserved_entity_prefix: "custom".to_string(),
        }
    }
}

/// Standard-entity matcher tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Candidates scoring below this are not reported.
    pub threshold: f64,
    /// Maximum candidates reported per entity.
    pub max_candidates: usize,
    /// Weight of name similarity against attribute overlap (0.0-1.0).
    pub name_weight: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            max_candidates: 3,
            name_weight: 0.65,
        }
    }
}

/// Auto-fix engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixConfig {
    /// Run the auto-fix stage during compilation.
    pub enabled: bool,
    /// Upper bound on individual fixes applied in one run.
    pub max_iterations: usize,
    /// Replace many-to-many relationships with a synthesized junction entity.
    /// When false, many-to-many patterns are reported but left for the author.
    pub synthesize_junctions: bool,
}

impl Default for FixConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_iterations: 500,
            synthesize_junctions: true,
        }
    }
}

/// Exporter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// First value assigned to option-set options without an explicit value.
    pub option_value_base: i64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            option_value_base: 100_000_000,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default)]
    pub naming: NamingConfig,

    #[serde(default)]
    pub matcher: MatcherConfig,

    #[serde(default)]
    pub fix: FixConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

impl CompilerConfig {
    /// Load config from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ErdError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&contents)
    }

    /// Load config from a TOML string.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: CompilerConfig = toml::from_str(toml)?;
        config.check()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with.
    pub fn check(&self) -> Result<()> {
        if self.naming.max_entity_name_length < 8 || self.naming.max_attribute_name_length < 8 {
            return Err(ErdError::Config(
                "name length limits must be at least 8 characters".to_string(),
            ));
        }
        if self.naming.primary_key_name.trim().is_empty() {
            return Err(ErdError::Config("primary_key_name must not be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.matcher.threshold) {
            return Err(ErdError::Config(format!(
                "matcher.threshold must be within [0, 1], got {}",
                self.matcher.threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.matcher.name_weight) {
            return Err(ErdError::Config(format!(
                "matcher.name_weight must be within [0, 1], got {}",
                self.matcher.name_weight
            )));
        }
        if i32::try_from(self.export.option_value_base).is_err() {
            return Err(ErdError::Config(format!(
                "export.option_value_base must fit in 32 bits, got {}",
                self.export.option_value_base
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.naming.primary_key_name, "id");
        assert_eq!(config.matcher.threshold, 0.3);
        assert!(config.fix.synthesize_junctions);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = CompilerConfig::from_toml(
            r#"
            [naming]
            max_entity_name_length = 24

            [fix]
            synthesize_junctions = false
            "#,
        )
        .unwrap();

        assert_eq!(config.naming.max_entity_name_length, 24);
        assert_eq!(config.naming.max_attribute_name_length, 50);
        assert!(!config.fix.synthesize_junctions);
        assert_eq!(config.fix.max_iterations, 500);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = CompilerConfig::from_toml("[matcher]\nthreshold = 1.5\n").unwrap_err();
        assert!(matches!(err, ErdError::Config(_)));
    }

    #[test]
    fn rejects_oversized_option_value_base() {
        let err = CompilerConfig::from_toml("[export]\noption_value_base = 9223372036854775807\n")
            .unwrap_err();
        assert!(matches!(err, ErdError::Config(_)));

        let config = CompilerConfig::from_toml("[export]\noption_value_base = 500\n").unwrap();
        assert_eq!(config.export.option_value_base, 500);
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = CompilerConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed = CompilerConfig::from_toml(&text).unwrap();
        assert_eq!(config, parsed);
    }
}
