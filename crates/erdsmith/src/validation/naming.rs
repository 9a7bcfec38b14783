//! Naming policy: valid identifiers, reserved names and name repair.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::NamingConfig;
use crate::schema::compact_key;

static VALID_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("name pattern is valid"));

/// Platform system tables an entity may not shadow (compact form).
const RESERVED_ENTITIES: &[&str] = &[
    "activitypointer",
    "annotation",
    "asyncoperation",
    "businessunit",
    "organization",
    "plugin",
    "privilege",
    "publisher",
    "queue",
    "role",
    "solution",
    "systemuser",
    "team",
    "transactioncurrency",
    "user",
    "workflow",
];

/// Columns the platform manages on every entity (compact form).
const RESERVED_ATTRIBUTES: &[&str] = &[
    "createdby",
    "createdon",
    "exchangerate",
    "importsequencenumber",
    "modifiedby",
    "modifiedon",
    "overriddencreatedon",
    "ownerid",
    "owningbusinessunit",
    "owningteam",
    "owninguser",
    "timezoneruleversionnumber",
    "transactioncurrencyid",
    "utcconversiontimezonecode",
    "versionnumber",
];

/// Columns replaced by the platform's built-in state handling (compact form).
const STATUS_COLUMNS: &[&str] = &["status", "statecode", "statuscode"];

/// Naming rules shared by the validator and the fix engine.
#[derive(Debug, Clone, PartialEq)]
pub struct NamingPolicy {
    config: NamingConfig,
    caller_reserved: BTreeSet<String>,
}

impl NamingPolicy {
    /// Create a policy from configuration.
    pub fn new(config: NamingConfig) -> Self {
        Self {
            config,
            caller_reserved: BTreeSet::new(),
        }
    }

    /// Extend the reserved entity names with names already taken by the caller.
    pub fn with_reserved_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.caller_reserved.extend(
            names
                .into_iter()
                .map(|n| compact_key(n.as_ref()))
                .filter(|n| !n.is_empty()),
        );
        self
    }

    /// The underlying configuration.
    pub fn config(&self) -> &NamingConfig {
        &self.config
    }

    /// Maximum entity name length.
    pub fn max_entity_len(&self) -> usize {
        self.config.max_entity_name_length
    }

    /// Maximum attribute name length.
    pub fn max_attribute_len(&self) -> usize {
        self.config.max_attribute_name_length
    }

    /// Name used for injected primary keys.
    pub fn primary_key_name(&self) -> &str {
        &self.config.primary_key_name
    }

    /// Returns true if the name is a letter followed by letters, digits or `_`.
    pub fn is_valid_name(name: &str) -> bool {
        VALID_NAME.is_match(name)
    }

    /// Returns true if the entity name collides with a platform or caller-reserved name.
    pub fn is_reserved_entity(&self, name: &str) -> bool {
        let key = compact_key(name);
        RESERVED_ENTITIES.contains(&key.as_str()) || self.caller_reserved.contains(&key)
    }

    /// Returns true if the attribute name collides with a platform-managed column.
    pub fn is_reserved_attribute(name: &str) -> bool {
        RESERVED_ATTRIBUTES.contains(&compact_key(name).as_str())
    }

    /// Returns true if the attribute looks like a status/state column.
    pub fn is_status_column(name: &str) -> bool {
        STATUS_COLUMNS.contains(&compact_key(name).as_str())
    }

    /// Conventional foreign-key name for references to an entity: `customer_id`.
    pub fn foreign_key_name(entity: &str) -> String {
        format!("{}_id", Self::sanitize(entity, "entity_").to_lowercase())
    }

    /// Replace invalid characters with `_` and make the name start with a letter.
    pub fn sanitize(name: &str, prefix: &str) -> String {
        let mut out = String::with_capacity(name.len());
        for c in name.chars() {
            let c = if c.is_ascii_alphanumeric() { c } else { '_' };
            if c == '_' && out.ends_with('_') {
                continue;
            }
            out.push(c);
        }
        let out = out.trim_matches('_');

        match out.chars().next() {
            None => "unnamed".to_string(),
            Some(first) if first.is_ascii_alphabetic() => out.to_string(),
            Some(_) => format!("{}{}", prefix, out),
        }
    }

    /// Cut a name to `max` characters without leaving a trailing `_`.
    pub fn truncate(name: &str, max: usize) -> String {
        let cut: String = name.chars().take(max).collect();
        let trimmed = cut.trim_end_matches('_');
        if trimmed.is_empty() {
            cut
        } else {
            trimmed.to_string()
        }
    }

    /// Append `_2`, `_3`, ... until `is_taken` rejects nothing, staying within `max`.
    pub fn uniquify(base: &str, max: usize, is_taken: impl Fn(&str) -> bool) -> String {
        if !is_taken(base) {
            return base.to_string();
        }
        let mut n = 2usize;
        loop {
            let suffix = format!("_{}", n);
            let stem = Self::truncate(base, max.saturating_sub(suffix.len()).max(1));
            let candidate = format!("{}{}", stem, suffix);
            if !is_taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Repair an entity name: sanitize, avoid reserved names, truncate and uniquify
    /// against `taken` (compared case-insensitively).
    pub fn fit_entity_name(&self, candidate: &str, taken: &[String]) -> String {
        let mut name = Self::sanitize(candidate, "entity_");
        if self.is_reserved_entity(&name) {
            name = format!("{}_{}", self.config.reserved_entity_prefix, name);
            name = Self::sanitize(&name, "entity_");
        }
        let name = Self::truncate(&name, self.max_entity_len());
        let taken: BTreeSet<String> = taken.iter().map(|t| t.to_lowercase()).collect();
        Self::uniquify(&name, self.max_entity_len(), |c| {
            taken.contains(&c.to_lowercase()) || self.is_reserved_entity(c)
        })
    }

    /// Repair an attribute name the same way, within one entity.
    pub fn fit_attribute_name(&self, candidate: &str, taken: &[String]) -> String {
        let name = Self::sanitize(candidate, "col_");
        let name = Self::truncate(&name, self.max_attribute_len());
        let taken: BTreeSet<String> = taken.iter().map(|t| t.to_lowercase()).collect();
        Self::uniquify(&name, self.max_attribute_len(), |c| {
            taken.contains(&c.to_lowercase()) || Self::is_reserved_attribute(c)
        })
    }
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self::new(NamingConfig::default())
    }
}
