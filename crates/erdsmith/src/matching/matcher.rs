//! Fuzzy matching of model entities against the standard-entity catalog.

use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MatcherConfig;
use crate::schema::{compact_key, Entity, SchemaModel};

use super::catalog::{infer_role, StandardCatalog, StandardEntity};

/// Confidence for a synonym match.
const SYNONYM_SCORE: f64 = 0.9;
/// Edit-distance similarity below this counts as no similarity.
const MIN_FUZZY_SIMILARITY: f64 = 0.5;

/// A candidate standard entity for a model entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardEntityMatch {
    /// Model entity name.
    pub entity: String,
    /// Catalog entry id.
    pub candidate_id: String,
    /// Catalog entry display name.
    pub candidate_name: String,
    /// Combined confidence (0.0-1.0).
    pub confidence: f64,
    /// Name similarity component.
    pub name_score: f64,
    /// Attribute role overlap component.
    pub attribute_score: f64,
    /// Model attributes whose role the candidate also carries.
    pub overlapping_attributes: Vec<String>,
}

/// Scores entities against a catalog. Never modifies the model.
#[derive(Debug, Clone)]
pub struct StandardEntityMatcher {
    catalog: Arc<StandardCatalog>,
    config: MatcherConfig,
}

impl StandardEntityMatcher {
    /// Create a matcher over the built-in catalog.
    pub fn new() -> Self {
        Self {
            catalog: StandardCatalog::builtin(),
            config: MatcherConfig::default(),
        }
    }

    /// Create a matcher with specific settings.
    pub fn from_config(config: &MatcherConfig) -> Self {
        Self {
            catalog: StandardCatalog::builtin(),
            config: config.clone(),
        }
    }

    /// Use a caller-supplied catalog.
    pub fn with_catalog(mut self, catalog: Arc<StandardCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    /// The catalog in use.
    pub fn catalog(&self) -> &StandardCatalog {
        &self.catalog
    }

    /// Score one entity against one catalog entry.
    pub fn score(&self, entity: &Entity, candidate: &StandardEntity) -> StandardEntityMatch {
        let name_score = name_similarity(&entity.name, candidate);

        let mut user_roles = BTreeSet::new();
        let mut matched_roles = BTreeSet::new();
        let mut overlapping = Vec::new();
        for attr in &entity.attributes {
            let Some(role) = infer_role(attr) else {
                continue;
            };
            user_roles.insert(role);
            if candidate.has_role(role) {
                matched_roles.insert(role);
                overlapping.push(attr.name.clone());
            }
        }
        let attribute_score = if user_roles.is_empty() {
            0.0
        } else {
            matched_roles.len() as f64 / user_roles.len() as f64
        };

        let confidence = if name_score >= 1.0 {
            1.0
        } else {
            let w = self.config.name_weight;
            (w * name_score + (1.0 - w) * attribute_score).clamp(0.0, 1.0)
        };

        StandardEntityMatch {
            entity: entity.name.clone(),
            candidate_id: candidate.id.clone(),
            candidate_name: candidate.display_name.clone(),
            confidence: round3(confidence),
            name_score: round3(name_score),
            attribute_score: round3(attribute_score),
            overlapping_attributes: overlapping,
        }
    }

    /// Ranked candidates for one entity, above the threshold.
    pub fn match_entity(&self, entity: &Entity) -> Vec<StandardEntityMatch> {
        let mut matches: Vec<StandardEntityMatch> = self
            .catalog
            .entities
            .iter()
            .map(|candidate| self.score(entity, candidate))
            .filter(|m| m.confidence > 0.0 && m.confidence >= self.config.threshold)
            .collect();

        matches.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.candidate_id.cmp(&b.candidate_id))
        });
        matches.truncate(self.config.max_candidates);
        matches
    }

    /// Ranked candidates for every entity, keyed by entity name in model order.
    pub fn match_model(&self, model: &SchemaModel) -> IndexMap<String, Vec<StandardEntityMatch>> {
        let results: IndexMap<String, Vec<StandardEntityMatch>> = model
            .entities
            .iter()
            .map(|e| (e.name.clone(), self.match_entity(e)))
            .collect();

        debug!(
            entities = results.len(),
            matched = results.values().filter(|m| !m.is_empty()).count(),
            "Matched against standard catalog"
        );
        results
    }
}

impl Default for StandardEntityMatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Name similarity: exact id or display name 1.0, synonym 0.9, otherwise the
/// best edit-distance similarity, floored to zero below 0.5.
fn name_similarity(name: &str, candidate: &StandardEntity) -> f64 {
    let key = compact_key(name);
    if key.is_empty() {
        return 0.0;
    }
    if key == compact_key(&candidate.id) || key == compact_key(&candidate.display_name) {
        return 1.0;
    }
    if candidate.synonyms.iter().any(|s| compact_key(s) == key) {
        return SYNONYM_SCORE;
    }

    let best = std::iter::once(&candidate.id)
        .chain(std::iter::once(&candidate.display_name))
        .chain(candidate.synonyms.iter())
        .map(|other| similarity(&key, &compact_key(other)))
        .fold(0.0, f64::max);

    // Fuzzy matches never outrank a synonym
    if best < MIN_FUZZY_SIMILARITY {
        0.0
    } else {
        best.min(SYNONYM_SCORE - 0.05)
    }
}

fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 0.0;
    }
    1.0 - levenshtein_distance(a, b) as f64 / longest as f64
}

/// Calculate Levenshtein edit distance between two strings.
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    if s1_chars.is_empty() {
        return s2_chars.len();
    }
    if s2_chars.is_empty() {
        return s1_chars.len();
    }

    let mut previous: Vec<usize> = (0..=s2_chars.len()).collect();
    let mut current = vec![0; s2_chars.len() + 1];

    for (i, c1) in s1_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, c2) in s2_chars.iter().enumerate() {
            let cost = if c1 == c2 { 0 } else { 1 };
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[s2_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Attribute, SemanticType};

    fn entity(name: &str, attrs: &[(&str, SemanticType)]) -> Entity {
        Entity::new(name).with_attributes(
            attrs
                .iter()
                .map(|(n, t)| Attribute::new(*n, *t))
                .collect(),
        )
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
        assert_eq!(levenshtein_distance("", "abc"), 3);
    }

    #[test]
    fn test_contact_scenario() {
        let contact = entity(
            "Contact",
            &[("email", SemanticType::Email), ("phone", SemanticType::Phone)],
        );
        let matches = StandardEntityMatcher::new().match_entity(&contact);
        assert_eq!(matches[0].candidate_id, "contact");
        assert!(matches[0].confidence >= 0.7);
        assert_eq!(matches[0].overlapping_attributes, vec!["email", "phone"]);
    }

    #[test]
    fn test_exact_name_is_full_confidence() {
        let m = StandardEntityMatcher::new().match_entity(&entity("ACCOUNT", &[]));
        assert_eq!(m[0].confidence, 1.0);
    }

    #[test]
    fn test_nothing_in_common_is_omitted() {
        let matcher = StandardEntityMatcher::new();
        let widget = entity("Zqxv", &[("sprocket_width", SemanticType::Integer)]);
        assert!(matcher.match_entity(&widget).is_empty());

        let candidate = matcher.catalog().get("contact").unwrap();
        assert_eq!(matcher.score(&widget, candidate).confidence, 0.0);
    }

    #[test]
    fn test_synonym_and_fuzzy() {
        let matcher = StandardEntityMatcher::new();
        let ticket = matcher.match_entity(&entity("TICKET", &[]));
        assert_eq!(ticket[0].candidate_id, "incident");
        assert_eq!(ticket[0].name_score, 0.9);

        let typo = matcher.match_entity(&entity("Contcat", &[("email", SemanticType::Email)]));
        assert_eq!(typo[0].candidate_id, "contact");
        assert!(typo[0].confidence < 0.9);
    }

    #[test]
    fn test_threshold_and_ranking() {
        let config = MatcherConfig {
            threshold: 0.95,
            ..MatcherConfig::default()
        };
        let matcher = StandardEntityMatcher::from_config(&config);
        assert!(matcher.match_entity(&entity("TICKET", &[])).is_empty());

        let matches = StandardEntityMatcher::new()
            .match_entity(&entity("Customer", &[("email", SemanticType::Email)]));
        assert!(matches.len() <= 3);
        assert!(matches.windows(2).all(|w| w[0].confidence >= w[1].confidence));
    }

    #[test]
    fn test_match_model_preserves_order() {
        let model = SchemaModel::new(vec![entity("Lead", &[]), entity("Account", &[])], vec![]);
        let results = StandardEntityMatcher::new().match_model(&model);
        let keys: Vec<&String> = results.keys().collect();
        assert_eq!(keys, vec!["Lead", "Account"]);
    }
}
