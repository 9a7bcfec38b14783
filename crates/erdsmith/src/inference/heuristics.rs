//! Type keyword normalization and name-based type heuristics.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::schema::SemanticType;

/// One name-pattern heuristic.
#[derive(Debug, Clone)]
pub struct TypeHeuristic {
    /// Pattern tested against the attribute name.
    pub pattern: Regex,
    /// Type assigned on match.
    pub target: SemanticType,
    /// Also applies to attributes explicitly typed as a generic string.
    pub refines_string: bool,
}

impl TypeHeuristic {
    fn new(pattern: &str, target: SemanticType, refines_string: bool) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("heuristic pattern is valid"),
            target,
            refines_string,
        }
    }
}

/// Ordered heuristics; the first matching entry wins.
static HEURISTICS: Lazy<Vec<TypeHeuristic>> = Lazy::new(|| {
    vec![
        // Refine generic strings
        TypeHeuristic::new(r"(?i)e[-_]?mail", SemanticType::Email, true),
        TypeHeuristic::new(r"(?i)(url|uri$|website|web_site|homepage|home_page)", SemanticType::Url, true),
        TypeHeuristic::new(r"(?i)(phone|telephone|^tel$|^tel_|_tel$|mobile|fax)", SemanticType::Phone, true),

        // Untyped names only
        TypeHeuristic::new(r"(?i)^(id|guid|uuid)$|_(id|guid|uuid)$", SemanticType::Guid, false),
        TypeHeuristic::new(r"[a-z]Id$", SemanticType::Guid, false),
        TypeHeuristic::new(r"(?i)^(is|has|can|allow)_", SemanticType::Boolean, false),
        TypeHeuristic::new(r"^(is|has|can)[A-Z]", SemanticType::Boolean, false),
        TypeHeuristic::new(r"(?i)(_at$|time|timestamp)", SemanticType::DateTime, false),
        TypeHeuristic::new(r"(?i)(^|_)date|date$|_on$|birthday|^dob$", SemanticType::Date, false),
        TypeHeuristic::new(r"(?i)(amount|price|cost|total|revenue|salary|balance)", SemanticType::Money, false),
        TypeHeuristic::new(r"(?i)(count|qty|quantity|number_of|^num_)", SemanticType::Integer, false),
    ]
});

/// All heuristics in evaluation order.
pub fn heuristics() -> &'static [TypeHeuristic] {
    &HEURISTICS
}

/// Strip parameters and array suffixes: `varchar(255)` -> `varchar`.
fn base_keyword(keyword: &str) -> String {
    let base = keyword.split('(').next().unwrap_or(keyword);
    base.trim_end_matches("[]").trim().to_lowercase()
}

/// Map an explicit type keyword to a semantic type.
pub fn normalize_type_keyword(keyword: &str) -> SemanticType {
    match base_keyword(keyword).as_str() {
        "string" | "varchar" | "nvarchar" | "char" | "nchar" | "str" => SemanticType::String,
        "text" | "memo" | "longtext" | "ntext" | "clob" => SemanticType::Text,
        "int" | "integer" | "bigint" | "smallint" | "tinyint" | "long" | "number" | "serial" => {
            SemanticType::Integer
        }
        "decimal" | "numeric" => SemanticType::Decimal,
        "float" | "double" | "real" => SemanticType::Float,
        "money" | "currency" => SemanticType::Money,
        "bool" | "boolean" | "bit" => SemanticType::Boolean,
        "datetime" | "timestamp" | "datetime2" => SemanticType::DateTime,
        "date" => SemanticType::Date,
        "email" => SemanticType::Email,
        "phone" => SemanticType::Phone,
        "url" | "uri" => SemanticType::Url,
        "choice" | "picklist" | "optionset" | "enum" => SemanticType::Choice,
        "guid" | "uuid" | "uniqueidentifier" => SemanticType::Guid,
        _ => SemanticType::Unknown,
    }
}

/// Infer the semantic type of an attribute from its keyword and name.
pub fn infer_type(type_keyword: Option<&str>, name: &str) -> SemanticType {
    match type_keyword {
        Some(keyword) => {
            let explicit = normalize_type_keyword(keyword);
            if explicit != SemanticType::String {
                return explicit;
            }
            heuristics()
                .iter()
                .filter(|h| h.refines_string)
                .find(|h| h.pattern.is_match(name))
                .map_or(SemanticType::String, |h| h.target)
        }
        None => heuristics()
            .iter()
            .find(|h| h.pattern.is_match(name))
            .map_or(SemanticType::String, |h| h.target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_normalization() {
        assert_eq!(normalize_type_keyword("varchar(255)"), SemanticType::String);
        assert_eq!(normalize_type_keyword("decimal(10,2)"), SemanticType::Decimal);
        assert_eq!(normalize_type_keyword("INT"), SemanticType::Integer);
        assert_eq!(normalize_type_keyword("uuid"), SemanticType::Guid);
        assert_eq!(normalize_type_keyword("geometry"), SemanticType::Unknown);
    }

    #[test]
    fn test_string_refinement() {
        assert_eq!(infer_type(Some("string"), "email"), SemanticType::Email);
        assert_eq!(infer_type(Some("varchar"), "website"), SemanticType::Url);
        assert_eq!(infer_type(Some("string"), "mobile_phone"), SemanticType::Phone);
        // Only refining heuristics apply to explicit strings
        assert_eq!(infer_type(Some("string"), "customer_id"), SemanticType::String);
        assert_eq!(infer_type(Some("string"), "name"), SemanticType::String);
    }

    #[test]
    fn test_explicit_types_are_kept() {
        assert_eq!(infer_type(Some("int"), "email_count"), SemanticType::Integer);
        assert_eq!(infer_type(Some("text"), "email"), SemanticType::Text);
    }

    #[test]
    fn test_untyped_heuristics() {
        assert_eq!(infer_type(None, "customer_id"), SemanticType::Guid);
        assert_eq!(infer_type(None, "customerId"), SemanticType::Guid);
        assert_eq!(infer_type(None, "is_active"), SemanticType::Boolean);
        assert_eq!(infer_type(None, "created_at"), SemanticType::DateTime);
        assert_eq!(infer_type(None, "birth_date"), SemanticType::Date);
        assert_eq!(infer_type(None, "total_amount"), SemanticType::Money);
        assert_eq!(infer_type(None, "item_count"), SemanticType::Integer);
        assert_eq!(infer_type(None, "nickname"), SemanticType::String);
    }

    #[test]
    fn test_first_match_wins() {
        // email precedes the id heuristic
        assert_eq!(infer_type(None, "email_id"), SemanticType::Email);
        assert_eq!(infer_type(None, "telephone"), SemanticType::Phone);
    }
}
