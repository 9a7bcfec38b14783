//! Schema types for representing the entity-relationship model.

mod entity;
mod model;
mod types;

pub use entity::{Attribute, Entity};
pub use model::{OptionSet, OptionValue, Relationship, SchemaModel};
pub use types::{Cardinality, Multiplicity, SemanticType};

/// Case-insensitive comparison key for entity and attribute names.
pub fn normalize_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Lowercase key with every non-alphanumeric character removed.
///
/// Used for fuzzy comparisons where `customer_id`, `CustomerId` and
/// `customer-id` should all agree.
pub fn compact_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Derive a display name from an identifier (`CUSTOMER_ORDER` -> `Customer Order`).
pub fn title_case(identifier: &str) -> String {
    let mut words = Vec::new();
    for part in identifier.split(|c: char| c == '_' || c == '-' || c.is_whitespace()) {
        if part.is_empty() {
            continue;
        }
        // Split camelCase / PascalCase parts, but leave SHOUTING parts whole.
        let mut current = String::new();
        let chars: Vec<char> = part.chars().collect();
        for (i, c) in chars.iter().enumerate() {
            let boundary = i > 0
                && c.is_uppercase()
                && (chars[i - 1].is_lowercase()
                    || (chars[i - 1].is_uppercase()
                        && chars.get(i + 1).is_some_and(|n| n.is_lowercase())));
            if boundary && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            current.push(*c);
        }
        if !current.is_empty() {
            words.push(current);
        }
    }

    words
        .iter()
        .map(|w| {
            let lower = w.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("CUSTOMER"), "Customer");
        assert_eq!(title_case("order_line"), "Order Line");
        assert_eq!(title_case("customerOrder"), "Customer Order");
        assert_eq!(title_case("HTTPRequest"), "Http Request");
    }

    #[test]
    fn test_keys() {
        assert_eq!(normalize_key(" Email "), "email");
        assert_eq!(compact_key("Customer-Id"), "customerid");
        assert_eq!(compact_key("customer_id"), compact_key("CustomerID"));
    }
}
