//! Standard-entity catalog and attribute roles.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::{Attribute, SemanticType};

/// What an attribute holds, independent of how it is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeRole {
    Name,
    FirstName,
    LastName,
    Email,
    Phone,
    Url,
    Address,
    City,
    PostalCode,
    Country,
    BirthDate,
    JobTitle,
    Money,
    Quantity,
    Status,
    Priority,
    Description,
    Date,
}

/// Patterns for identifying attribute roles by name. First match wins.
static ROLE_PATTERNS: Lazy<Vec<(Regex, AttributeRole)>> = Lazy::new(|| {
    let pattern = |p: &str| Regex::new(p).expect("role pattern is valid");
    vec![
        (pattern(r"(?i)e[-_]?mail"), AttributeRole::Email),
        (pattern(r"(?i)(phone|^tel$|telephone|mobile|fax)"), AttributeRole::Phone),
        (pattern(r"(?i)(url|website|homepage)"), AttributeRole::Url),
        (pattern(r"(?i)(first[-_]?name|given[-_]?name|forename)"), AttributeRole::FirstName),
        (pattern(r"(?i)(last[-_]?name|surname|family[-_]?name)"), AttributeRole::LastName),
        (pattern(r"(?i)(birth|^dob$)"), AttributeRole::BirthDate),
        (pattern(r"(?i)(job[-_]?title|position$|^role$)"), AttributeRole::JobTitle),
        (pattern(r"(?i)(name$|^title$|^subject$)"), AttributeRole::Name),
        (pattern(r"(?i)(address|street|line1)"), AttributeRole::Address),
        (pattern(r"(?i)(city|town)"), AttributeRole::City),
        (pattern(r"(?i)(postal|zip)"), AttributeRole::PostalCode),
        (pattern(r"(?i)country"), AttributeRole::Country),
        (pattern(r"(?i)(revenue|amount|price|total|budget|cost|value$)"), AttributeRole::Money),
        (pattern(r"(?i)(qty|quantity|count$)"), AttributeRole::Quantity),
        (pattern(r"(?i)(status|state|stage)"), AttributeRole::Status),
        (pattern(r"(?i)(priority|severity|urgency)"), AttributeRole::Priority),
        (pattern(r"(?i)(description|notes?$|comment|summary)"), AttributeRole::Description),
        (pattern(r"(?i)(date|_on$|_at$|deadline)"), AttributeRole::Date),
    ]
});

/// Infer the role of a user attribute from its type and name.
pub fn infer_role(attribute: &Attribute) -> Option<AttributeRole> {
    match attribute.semantic_type {
        SemanticType::Email => return Some(AttributeRole::Email),
        SemanticType::Phone => return Some(AttributeRole::Phone),
        SemanticType::Url => return Some(AttributeRole::Url),
        _ => {}
    }
    if attribute.is_primary_key || attribute.is_foreign_key {
        return None;
    }
    ROLE_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(&attribute.name))
        .map(|(_, role)| *role)
        .or(match attribute.semantic_type {
            SemanticType::Money => Some(AttributeRole::Money),
            SemanticType::Date | SemanticType::DateTime => Some(AttributeRole::Date),
            _ => None,
        })
}

/// A canonical attribute of a standard entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalAttribute {
    pub name: String,
    pub role: AttributeRole,
}

/// One entry of the standard-entity catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardEntity {
    /// Logical id (`contact`, `account`, ...).
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Alternative names.
    #[serde(default)]
    pub synonyms: Vec<String>,
    /// Canonical attributes.
    #[serde(default)]
    pub attributes: Vec<CanonicalAttribute>,
}

impl StandardEntity {
    fn new(id: &str, display_name: &str, synonyms: &[&str], attributes: &[(&str, AttributeRole)]) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
            attributes: attributes
                .iter()
                .map(|(name, role)| CanonicalAttribute {
                    name: name.to_string(),
                    role: *role,
                })
                .collect(),
        }
    }

    /// Returns true if any canonical attribute has this role.
    pub fn has_role(&self, role: AttributeRole) -> bool {
        self.attributes.iter().any(|a| a.role == role)
    }
}

/// An immutable set of standard entities.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StandardCatalog {
    pub entities: Vec<StandardEntity>,
}

static BUILTIN: Lazy<Arc<StandardCatalog>> = Lazy::new(|| Arc::new(StandardCatalog::build_builtin()));

impl StandardCatalog {
    /// Create a catalog from entries.
    pub fn new(entities: Vec<StandardEntity>) -> Self {
        Self { entities }
    }

    /// The built-in catalog, shared by every matcher.
    pub fn builtin() -> Arc<StandardCatalog> {
        Arc::clone(&BUILTIN)
    }

    /// Load a caller-supplied catalog from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Find an entry by id.
    pub fn get(&self, id: &str) -> Option<&StandardEntity> {
        self.entities.iter().find(|e| e.id.eq_ignore_ascii_case(id))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the catalog has no entries.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn build_builtin() -> Self {
        use AttributeRole::*;

        Self::new(vec![
            StandardEntity::new(
                "account",
                "Account",
                &["company", "organisation", "business", "customer", "client", "firm"],
                &[
                    ("name", Name),
                    ("emailaddress1", Email),
                    ("telephone1", Phone),
                    ("websiteurl", Url),
                    ("address1_line1", Address),
                    ("address1_city", City),
                    ("address1_postalcode", PostalCode),
                    ("address1_country", Country),
                    ("revenue", Money),
                    ("description", Description),
                ],
            ),
            StandardEntity::new(
                "contact",
                "Contact",
                &["person", "individual", "people", "customer_contact"],
                &[
                    ("firstname", FirstName),
                    ("lastname", LastName),
                    ("fullname", Name),
                    ("emailaddress1", Email),
                    ("telephone1", Phone),
                    ("mobilephone", Phone),
                    ("address1_line1", Address),
                    ("address1_city", City),
                    ("birthdate", BirthDate),
                    ("jobtitle", JobTitle),
                    ("description", Description),
                ],
            ),
            StandardEntity::new(
                "lead",
                "Lead",
                &["prospect", "inquiry", "enquiry"],
                &[
                    ("fullname", Name),
                    ("firstname", FirstName),
                    ("lastname", LastName),
                    ("emailaddress1", Email),
                    ("telephone1", Phone),
                    ("jobtitle", JobTitle),
                    ("statuscode", Status),
                    ("description", Description),
                ],
            ),
            StandardEntity::new(
                "opportunity",
                "Opportunity",
                &["deal", "sale", "pipeline"],
                &[
                    ("name", Name),
                    ("estimatedvalue", Money),
                    ("estimatedclosedate", Date),
                    ("stepname", Status),
                    ("description", Description),
                ],
            ),
            StandardEntity::new(
                "product",
                "Product",
                &["item", "sku", "article", "goods", "catalog_item"],
                &[
                    ("name", Name),
                    ("price", Money),
                    ("quantityonhand", Quantity),
                    ("description", Description),
                ],
            ),
            StandardEntity::new(
                "invoice",
                "Invoice",
                &["bill", "billing"],
                &[
                    ("name", Name),
                    ("totalamount", Money),
                    ("duedate", Date),
                    ("statuscode", Status),
                    ("description", Description),
                ],
            ),
            StandardEntity::new(
                "salesorder",
                "Order",
                &["order", "sales_order", "purchase_order", "purchase"],
                &[
                    ("name", Name),
                    ("totalamount", Money),
                    ("requestdeliveryby", Date),
                    ("statuscode", Status),
                    ("description", Description),
                ],
            ),
            StandardEntity::new(
                "quote",
                "Quote",
                &["quotation", "estimate", "proposal"],
                &[
                    ("name", Name),
                    ("totalamount", Money),
                    ("effectiveto", Date),
                    ("statuscode", Status),
                ],
            ),
            StandardEntity::new(
                "incident",
                "Case",
                &["case", "ticket", "issue", "support_case", "support_ticket"],
                &[
                    ("title", Name),
                    ("description", Description),
                    ("prioritycode", Priority),
                    ("statuscode", Status),
                    ("followupby", Date),
                ],
            ),
            StandardEntity::new(
                "task",
                "Task",
                &["todo", "to_do", "assignment", "activity"],
                &[
                    ("subject", Name),
                    ("description", Description),
                    ("scheduledend", Date),
                    ("prioritycode", Priority),
                    ("statuscode", Status),
                ],
            ),
            StandardEntity::new(
                "appointment",
                "Appointment",
                &["meeting", "event", "booking"],
                &[
                    ("subject", Name),
                    ("location", Address),
                    ("scheduledstart", Date),
                    ("description", Description),
                ],
            ),
            StandardEntity::new(
                "campaign",
                "Campaign",
                &["marketing_campaign", "promotion"],
                &[
                    ("name", Name),
                    ("budgetedcost", Money),
                    ("proposedstart", Date),
                    ("statuscode", Status),
                    ("description", Description),
                ],
            ),
            StandardEntity::new(
                "competitor",
                "Competitor",
                &["rival"],
                &[
                    ("name", Name),
                    ("websiteurl", Url),
                    ("reportedrevenue", Money),
                    ("overview", Description),
                ],
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_shared() {
        let a = StandardCatalog::builtin();
        let b = StandardCatalog::builtin();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.get("contact").is_some());
        assert!(a.get("Contact").unwrap().has_role(AttributeRole::Email));
    }

    #[test]
    fn test_infer_role() {
        assert_eq!(infer_role(&Attribute::new("email", SemanticType::Email)), Some(AttributeRole::Email));
        assert_eq!(infer_role(&Attribute::new("work_phone", SemanticType::String)), Some(AttributeRole::Phone));
        assert_eq!(infer_role(&Attribute::new("first_name", SemanticType::String)), Some(AttributeRole::FirstName));
        assert_eq!(infer_role(&Attribute::new("full_name", SemanticType::String)), Some(AttributeRole::Name));
        assert_eq!(infer_role(&Attribute::new("id", SemanticType::Guid).primary_key()), None);
        assert_eq!(infer_role(&Attribute::new("widget", SemanticType::Integer)), None);
        assert_eq!(infer_role(&Attribute::new("closes", SemanticType::Date)), Some(AttributeRole::Date));
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"{"entities":[{"id":"vehicle","display_name":"Vehicle","synonyms":["car"],
            "attributes":[{"name":"vin","role":"name"}]}]}"#;
        let catalog = StandardCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("vehicle").unwrap().synonyms, vec!["car"]);
    }
}
