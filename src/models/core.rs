// src/models/core.rs

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Reference system an account can be matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetSystem {
    Dimensions,
    Salesforce,
}

impl TargetSystem {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetSystem::Dimensions => "dimensions",
            TargetSystem::Salesforce => "salesforce",
        }
    }

    /// Reference table the candidate queries run against.
    pub fn table_name(&self) -> &'static str {
        match self {
            TargetSystem::Dimensions => "public.dimensions_account",
            TargetSystem::Salesforce => "public.salesforce_account",
        }
    }
}

/// A business-account snapshot read from one of the systems.
/// Immutable once constructed; `payload` carries the opaque original row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,
    pub billing_street: Option<String>,
    pub billing_city: Option<String>,
    pub billing_postal_code: Option<String>,
    pub billing_country: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Account {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(unnamed)")
    }
}

/// Canonical comparison keys derived from an [`Account`].
///
/// Never persisted; recomputed from the account on demand. Every key is the
/// fixed point of its normalizer, so re-normalizing is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedAccount {
    pub name: String,
    pub phone: String,
    /// Domain derived from the explicit website field only.
    pub website: String,
    /// Domain of a non-generic email address, when one exists.
    pub email_domain: Option<String>,
    pub billing_street: String,
    pub billing_city: String,
}

impl NormalizedAccount {
    /// The domain used for candidate retrieval: the website when present,
    /// otherwise the corporate email domain.
    pub fn domain_key(&self) -> &str {
        if !self.website.is_empty() {
            &self.website
        } else {
            self.email_domain.as_deref().unwrap_or("")
        }
    }

    /// True when no usable retrieval key exists at all.
    pub fn has_no_keys(&self) -> bool {
        self.name.is_empty() && self.phone.is_empty() && self.domain_key().is_empty()
    }
}

/// A reference-system account retrieved as a plausible match, tagged with the
/// retrieval priority tier (phone-exact 100, domain-exact 95, name similarity
/// scaled 0-80). Lives only within one candidate-retrieval call.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub account: Account,
    pub priority: i32,
}

/// Canonical field names the engine compares on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalField {
    Name,
    Phone,
    Website,
    Email,
    BillingStreet,
    BillingCity,
    BillingPostalCode,
    BillingCountry,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Name => "name",
            CanonicalField::Phone => "phone",
            CanonicalField::Website => "website",
            CanonicalField::Email => "email",
            CanonicalField::BillingStreet => "billing_street",
            CanonicalField::BillingCity => "billing_city",
            CanonicalField::BillingPostalCode => "billing_postal_code",
            CanonicalField::BillingCountry => "billing_country",
        }
    }
}

/// Explicit source-column to canonical-field mapping, validated once at
/// configuration time and passed into the orchestrator as a value.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    entries: Vec<(String, CanonicalField)>,
}

impl FieldMapping {
    /// Validates and builds a mapping. Rejects duplicate source columns,
    /// duplicate canonical targets, and mappings without a Name column.
    pub fn new(entries: Vec<(String, CanonicalField)>) -> Result<Self> {
        let mut seen_columns: HashSet<&str> = HashSet::new();
        let mut seen_fields: HashSet<CanonicalField> = HashSet::new();
        for (column, field) in &entries {
            if column.trim().is_empty() {
                return Err(anyhow!("Field mapping contains an empty source column name"));
            }
            if !seen_columns.insert(column.as_str()) {
                return Err(anyhow!(
                    "Source column '{}' is mapped more than once",
                    column
                ));
            }
            if !seen_fields.insert(*field) {
                return Err(anyhow!(
                    "Canonical field '{}' is mapped more than once",
                    field.as_str()
                ));
            }
        }
        if !seen_fields.contains(&CanonicalField::Name) {
            return Err(anyhow!("Field mapping must map a source column to Name"));
        }
        Ok(Self { entries })
    }

    /// Mapping for the conventional source_account layout where source
    /// columns already carry canonical names.
    pub fn default_source_mapping() -> Self {
        let entries = [
            CanonicalField::Name,
            CanonicalField::Phone,
            CanonicalField::Website,
            CanonicalField::Email,
            CanonicalField::BillingStreet,
            CanonicalField::BillingCity,
            CanonicalField::BillingPostalCode,
            CanonicalField::BillingCountry,
        ]
        .iter()
        .map(|f| (f.as_str().to_string(), *f))
        .collect();
        Self { entries }
    }

    pub fn source_column(&self, field: CanonicalField) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, f)| *f == field)
            .map(|(c, _)| c.as_str())
    }

    pub fn canonical_field(&self, column: &str) -> Option<CanonicalField> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, f)| *f)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, CanonicalField)> {
        self.entries.iter().map(|(c, f)| (c.as_str(), *f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_mapping_requires_name() {
        let result = FieldMapping::new(vec![(
            "telephone".to_string(),
            CanonicalField::Phone,
        )]);
        assert!(result.is_err());
    }

    #[test]
    fn test_field_mapping_rejects_duplicate_source_column() {
        let result = FieldMapping::new(vec![
            ("company".to_string(), CanonicalField::Name),
            ("company".to_string(), CanonicalField::Website),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_field_mapping_rejects_duplicate_canonical_field() {
        let result = FieldMapping::new(vec![
            ("company".to_string(), CanonicalField::Name),
            ("trading_name".to_string(), CanonicalField::Name),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_field_mapping_lookup_both_directions() {
        let mapping = FieldMapping::new(vec![
            ("company".to_string(), CanonicalField::Name),
            ("telephone".to_string(), CanonicalField::Phone),
        ])
        .unwrap();
        assert_eq!(mapping.source_column(CanonicalField::Name), Some("company"));
        assert_eq!(
            mapping.canonical_field("telephone"),
            Some(CanonicalField::Phone)
        );
        assert_eq!(mapping.source_column(CanonicalField::Website), None);
        assert_eq!(mapping.canonical_field("missing"), None);
    }

    #[test]
    fn test_default_mapping_covers_all_fields() {
        let mapping = FieldMapping::default_source_mapping();
        assert_eq!(mapping.columns().count(), 8);
        assert_eq!(mapping.source_column(CanonicalField::Name), Some("name"));
    }

    #[test]
    fn test_domain_key_fallback() {
        let normalized = NormalizedAccount {
            website: String::new(),
            email_domain: Some("acme.com.au".to_string()),
            ..Default::default()
        };
        assert_eq!(normalized.domain_key(), "acme.com.au");

        let with_website = NormalizedAccount {
            website: "acme.com.au".to_string(),
            email_domain: Some("other.com".to_string()),
            ..Default::default()
        };
        assert_eq!(with_website.domain_key(), "acme.com.au");
    }
}
