//! The company record accumulated by a research session.
//!
//! The record is a fixed schema: every optional field is present and either
//! filled or empty, so gap analysis never has to guess about absent keys.
//! Updates proposed by the completion service arrive as a [`RecordUpdate`]
//! and are validated and merged in [`CompanyRecord::apply_update`].

use std::fmt;

use indexmap::IndexSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ResearchError, Result};

/// Founding years outside this range are treated as extraction noise.
const PLAUSIBLE_FOUNDING_YEARS: std::ops::RangeInclusive<i32> = 1000..=2100;

/// Structured facts about the company being researched.
///
/// Deserialization goes through [`CompanyRecord::new`], so a record with a
/// blank name cannot be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredRecord")]
pub struct CompanyRecord {
    /// Official name of the company. Set once, never altered.
    company_name: String,

    /// Year the company was founded
    pub founding_year: Option<i32>,

    /// Names of the founding team members
    pub founder_names: Vec<String>,

    /// Brief description of the main product or service
    pub product_description: Option<String>,

    /// Summary of the funding history
    pub funding_summary: Option<String>,

    /// Known customers that use the product or service
    pub notable_customers: Option<String>,
}

/// Wire shape of a [`CompanyRecord`] before the name is checked.
#[derive(Deserialize)]
struct StoredRecord {
    company_name: String,
    founding_year: Option<i32>,
    #[serde(default)]
    founder_names: Vec<String>,
    product_description: Option<String>,
    funding_summary: Option<String>,
    notable_customers: Option<String>,
}

impl TryFrom<StoredRecord> for CompanyRecord {
    type Error = ResearchError;

    fn try_from(stored: StoredRecord) -> Result<Self> {
        let mut record = CompanyRecord::new(stored.company_name)?;
        record.founding_year = stored.founding_year;
        record.founder_names = stored.founder_names;
        record.product_description = stored.product_description;
        record.funding_summary = stored.funding_summary;
        record.notable_customers = stored.notable_customers;
        Ok(record)
    }
}

impl CompanyRecord {
    /// Create a record with only the company name populated.
    pub fn new(company_name: impl Into<String>) -> Result<Self> {
        let company_name = company_name.into().trim().to_string();
        if company_name.is_empty() {
            return Err(ResearchError::InvalidEntity {
                reason: "company name must not be empty".into(),
            });
        }

        Ok(Self {
            company_name,
            founding_year: None,
            founder_names: Vec::new(),
            product_description: None,
            funding_summary: None,
            notable_customers: None,
        })
    }

    /// The company name this record was created with.
    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    /// Set the founding year (seed records).
    pub fn with_founding_year(mut self, year: i32) -> Self {
        self.founding_year = Some(year);
        self
    }

    /// Set the founders (seed records).
    pub fn with_founders(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.founder_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the product description (seed records).
    pub fn with_product_description(mut self, description: impl Into<String>) -> Self {
        self.product_description = Some(description.into());
        self
    }

    /// Set the funding summary (seed records).
    pub fn with_funding_summary(mut self, summary: impl Into<String>) -> Self {
        self.funding_summary = Some(summary.into());
        self
    }

    /// Set the notable customers (seed records).
    pub fn with_notable_customers(mut self, customers: impl Into<String>) -> Self {
        self.notable_customers = Some(customers.into());
        self
    }

    /// Whether an optional field holds a usable value.
    pub fn is_filled(&self, field: RecordField) -> bool {
        match field {
            RecordField::FoundingYear => self.founding_year.is_some(),
            RecordField::FounderNames => self.founder_names.iter().any(|n| !n.trim().is_empty()),
            RecordField::ProductDescription => is_present(&self.product_description),
            RecordField::FundingSummary => is_present(&self.funding_summary),
            RecordField::NotableCustomers => is_present(&self.notable_customers),
        }
    }

    /// Merge a validated update into this record.
    ///
    /// Scalars are only written while empty; lists are unioned in order of
    /// first appearance; the company name is never touched. Returns the
    /// fields that went from empty to filled.
    pub(crate) fn apply_update(&mut self, update: RecordUpdate) -> Vec<RecordField> {
        let update = update.sanitized();
        let before: Vec<bool> = RecordField::ALL.iter().map(|f| self.is_filled(*f)).collect();

        if self.founding_year.is_none() {
            self.founding_year = update.founding_year;
        }
        fill_if_empty(&mut self.product_description, update.product_description);
        fill_if_empty(&mut self.funding_summary, update.funding_summary);
        fill_if_empty(&mut self.notable_customers, update.notable_customers);
        self.founder_names = union_names(&self.founder_names, update.founder_names.unwrap_or_default());

        RecordField::ALL
            .iter()
            .zip(before)
            .filter(|(field, was_filled)| !was_filled && self.is_filled(**field))
            .map(|(field, _)| *field)
            .collect()
    }
}

fn is_present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn fill_if_empty(slot: &mut Option<String>, candidate: Option<String>) {
    if !is_present(slot) {
        if let Some(value) = candidate {
            *slot = Some(value);
        }
    }
}

/// Append incoming names not already present. Comparison ignores case and
/// surrounding whitespace; existing entries are kept exactly as they are.
fn union_names(existing: &[String], incoming: Vec<String>) -> Vec<String> {
    let mut seen: IndexSet<String> = existing.iter().map(|n| n.trim().to_lowercase()).collect();
    let mut merged = existing.to_vec();

    for name in incoming {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            merged.push(trimmed.to_string());
        }
    }

    merged
}

/// The optional fields of a [`CompanyRecord`], in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    FoundingYear,
    FounderNames,
    ProductDescription,
    FundingSummary,
    NotableCustomers,
}

impl RecordField {
    /// Every optional field, in declaration order.
    pub const ALL: [RecordField; 5] = [
        RecordField::FoundingYear,
        RecordField::FounderNames,
        RecordField::ProductDescription,
        RecordField::FundingSummary,
        RecordField::NotableCustomers,
    ];

    /// JSON key of this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordField::FoundingYear => "founding_year",
            RecordField::FounderNames => "founder_names",
            RecordField::ProductDescription => "product_description",
            RecordField::FundingSummary => "funding_summary",
            RecordField::NotableCustomers => "notable_customers",
        }
    }

    /// Human-readable description, used in prompts and fallback queries.
    pub fn description(&self) -> &'static str {
        match self {
            RecordField::FoundingYear => "founding year",
            RecordField::FounderNames => "founders",
            RecordField::ProductDescription => "products and services",
            RecordField::FundingSummary => "funding rounds and investors",
            RecordField::NotableCustomers => "notable customers and partners",
        }
    }

    /// Parse a field from its JSON key or description (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_lowercase();
        RecordField::ALL
            .into_iter()
            .find(|f| value == f.as_str() || value == f.description())
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured update proposed by the completion service.
///
/// Every field is nullable so the model can say "unknown" explicitly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RecordUpdate {
    /// Company name as spelled by the sources (never applied)
    pub company_name: Option<String>,

    /// Year the company was founded
    pub founding_year: Option<i32>,

    /// Names of the founding team members
    pub founder_names: Option<Vec<String>>,

    /// Brief description of the main product or service
    pub product_description: Option<String>,

    /// Summary of the funding history
    pub funding_summary: Option<String>,

    /// Known customers that use the product or service
    pub notable_customers: Option<String>,

    /// Confidence in the extracted facts, 0.0 to 1.0
    pub confidence: Option<f32>,
}

impl RecordUpdate {
    /// Drop blank strings and implausible values, clamp confidence.
    pub fn sanitized(self) -> Self {
        let clean = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
        };

        Self {
            company_name: clean(self.company_name),
            founding_year: self
                .founding_year
                .filter(|year| PLAUSIBLE_FOUNDING_YEARS.contains(year)),
            founder_names: self.founder_names.map(|names| {
                names
                    .into_iter()
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect()
            }),
            product_description: clean(self.product_description),
            funding_summary: clean(self.funding_summary),
            notable_customers: clean(self.notable_customers),
            confidence: self
                .confidence
                .filter(|c| c.is_finite())
                .map(|c| c.clamp(0.0, 1.0)),
        }
    }
}
