//! Subset of the Notion REST object model this app reads.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub in_trash: bool,
    pub parent: Parent,
    #[serde(default)]
    pub properties: HashMap<String, PropertyValue>,
}

impl Page {
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn is_live(&self) -> bool {
        !self.archived && !self.in_trash
    }

    pub fn belongs_to(&self, database_id: &str) -> bool {
        match &self.parent {
            Parent::DatabaseId { database_id: parent } => {
                normalize_id(parent) == normalize_id(database_id)
            }
            Parent::Other => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Parent {
    DatabaseId { database_id: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectOption {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateValue {
    pub start: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageReference {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormulaValue {
    Number { number: Option<f64> },
    #[serde(rename = "string")]
    Text { string: Option<String> },
    Date { date: Option<DateValue> },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollupValue {
    Number { number: Option<f64> },
    #[serde(other)]
    Other,
}

/// A page property value, keyed by its `type` tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title { title: Vec<RichText> },
    RichText { rich_text: Vec<RichText> },
    Number { number: Option<f64> },
    Date { date: Option<DateValue> },
    Select { select: Option<SelectOption> },
    Status { status: Option<SelectOption> },
    Relation {
        #[serde(default)]
        id: String,
        relation: Vec<PageReference>,
        /// Set when the page payload lists only the first references.
        #[serde(default)]
        has_more: bool,
    },
    Formula { formula: FormulaValue },
    Rollup { rollup: RollupValue },
    #[serde(other)]
    Unsupported,
}

impl PropertyValue {
    /// Plain text of text-like properties; `None` when empty.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            PropertyValue::Title { title } => join_plain_text(title),
            PropertyValue::RichText { rich_text } => join_plain_text(rich_text),
            PropertyValue::Select { select } | PropertyValue::Status { status: select } => {
                select.as_ref()?.name.clone()
            }
            PropertyValue::Formula {
                formula: FormulaValue::Text { string },
            } => string.clone()?,
            _ => return None,
        };
        let trimmed = text.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number { number } => *number,
            PropertyValue::Formula {
                formula: FormulaValue::Number { number },
            } => *number,
            PropertyValue::Rollup {
                rollup: RollupValue::Number { number },
            } => *number,
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        let date = match self {
            PropertyValue::Date { date } => date.as_ref()?,
            PropertyValue::Formula {
                formula: FormulaValue::Date { date },
            } => date.as_ref()?,
            _ => return None,
        };
        parse_date(&date.start)
    }

    pub fn relation_ids(&self) -> Vec<String> {
        match self {
            PropertyValue::Relation { relation, .. } => {
                relation.iter().map(|r| r.id.clone()).collect()
            }
            _ => Vec::new(),
        }
    }

    /// Property id to page through when the relation list was cut short.
    pub fn truncated_relation(&self) -> Option<&str> {
        match self {
            PropertyValue::Relation { id, has_more: true, .. } if !id.is_empty() => Some(id.as_str()),
            _ => None,
        }
    }
}

fn join_plain_text(parts: &[RichText]) -> String {
    parts.iter().map(|p| p.plain_text.as_str()).collect()
}

/// Dates may carry a time component; only the calendar date is kept.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let day = value.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

/// One page of `GET /pages/{id}/properties/{property_id}` for a relation.
#[derive(Debug, Deserialize)]
pub struct PropertyItemList {
    #[serde(default)]
    pub results: Vec<RelationItem>,
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct RelationItem {
    pub relation: Option<PageReference>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Notion ids appear both dashed and undashed.
pub fn normalize_id(id: &str) -> String {
    id.chars()
        .filter(|c| *c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// True for a 32-digit hex id, dashed or not.
pub fn is_page_id(id: &str) -> bool {
    let normalized = normalize_id(id);
    normalized.len() == 32 && normalized.chars().all(|c| c.is_ascii_hexdigit())
}
