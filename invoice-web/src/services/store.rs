//! Read access to the invoice system of record.

use crate::models::{Invoice, InvoiceListItem};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use web_core::retry::{is_retryable_status, Retryable};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document store request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("document store returned {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("could not decode document store response: {0}")]
    Decode(String),

    #[error("document {id} is malformed: {reason}")]
    Malformed { id: String, reason: String },
}

impl StoreError {
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Malformed {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        match self {
            StoreError::Transport(e) => e.is_timeout() || e.is_connect(),
            StoreError::Api { status, .. } => reqwest::StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            StoreError::Decode(_) | StoreError::Malformed { .. } => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            StoreError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    IssueDate,
    InvoiceNumber,
    TotalAmount,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::IssueDate => "issue_date",
            SortField::InvoiceNumber => "invoice_number",
            SortField::TotalAmount => "total_amount",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn reversed(&self) -> SortOrder {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page request against the invoice collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub page_size: u32,
    /// Opaque continuation token from a previous page.
    pub cursor: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            cursor: None,
            sort: SortField::default(),
            order: SortOrder::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoicePage {
    pub items: Vec<InvoiceListItem>,
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Fetch one invoice with its line items. `Ok(None)` when no such
    /// invoice is visible.
    async fn get_invoice(&self, id: &str) -> Result<Option<Invoice>, StoreError>;

    async fn list_invoices(&self, query: &ListQuery) -> Result<InvoicePage, StoreError>;
}
