//! Notion pages to invoice models.

use super::types::Page;
use crate::models::invoice::sum_subtotals;
use crate::models::{Invoice, InvoiceItem, InvoiceListItem, InvoiceStatus};
use crate::services::store::{SortField, StoreError};
use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

/// Property names in the invoice database.
pub mod invoice_property {
    pub const INVOICE_NUMBER: &str = "Invoice Number";
    pub const CLIENT: &str = "Client";
    pub const ISSUE_DATE: &str = "Issue Date";
    pub const EXPIRY_DATE: &str = "Expiry Date";
    pub const STATUS: &str = "Status";
    pub const TOTAL_AMOUNT: &str = "Total Amount";
    pub const MEMO: &str = "Memo";
    pub const ITEMS: &str = "Items";
}

/// Property names in the line item database.
pub mod item_property {
    pub const ITEM_NAME: &str = "Item Name";
    pub const QUANTITY: &str = "Quantity";
    pub const UNIT_PRICE: &str = "Unit Price";
    pub const SUBTOTAL: &str = "Subtotal";
}

pub fn sort_property(field: SortField) -> &'static str {
    match field {
        SortField::IssueDate => invoice_property::ISSUE_DATE,
        SortField::InvoiceNumber => invoice_property::INVOICE_NUMBER,
        SortField::TotalAmount => invoice_property::TOTAL_AMOUNT,
    }
}

/// Line item ids listed inline on the invoice page.
pub fn item_ids(page: &Page) -> Vec<String> {
    page.property(invoice_property::ITEMS)
        .map(|p| p.relation_ids())
        .unwrap_or_default()
}

/// Property id of `Items` when the inline relation list is truncated.
pub fn truncated_items_property(page: &Page) -> Option<&str> {
    page.property(invoice_property::ITEMS)
        .and_then(|p| p.truncated_relation())
}

pub fn list_item_from_page(page: &Page) -> Result<InvoiceListItem, StoreError> {
    Ok(InvoiceListItem {
        id: page.id.clone(),
        invoice_number: required_text(page, invoice_property::INVOICE_NUMBER)?,
        client_name: required_text(page, invoice_property::CLIENT)?,
        issue_date: required_date(page, invoice_property::ISSUE_DATE)?,
        status: status(page)?,
        total_amount: optional_amount(page, invoice_property::TOTAL_AMOUNT)?
            .unwrap_or(Decimal::ZERO),
    })
}

/// Build an invoice from its page and already-mapped items.
///
/// A missing total is derived from the items.
pub fn invoice_from_page(page: &Page, items: Vec<InvoiceItem>) -> Result<Invoice, StoreError> {
    let total_amount = match optional_amount(page, invoice_property::TOTAL_AMOUNT)? {
        Some(total) => total,
        None => sum_subtotals(&items)
            .ok_or_else(|| StoreError::malformed(&page.id, "item subtotals overflow"))?,
    };

    Ok(Invoice {
        id: page.id.clone(),
        invoice_number: required_text(page, invoice_property::INVOICE_NUMBER)?,
        client_name: required_text(page, invoice_property::CLIENT)?,
        issue_date: required_date(page, invoice_property::ISSUE_DATE)?,
        expiry_date: required_date(page, invoice_property::EXPIRY_DATE)?,
        status: status(page)?,
        total_amount,
        memo: page
            .property(invoice_property::MEMO)
            .and_then(|p| p.as_text()),
        items,
    })
}

/// A missing subtotal is derived from quantity and unit price.
pub fn item_from_page(page: &Page, invoice_id: &str) -> Result<InvoiceItem, StoreError> {
    let quantity = optional_amount(page, item_property::QUANTITY)?
        .ok_or_else(|| missing(page, item_property::QUANTITY))?;
    let unit_price = optional_amount(page, item_property::UNIT_PRICE)?
        .ok_or_else(|| missing(page, item_property::UNIT_PRICE))?;
    let subtotal = match optional_amount(page, item_property::SUBTOTAL)? {
        Some(subtotal) => subtotal,
        None => quantity.checked_mul(unit_price).ok_or_else(|| {
            StoreError::malformed(&page.id, "quantity x unit price overflows")
        })?,
    };

    Ok(InvoiceItem {
        id: page.id.clone(),
        invoice_id: invoice_id.to_string(),
        item_name: required_text(page, item_property::ITEM_NAME)?,
        quantity,
        unit_price,
        subtotal,
    })
}

fn missing(page: &Page, property: &str) -> StoreError {
    StoreError::malformed(&page.id, format!("missing `{}`", property))
}

fn required_text(page: &Page, property: &str) -> Result<String, StoreError> {
    page.property(property)
        .and_then(|p| p.as_text())
        .ok_or_else(|| missing(page, property))
}

fn required_date(page: &Page, property: &str) -> Result<NaiveDate, StoreError> {
    page.property(property)
        .and_then(|p| p.as_date())
        .ok_or_else(|| missing(page, property))
}

fn optional_amount(page: &Page, property: &str) -> Result<Option<Decimal>, StoreError> {
    match page.property(property).and_then(|p| p.as_number()) {
        Some(value) => Decimal::from_f64(value)
            .map(|d| Some(d.normalize()))
            .ok_or_else(|| {
                StoreError::malformed(&page.id, format!("`{}` is not a finite number", property))
            }),
        None => Ok(None),
    }
}

fn status(page: &Page) -> Result<InvoiceStatus, StoreError> {
    required_text(page, invoice_property::STATUS)?
        .parse::<InvoiceStatus>()
        .map_err(|e| StoreError::malformed(&page.id, e.to_string()))
}
