//! Quotation document model.
//!
//! Invoices live in the document store; this application only reads them.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Processing status of a quotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Approved,
    Rejected,
}

impl InvoiceStatus {
    pub const ALL: [InvoiceStatus; 4] = [
        InvoiceStatus::Draft,
        InvoiceStatus::Sent,
        InvoiceStatus::Approved,
        InvoiceStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Approved => "approved",
            InvoiceStatus::Rejected => "rejected",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "Draft",
            InvoiceStatus::Sent => "Sent",
            InvoiceStatus::Approved => "Approved",
            InvoiceStatus::Rejected => "Rejected",
        }
    }

    /// Label used by the source database's status property.
    pub fn store_label(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "초안",
            InvoiceStatus::Sent => "발송",
            InvoiceStatus::Approved => "승인",
            InvoiceStatus::Rejected => "거절",
        }
    }

    pub fn badge_class(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "badge badge-draft",
            InvoiceStatus::Sent => "badge badge-sent",
            InvoiceStatus::Approved => "badge badge-approved",
            InvoiceStatus::Rejected => "badge badge-rejected",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown invoice status `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for InvoiceStatus {
    type Err = UnknownStatus;

    /// Accepts the store's labels and the English names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        InvoiceStatus::ALL
            .into_iter()
            .find(|status| {
                trimmed == status.store_label() || trimmed.eq_ignore_ascii_case(status.as_str())
            })
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// One priced line of a quotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub id: String,
    /// Owning invoice, by identifier.
    pub invoice_id: String,
    pub item_name: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl InvoiceItem {
    /// `None` when the product does not fit in a `Decimal`.
    pub fn expected_subtotal(&self) -> Option<Decimal> {
        self.quantity.checked_mul(self.unit_price)
    }

    pub fn quantity_display(&self) -> String {
        format_amount(&self.quantity)
    }

    pub fn unit_price_display(&self) -> String {
        format_amount(&self.unit_price)
    }

    pub fn subtotal_display(&self) -> String {
        format_amount(&self.subtotal)
    }
}

/// A quotation document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub client_name: String,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub status: InvoiceStatus,
    pub total_amount: Decimal,
    pub memo: Option<String>,
    pub items: Vec<InvoiceItem>,
}

/// A derived amount that disagrees with what the store holds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyIssue {
    #[error("total amount {stored} does not match item subtotals {computed}")]
    TotalMismatch { stored: Decimal, computed: Decimal },

    #[error("item {item_id}: subtotal {stored} does not match quantity x unit price {computed}")]
    SubtotalMismatch {
        item_id: String,
        stored: Decimal,
        computed: Decimal,
    },

    #[error("item {item_id}: quantity x unit price overflows")]
    SubtotalOverflow { item_id: String },

    #[error("item subtotals overflow when summed")]
    TotalOverflow,
}

impl Invoice {
    /// Sum of item subtotals, `None` on overflow.
    pub fn items_total(&self) -> Option<Decimal> {
        sum_subtotals(&self.items)
    }

    /// Compare stored derived amounts against their inputs.
    ///
    /// The store stays authoritative; callers report, never rewrite. An
    /// invoice without items has nothing to compare its total against.
    pub fn consistency_issues(&self) -> Vec<ConsistencyIssue> {
        let mut issues: Vec<ConsistencyIssue> = self
            .items
            .iter()
            .filter_map(|item| match item.expected_subtotal() {
                Some(computed) if computed == item.subtotal => None,
                Some(computed) => Some(ConsistencyIssue::SubtotalMismatch {
                    item_id: item.id.clone(),
                    stored: item.subtotal,
                    computed,
                }),
                None => Some(ConsistencyIssue::SubtotalOverflow {
                    item_id: item.id.clone(),
                }),
            })
            .collect();

        if self.items.is_empty() {
            return issues;
        }

        match self.items_total() {
            Some(computed) if computed == self.total_amount => {}
            Some(computed) => issues.push(ConsistencyIssue::TotalMismatch {
                stored: self.total_amount,
                computed,
            }),
            None => issues.push(ConsistencyIssue::TotalOverflow),
        }

        issues
    }

    pub fn summary(&self) -> InvoiceListItem {
        InvoiceListItem::from(self)
    }

    pub fn total_amount_display(&self) -> String {
        format_amount(&self.total_amount)
    }

    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }
}

/// Summary row for the invoice list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceListItem {
    pub id: String,
    pub invoice_number: String,
    pub client_name: String,
    pub issue_date: NaiveDate,
    pub status: InvoiceStatus,
    pub total_amount: Decimal,
}

impl InvoiceListItem {
    pub fn total_amount_display(&self) -> String {
        format_amount(&self.total_amount)
    }
}

impl From<&Invoice> for InvoiceListItem {
    fn from(invoice: &Invoice) -> Self {
        Self {
            id: invoice.id.clone(),
            invoice_number: invoice.invoice_number.clone(),
            client_name: invoice.client_name.clone(),
            issue_date: invoice.issue_date,
            status: invoice.status,
            total_amount: invoice.total_amount,
        }
    }
}

/// Checked sum of item subtotals.
pub fn sum_subtotals(items: &[InvoiceItem]) -> Option<Decimal> {
    items
        .iter()
        .try_fold(Decimal::ZERO, |total, item| total.checked_add(item.subtotal))
}

/// Group the integer part in thousands, keeping up to two decimals.
pub fn format_amount(amount: &Decimal) -> String {
    let normalized = amount.round_dp(2).normalize();
    let text = normalized.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (text.as_str(), None),
    };

    let mut out = String::with_capacity(text.len() + int_part.len() / 3 + 1);
    if normalized.is_sign_negative() && !normalized.is_zero() {
        out.push('-');
    }
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(id: &str, quantity: i64, unit_price: i64, subtotal: i64) -> InvoiceItem {
        InvoiceItem {
            id: id.to_string(),
            invoice_id: "inv-1".to_string(),
            item_name: format!("Item {}", id),
            quantity: Decimal::from(quantity),
            unit_price: Decimal::from(unit_price),
            subtotal: Decimal::from(subtotal),
        }
    }

    fn invoice(items: Vec<InvoiceItem>, total: i64) -> Invoice {
        Invoice {
            id: "inv-1".to_string(),
            invoice_number: "Q-2024-001".to_string(),
            client_name: "Acme".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            expiry_date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            status: InvoiceStatus::Sent,
            total_amount: Decimal::from(total),
            memo: None,
            items,
        }
    }

    #[test]
    fn status_parses_store_labels_and_english_names() {
        assert_eq!("초안".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Draft));
        assert_eq!("발송".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Sent));
        assert_eq!(" 승인 ".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Approved));
        assert_eq!("거절".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Rejected));
        assert_eq!("Approved".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Approved));
        assert_eq!("DRAFT".parse::<InvoiceStatus>(), Ok(InvoiceStatus::Draft));
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert_eq!(
            "paid".parse::<InvoiceStatus>(),
            Err(UnknownStatus("paid".to_string()))
        );
    }

    #[test]
    fn consistent_invoice_has_no_issues() {
        let invoice = invoice(vec![item("a", 2, 1000, 2000), item("b", 1, 500, 500)], 2500);
        assert!(invoice.consistency_issues().is_empty());
    }

    #[test]
    fn reports_subtotal_and_total_mismatches() {
        let invoice = invoice(vec![item("a", 2, 1000, 1500)], 2000);
        let issues = invoice.consistency_issues();

        assert_eq!(issues.len(), 2);
        assert!(matches!(
            &issues[0],
            ConsistencyIssue::SubtotalMismatch { item_id, .. } if item_id == "a"
        ));
        assert_eq!(
            issues[1],
            ConsistencyIssue::TotalMismatch {
                stored: Decimal::from(2000),
                computed: Decimal::from(1500),
            }
        );
    }

    #[test]
    fn oversized_amounts_are_reported_not_computed() {
        let huge = 1_000_000_000_000_000;
        let mut big = item("a", huge, huge, huge);
        big.subtotal = Decimal::MAX;
        let mut other = item("b", 1, 1, 1);
        other.subtotal = Decimal::MAX;
        other.unit_price = Decimal::MAX;

        let invoice = invoice(vec![big, other], 0);

        assert_eq!(invoice.items[0].expected_subtotal(), None);
        assert_eq!(invoice.items_total(), None);
        assert_eq!(
            invoice.consistency_issues(),
            vec![
                ConsistencyIssue::SubtotalOverflow {
                    item_id: "a".to_string()
                },
                ConsistencyIssue::TotalOverflow,
            ]
        );
    }

    #[test]
    fn invoice_without_items_skips_total_check() {
        assert!(invoice(Vec::new(), 9000).consistency_issues().is_empty());
    }

    #[test]
    fn summary_copies_list_fields() {
        let invoice = invoice(vec![item("a", 1, 100, 100)], 100);
        let summary = invoice.summary();

        assert_eq!(summary.id, invoice.id);
        assert_eq!(summary.invoice_number, invoice.invoice_number);
        assert_eq!(summary.status, InvoiceStatus::Sent);
        assert_eq!(summary.total_amount, Decimal::from(100));
    }

    #[test]
    fn formats_amounts_with_grouping() {
        assert_eq!(format_amount(&Decimal::from(0)), "0");
        assert_eq!(format_amount(&Decimal::from(999)), "999");
        assert_eq!(format_amount(&Decimal::from(1_234_000)), "1,234,000");
        assert_eq!(format_amount(&Decimal::from(-1000)), "-1,000");
        assert_eq!(format_amount(&Decimal::new(123_450, 2)), "1,234.5");
    }
}
