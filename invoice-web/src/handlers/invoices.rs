use askama::Template;
use chrono::Utc;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::Response,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::{render, PageError};
use crate::models::{CompanyProfile, Invoice, InvoiceListItem, Issuer};
use crate::services::store::{ListQuery, SortField, SortOrder, DEFAULT_PAGE_SIZE};
use crate::AppState;

#[derive(Template)]
#[template(path = "invoices/list.html")]
pub struct InvoiceListTemplate {
    pub issuer: Issuer,
    pub invoices: Vec<InvoiceListItem>,
    pub load_error: Option<&'static str>,
    pub next_page_url: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
}

impl InvoiceListTemplate {
    /// Link that sorts by `field`, flipping direction when already sorted by it.
    pub fn sort_url(&self, field: &str) -> String {
        let sort = match field {
            "invoice_number" => SortField::InvoiceNumber,
            "total_amount" => SortField::TotalAmount,
            _ => SortField::IssueDate,
        };
        let order = if self.sort == sort {
            self.order.reversed()
        } else {
            SortOrder::Desc
        };
        ListLink {
            sort,
            order,
            page_size: None,
            cursor: None,
        }
        .href()
    }
}

/// Query string of a list page link.
#[derive(Debug, Serialize)]
struct ListLink<'a> {
    sort: SortField,
    order: SortOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
}

impl ListLink<'_> {
    fn href(&self) -> String {
        match serde_urlencoded::to_string(self) {
            Ok(query) => format!("/invoices?{}", query),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode invoice list link");
                "/invoices".to_string()
            }
        }
    }
}

#[derive(Template)]
#[template(path = "invoices/detail.html")]
pub struct InvoiceDetailTemplate {
    pub invoice: Invoice,
    pub company: CompanyProfile,
    pub share_url: String,
    pub expired: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ListParams {
    pub cursor: Option<String>,
    #[validate(range(min = 1, max = 100, message = "page_size must be between 1 and 100"))]
    pub page_size: Option<u32>,
    pub sort: Option<SortField>,
    pub order: Option<SortOrder>,
}

impl ListParams {
    fn into_query(self) -> ListQuery {
        ListQuery {
            page_size: self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
            cursor: self.cursor.filter(|c| !c.is_empty()),
            sort: self.sort.unwrap_or_default(),
            order: self.order.unwrap_or_default(),
        }
    }
}

const LIST_LOAD_ERROR: &str = "Invoices could not be loaded from the document store.";

pub async fn list_invoices_page(
    State(state): State<AppState>,
    issuer: Issuer,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Response, PageError> {
    let Query(params) = params.map_err(|e| PageError::BadRequest(e.body_text()))?;
    params
        .validate()
        .map_err(|e| PageError::BadRequest(e.to_string()))?;
    let query = params.into_query();

    let (invoices, load_error, next_page_url) = match state.store.list_invoices(&query).await {
        Ok(page) => {
            let next_page_url = match (page.has_more, page.next_cursor.as_deref()) {
                (true, Some(cursor)) => Some(
                    ListLink {
                        sort: query.sort,
                        order: query.order,
                        page_size: Some(query.page_size),
                        cursor: Some(cursor),
                    }
                    .href(),
                ),
                _ => None,
            };
            (page.items, None, next_page_url)
        }
        Err(e) => {
            tracing::error!(
                issuer = %issuer.email,
                error = %e,
                "Failed to list invoices"
            );
            (Vec::new(), Some(LIST_LOAD_ERROR), None)
        }
    };

    Ok(render(
        StatusCode::OK,
        InvoiceListTemplate {
            issuer,
            invoices,
            load_error,
            next_page_url,
            sort: query.sort,
            order: query.order,
        },
    ))
}

/// Public: anyone holding the link can view the quotation.
pub async fn invoice_detail_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, PageError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(PageError::NotFound);
    }

    let invoice = state
        .store
        .get_invoice(id)
        .await?
        .ok_or(PageError::NotFound)?;

    for issue in invoice.consistency_issues() {
        tracing::warn!(invoice_id = %invoice.id, %issue, "Stored amounts are inconsistent");
    }

    let share_url = format!("{}/invoices/{}", state.settings.public_base_url(), invoice.id);
    let expired = invoice.is_expired_on(Utc::now().date_naive());

    Ok(render(
        StatusCode::OK,
        InvoiceDetailTemplate {
            invoice,
            company: state.settings.company.clone(),
            share_url,
            expired,
        },
    ))
}
