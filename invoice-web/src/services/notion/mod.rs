//! Notion-backed invoice store.
//!
//! Invoices are pages in the configured database; line items are pages in a
//! second database, linked through the invoice's `Items` relation.

pub mod mapping;
pub mod types;

use crate::config::NotionSettings;
use crate::models::{Invoice, InvoiceItem};
use crate::services::store::{
    InvoicePage, InvoiceStore, ListQuery, SortOrder, StoreError, MAX_PAGE_SIZE,
};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::time::Duration;
use types::{ApiErrorBody, Page, PropertyItemList, QueryResponse};
use web_core::retry::{retry_with_backoff, RetryPolicy};

pub const NOTION_VERSION: &str = "2022-06-28";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Notion averages three requests per second per integration.
const ITEM_FETCH_CONCURRENCY: usize = 3;
const RELATION_PAGE_SIZE: &str = "100";

pub struct NotionClient {
    client: Client,
    settings: NotionSettings,
    retry: RetryPolicy,
}

impl NotionClient {
    pub fn new(settings: NotionSettings) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("invoice-web/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(StoreError::Transport)?;

        Ok(Self {
            client,
            settings,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.api_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(self.settings.api_key.expose_secret())
            .header("Notion-Version", NOTION_VERSION)
    }

    /// Send a request built by `build`, retrying transient failures, and
    /// decode a successful body as `T`.
    async fn send_json<T, F>(&self, operation: &str, build: F) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let response = retry_with_backoff(&self.retry, operation, || {
            let request = self.authorized(build());
            async move {
                let response = request.send().await.map_err(StoreError::Transport)?;
                check_status(response).await
            }
        })
        .await?;

        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn fetch_page(&self, id: &str) -> Result<Option<Page>, StoreError> {
        let url = self.url(&format!("/pages/{}", id));

        match self
            .send_json::<Page, _>("notion.retrieve_page", || self.client.get(&url))
            .await
        {
            Ok(page) => Ok(Some(page)),
            Err(StoreError::Api { status: 404, .. }) => Ok(None),
            Err(StoreError::Api { status: 400, ref code, .. }) if code == "validation_error" => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// All related line item ids, paging past the inline list when it is cut short.
    async fn item_ids(&self, invoice: &Page) -> Result<Vec<String>, StoreError> {
        let property_id = match mapping::truncated_items_property(invoice) {
            Some(property_id) => property_id,
            None => return Ok(mapping::item_ids(invoice)),
        };

        let url = self.url(&format!("/pages/{}/properties/{}", invoice.id, property_id));
        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let page: PropertyItemList = self
                .send_json("notion.retrieve_page_property", || {
                    let request = self
                        .client
                        .get(&url)
                        .query(&[("page_size", RELATION_PAGE_SIZE)]);
                    match &cursor {
                        Some(cursor) => request.query(&[("start_cursor", cursor.as_str())]),
                        None => request,
                    }
                })
                .await?;

            ids.extend(
                page.results
                    .into_iter()
                    .filter_map(|item| item.relation)
                    .map(|reference| reference.id),
            );

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        tracing::debug!(invoice_id = %invoice.id, count = ids.len(), "Paged through line item relation");
        Ok(ids)
    }

    async fn fetch_items(&self, invoice: &Page) -> Result<Vec<InvoiceItem>, StoreError> {
        let ids = self.item_ids(invoice).await?;
        // `buffered` keeps relation order while bounding in-flight requests.
        let pages: Vec<Option<Page>> = stream::iter(ids.iter().cloned())
            .map(|id| async move { self.fetch_page(&id).await })
            .buffered(ITEM_FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        let mut items = Vec::with_capacity(pages.len());
        for (id, page) in ids.iter().zip(pages) {
            match page {
                Some(page) if page.is_live() => {
                    items.push(mapping::item_from_page(&page, &invoice.id)?);
                }
                _ => {
                    tracing::warn!(
                        invoice_id = %invoice.id,
                        item_id = %id,
                        "Related line item is missing or archived, skipping"
                    );
                }
            }
        }
        Ok(items)
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let body: Option<ApiErrorBody> = response.json().await.ok();
    let (code, message) = body
        .map(|b| (b.code, b.message))
        .unwrap_or_else(|| {
            (
                "unknown".to_string(),
                status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            )
        });

    Err(StoreError::Api {
        status: status.as_u16(),
        code,
        message,
        retry_after: if status == StatusCode::TOO_MANY_REQUESTS {
            retry_after
        } else {
            None
        },
    })
}

#[async_trait]
impl InvoiceStore for NotionClient {
    async fn get_invoice(&self, id: &str) -> Result<Option<Invoice>, StoreError> {
        if !types::is_page_id(id) {
            tracing::debug!(invoice_id = %id, "Not a page id, treating as not found");
            return Ok(None);
        }

        let page = match self.fetch_page(id).await? {
            Some(page) => page,
            None => return Ok(None),
        };

        // Public links must not expose pages from other databases.
        if !page.is_live() || !page.belongs_to(&self.settings.database_id) {
            tracing::info!(invoice_id = %id, "Page is archived or outside the invoice database");
            return Ok(None);
        }

        let items = self.fetch_items(&page).await?;
        mapping::invoice_from_page(&page, items).map(Some)
    }

    async fn list_invoices(&self, query: &ListQuery) -> Result<InvoicePage, StoreError> {
        let url = self.url(&format!("/databases/{}/query", self.settings.database_id));

        let direction = match query.order {
            SortOrder::Asc => "ascending",
            SortOrder::Desc => "descending",
        };
        let mut body = serde_json::json!({
            "page_size": query.page_size.clamp(1, MAX_PAGE_SIZE),
            "sorts": [{
                "property": mapping::sort_property(query.sort),
                "direction": direction,
            }],
        });
        if let Some(cursor) = &query.cursor {
            body["start_cursor"] = serde_json::Value::String(cursor.clone());
        }

        let response: QueryResponse = self
            .send_json("notion.query_database", || self.client.post(&url).json(&body))
            .await?;

        let mut items = Vec::with_capacity(response.results.len());
        for value in response.results {
            let row = serde_json::from_value::<Page>(value)
                .map_err(|e| StoreError::Decode(e.to_string()))
                .and_then(|page| mapping::list_item_from_page(&page));
            match row {
                Ok(item) => items.push(item),
                Err(e) => tracing::warn!(error = %e, "Skipping malformed invoice row"),
            }
        }

        Ok(InvoicePage {
            items,
            next_cursor: response.next_cursor,
            has_more: response.has_more,
        })
    }
}
