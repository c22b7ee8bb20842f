#![allow(dead_code)]

use async_trait::async_trait;
use axum::{body::Body, http::Response, Router};
use chrono::NaiveDate;
use invoice_web::config::Settings;
use invoice_web::models::{Credentials, Invoice, InvoiceItem, InvoiceListItem, InvoiceStatus, Issuer};
use invoice_web::services::{
    AuthError, Authenticator, ConfiguredIssuer, InvoicePage, InvoiceStore, ListQuery, StoreError,
};
use invoice_web::startup::build_router;
use invoice_web::AppState;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const ISSUER_EMAIL: &str = "issuer@example.com";
pub const ISSUER_PASSWORD: &str = "correct-horse";

const BASE: &str = r#"
server:
  host: 127.0.0.1
  port: 3000
  session_ttl_minutes: 30
  static_dir: static
company:
  company_name: Example Studio
  address: 1 Example Street
  contact: billing@example.com
  business_number: 123-45-67890
"#;

pub fn settings() -> Settings {
    let env: HashMap<String, String> = [
        ("NODE_ENV", "test"),
        ("NOTION_API_KEY", "secret_test"),
        ("NOTION_DATABASE_ID", "0123456789abcdef0123456789abcdef"),
        ("NEXT_PUBLIC_APP_URL", "https://quotes.example.com"),
        ("ISSUER_EMAIL", ISSUER_EMAIL),
        ("ISSUER_PASSWORD", ISSUER_PASSWORD),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    Settings::load(config::File::from_str(BASE, config::FileFormat::Yaml), &env)
        .expect("Failed to load test settings")
}

pub fn sample_invoice(id: &str) -> Invoice {
    let date = |d: &str| NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap();
    Invoice {
        id: id.to_string(),
        invoice_number: "Q-2024-007".to_string(),
        client_name: "Acme Corp".to_string(),
        issue_date: date("2024-05-01"),
        expiry_date: date("2024-05-31"),
        status: InvoiceStatus::Sent,
        total_amount: Decimal::from(1_500_000),
        memo: Some("Payment within 30 days".to_string()),
        items: vec![InvoiceItem {
            id: "item-1".to_string(),
            invoice_id: id.to_string(),
            item_name: "Website redesign".to_string(),
            quantity: Decimal::from(3),
            unit_price: Decimal::from(500_000),
            subtotal: Decimal::from(1_500_000),
        }],
    }
}

/// In-memory store. `failing` makes every call return an upstream error.
#[derive(Default)]
pub struct FakeStore {
    pub invoices: Vec<Invoice>,
    pub failing: bool,
}

impl FakeStore {
    pub fn with(invoices: Vec<Invoice>) -> Self {
        Self {
            invoices,
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            invoices: Vec::new(),
            failing: true,
        }
    }

    fn unavailable() -> StoreError {
        StoreError::Api {
            status: 503,
            code: "service_unavailable".to_string(),
            message: "down for maintenance".to_string(),
            retry_after: None,
        }
    }
}

#[async_trait]
impl InvoiceStore for FakeStore {
    async fn get_invoice(&self, id: &str) -> Result<Option<Invoice>, StoreError> {
        if self.failing {
            return Err(Self::unavailable());
        }
        Ok(self.invoices.iter().find(|i| i.id == id).cloned())
    }

    async fn list_invoices(&self, query: &ListQuery) -> Result<InvoicePage, StoreError> {
        if self.failing {
            return Err(Self::unavailable());
        }
        let items: Vec<InvoiceListItem> = self
            .invoices
            .iter()
            .take(query.page_size as usize)
            .map(InvoiceListItem::from)
            .collect();
        Ok(InvoicePage {
            has_more: self.invoices.len() > items.len(),
            next_cursor: None,
            items,
        })
    }
}

/// Wraps the configured issuer and counts calls.
pub struct CountingAuthenticator {
    inner: ConfiguredIssuer,
    pub calls: AtomicUsize,
}

impl CountingAuthenticator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            inner: ConfiguredIssuer::new(settings.issuer.clone()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authenticator for CountingAuthenticator {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Issuer, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.authenticate(credentials).await
    }
}

pub struct TestApp {
    pub router: Router,
    pub authenticator: Arc<CountingAuthenticator>,
}

pub fn spawn_app(store: FakeStore) -> TestApp {
    let settings = settings();
    let authenticator = Arc::new(CountingAuthenticator::new(&settings));
    let state = AppState::new(Arc::new(settings), Arc::new(store), authenticator.clone());

    TestApp {
        router: build_router(state),
        authenticator,
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    String::from_utf8(bytes.to_vec()).expect("Body is not UTF-8")
}

/// `name=value` part of the session cookie, ready for a `Cookie` header.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(str::to_string)
        .next()
}
