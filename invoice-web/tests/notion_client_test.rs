use invoice_web::config::NotionSettings;
use invoice_web::models::InvoiceStatus;
use invoice_web::services::store::{ListQuery, SortField, SortOrder};
use invoice_web::services::{InvoiceStore, NotionClient, StoreError};
use rust_decimal::Decimal;
use secrecy::Secret;
use serde_json::{json, Value};
use std::time::Duration;
use web_core::retry::RetryPolicy;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DATABASE_ID: &str = "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee";
const INVOICE_ID: &str = "11111111-2222-3333-4444-555555555555";
const ITEM_ONE: &str = "99999999-0000-0000-0000-000000000001";
const ITEM_TWO: &str = "99999999-0000-0000-0000-000000000002";
const ITEM_THREE: &str = "99999999-0000-0000-0000-000000000003";

fn client(server: &MockServer) -> NotionClient {
    NotionClient::new(NotionSettings {
        api_key: Secret::new("secret_test".to_string()),
        database_id: DATABASE_ID.replace('-', ""),
        api_url: server.uri(),
    })
    .unwrap()
    .with_retry_policy(RetryPolicy {
        max_retries: 2,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        backoff_multiplier: 2.0,
        add_jitter: false,
    })
}

fn invoice_page(id: &str, parent: &str) -> Value {
    json!({
        "object": "page",
        "id": id,
        "archived": false,
        "in_trash": false,
        "parent": { "type": "database_id", "database_id": parent },
        "properties": {
            "Invoice Number": { "id": "a", "type": "title", "title": [{ "plain_text": "Q-2024-001" }] },
            "Client": { "id": "b", "type": "rich_text", "rich_text": [{ "plain_text": "Acme " }, { "plain_text": "Corp" }] },
            "Issue Date": { "id": "c", "type": "date", "date": { "start": "2024-03-01", "end": null } },
            "Expiry Date": { "id": "d", "type": "date", "date": { "start": "2024-03-31" } },
            "Status": { "id": "e", "type": "status", "status": { "name": "승인" } },
            "Total Amount": { "id": "f", "type": "number", "number": 350000 },
            "Memo": { "id": "g", "type": "rich_text", "rich_text": [{ "plain_text": "VAT included" }] },
            "Items": { "id": "h", "type": "relation", "relation": [{ "id": ITEM_ONE }, { "id": ITEM_TWO }], "has_more": false }
        }
    })
}

fn item_page(id: &str, name: &str, quantity: f64, unit_price: f64) -> Value {
    json!({
        "object": "page",
        "id": id,
        "parent": { "type": "database_id", "database_id": "items-db" },
        "properties": {
            "Item Name": { "type": "title", "title": [{ "plain_text": name }] },
            "Quantity": { "type": "number", "number": quantity },
            "Unit Price": { "type": "number", "number": unit_price },
            "Subtotal": { "type": "formula", "formula": { "type": "number", "number": quantity * unit_price } }
        }
    })
}

async fn mount_page(server: &MockServer, id: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/pages/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn get_invoice_maps_page_and_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/pages/{}", INVOICE_ID)))
        .and(header("Notion-Version", "2022-06-28"))
        .and(header("Authorization", "Bearer secret_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(invoice_page(INVOICE_ID, DATABASE_ID)))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, ITEM_ONE, item_page(ITEM_ONE, "Design", 1.0, 200000.0)).await;
    mount_page(&server, ITEM_TWO, item_page(ITEM_TWO, "Hosting", 3.0, 50000.0)).await;

    let invoice = client(&server)
        .get_invoice(INVOICE_ID)
        .await
        .unwrap()
        .expect("invoice should be found");

    assert_eq!(invoice.invoice_number, "Q-2024-001");
    assert_eq!(invoice.client_name, "Acme Corp");
    assert_eq!(invoice.status, InvoiceStatus::Approved);
    assert_eq!(invoice.total_amount, Decimal::from(350000));
    assert_eq!(invoice.memo.as_deref(), Some("VAT included"));
    let names: Vec<&str> = invoice.items.iter().map(|i| i.item_name.as_str()).collect();
    assert_eq!(names, vec!["Design", "Hosting"]);
    assert_eq!(invoice.items[1].subtotal, Decimal::from(150000));
    assert!(invoice.consistency_issues().is_empty());
}

#[tokio::test]
async fn items_keep_relation_order_when_fetched_concurrently() {
    let server = MockServer::start().await;
    mount_page(&server, INVOICE_ID, invoice_page(INVOICE_ID, DATABASE_ID)).await;
    Mock::given(method("GET"))
        .and(path(format!("/pages/{}", ITEM_ONE)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(item_page(ITEM_ONE, "Design", 1.0, 200000.0))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    mount_page(&server, ITEM_TWO, item_page(ITEM_TWO, "Hosting", 3.0, 50000.0)).await;

    let invoice = client(&server)
        .get_invoice(INVOICE_ID)
        .await
        .unwrap()
        .expect("invoice should be found");

    let ids: Vec<&str> = invoice.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec![ITEM_ONE, ITEM_TWO]);
}

#[tokio::test]
async fn truncated_item_relation_is_paged_through() {
    let server = MockServer::start().await;
    let mut page = invoice_page(INVOICE_ID, DATABASE_ID);
    page["properties"]["Items"] = json!({
        "id": "rel1",
        "type": "relation",
        "relation": [{ "id": ITEM_ONE }],
        "has_more": true
    });
    mount_page(&server, INVOICE_ID, page).await;

    let relation_item = |id: &str| {
        json!({ "object": "property_item", "id": "rel1", "type": "relation", "relation": { "id": id } })
    };
    Mock::given(method("GET"))
        .and(path(format!("/pages/{}/properties/rel1", INVOICE_ID)))
        .and(query_param("start_cursor", "cursor-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [relation_item(ITEM_THREE)],
            "next_cursor": null,
            "has_more": false,
            "type": "property_item"
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/pages/{}/properties/rel1", INVOICE_ID)))
        .and(query_param("page_size", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [relation_item(ITEM_ONE), relation_item(ITEM_TWO)],
            "next_cursor": "cursor-2",
            "has_more": true,
            "type": "property_item"
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, ITEM_ONE, item_page(ITEM_ONE, "Design", 1.0, 200000.0)).await;
    mount_page(&server, ITEM_TWO, item_page(ITEM_TWO, "Hosting", 3.0, 50000.0)).await;
    mount_page(&server, ITEM_THREE, item_page(ITEM_THREE, "Support", 1.0, 0.0)).await;

    let invoice = client(&server)
        .get_invoice(INVOICE_ID)
        .await
        .unwrap()
        .expect("invoice should be found");

    let names: Vec<&str> = invoice.items.iter().map(|i| i.item_name.as_str()).collect();
    assert_eq!(names, vec!["Design", "Hosting", "Support"]);
}

#[tokio::test]
async fn missing_page_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/pages/{}", INVOICE_ID)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "object": "error",
            "status": 404,
            "code": "object_not_found",
            "message": "Could not find page"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).get_invoice(INVOICE_ID).await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn page_from_another_database_is_none() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        INVOICE_ID,
        invoice_page(INVOICE_ID, "bbbbbbbb-bbbb-bbbb-bbbb-bbbbbbbbbbbb"),
    )
    .await;

    let result = client(&server).get_invoice(INVOICE_ID).await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn non_page_id_skips_the_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = client(&server).get_invoice("../databases").await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn unauthorized_surfaces_as_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/pages/{}", INVOICE_ID)))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "object": "error",
            "status": 401,
            "code": "unauthorized",
            "message": "API token is invalid."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).get_invoice(INVOICE_ID).await.unwrap_err();

    assert!(matches!(err, StoreError::Api { status: 401, ref code, .. } if code == "unauthorized"));
}

#[tokio::test]
async fn rate_limited_request_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/pages/{}", INVOICE_ID)))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "0")
                .set_body_json(json!({
                    "object": "error",
                    "status": 429,
                    "code": "rate_limited",
                    "message": "slow down"
                })),
        )
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/pages/{}", INVOICE_ID)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "object": "error",
            "status": 404,
            "code": "object_not_found",
            "message": "gone"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client(&server).get_invoice(INVOICE_ID).await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn list_invoices_sends_query_and_skips_malformed_rows() {
    let server = MockServer::start().await;
    let broken = json!({
        "object": "page",
        "id": "22222222-2222-2222-2222-222222222222",
        "parent": { "type": "database_id", "database_id": DATABASE_ID },
        "properties": {
            "Invoice Number": { "type": "title", "title": [{ "plain_text": "Q-2024-002" }] }
        }
    });
    Mock::given(method("POST"))
        .and(path(format!("/databases/{}/query", DATABASE_ID.replace('-', ""))))
        .and(body_partial_json(json!({
            "page_size": 10,
            "start_cursor": "cursor-1",
            "sorts": [{ "property": "Total Amount", "direction": "ascending" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [invoice_page(INVOICE_ID, DATABASE_ID), broken],
            "next_cursor": "cursor-2",
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .list_invoices(&ListQuery {
            page_size: 10,
            cursor: Some("cursor-1".to_string()),
            sort: SortField::TotalAmount,
            order: SortOrder::Asc,
        })
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, INVOICE_ID);
    assert_eq!(page.items[0].client_name, "Acme Corp");
    assert_eq!(page.next_cursor.as_deref(), Some("cursor-2"));
    assert!(page.has_more);
}
