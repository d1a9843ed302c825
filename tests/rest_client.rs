//! REST client behavior against a mock PostgREST server.
#![cfg(feature = "async")]

use fintrack::cache::InMemoryCache;
use fintrack::client::RestClient;
use fintrack::error::FinTrackError;
use fintrack::models::{
    Filter, Freshness, OrderBy, TransactionDraft, TransactionId, TransactionPatch,
    TransactionType, UserId,
};
use fintrack::remote::RemoteStore;
use fintrack::sync::CacheSync;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the default table under the mock server.
const TABLE_PATH: &str = "/rest/v1/transactions";

/// Builds a client pointed at `server` with an anon key.
fn client_for(server: &MockServer) -> RestClient {
    RestClient::builder()
        .base_url(server.uri())
        .api_key("anon")
        .build()
        .unwrap()
}

/// The user every request acts as.
fn user() -> UserId {
    UserId::new("u-1")
}

/// Two rows in the shape the store returns them.
fn stored_rows() -> serde_json::Value {
    json!([
        {
            "id": 9,
            "user_id": "u-1",
            "title": "Salary",
            "amount": "2500.00",
            "type": "income",
            "category": null,
            "currency": "INR",
            "date": "2024-03-01",
            "created_at": "2024-03-01T09:15:00.123456+00:00"
        },
        {
            "id": 4,
            "user_id": "u-1",
            "title": "Groceries",
            "amount": 42.5,
            "type": "expense",
            "category": " Food ",
            "created_at": "not a timestamp"
        }
    ])
}

#[tokio::test]
async fn select_sends_filters_and_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("select", "*"))
        .and(query_param("user_id", "eq.u-1"))
        .and(query_param("order", "id.desc"))
        .and(header("apikey", "anon"))
        .and(header("authorization", "Bearer anon"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored_rows()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let rows = client
        .select(&Filter::new().user(user()), OrderBy::id_desc())
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    let salary = rows.first().unwrap();
    assert_eq!(salary.id, TransactionId::new(9));
    assert!((salary.amount - 2500.0).abs() < f64::EPSILON);
    assert!(salary.date.is_some());
    assert!(salary.created_at.is_some());
    let groceries = rows.get(1).unwrap();
    assert_eq!(groceries.kind, TransactionType::Expense);
    assert_eq!(groceries.normalized_category(), "Food");
    assert!(groceries.created_at.is_none());
}

#[tokio::test]
async fn access_token_replaces_key_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("apikey", "anon"))
        .and(header("authorization", "Bearer user-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = RestClient::builder()
        .base_url(server.uri())
        .api_key("anon")
        .access_token("user-jwt")
        .build()
        .unwrap();
    let rows = client
        .select(&Filter::new().user(user()), OrderBy::id_desc())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn error_status_maps_to_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .select(&Filter::new(), OrderBy::id_desc())
        .await
        .unwrap_err();
    assert!(err.is_remote_failure());
    assert!(matches!(
        &err,
        FinTrackError::Api { status: 500, message } if message == "boom"
    ));
}

#[tokio::test]
async fn unreachable_store_is_remote_failure() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let client = RestClient::builder()
        .base_url(format!("http://127.0.0.1:{port}"))
        .api_key("anon")
        .build()
        .unwrap();
    let err = client
        .select(&Filter::new(), OrderBy::id_desc())
        .await
        .unwrap_err();
    assert!(matches!(err, FinTrackError::Http(_)));
    assert!(err.is_remote_failure());
}

#[tokio::test]
async fn insert_posts_owner_and_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({
            "user_id": "u-1",
            "title": "Coffee",
            "amount": 4.5,
            "type": "expense",
            "category": "Food",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": 31,
            "user_id": "u-1",
            "title": "Coffee",
            "amount": 4.5,
            "type": "expense",
            "category": "Food",
            "currency": "INR",
            "created_at": "2024-03-02T08:00:00Z"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let draft = TransactionDraft::new("Coffee", 4.5, TransactionType::Expense).category("Food");
    let created = client_for(&server).insert(&user(), &draft).await.unwrap();
    assert_eq!(created.id, TransactionId::new(31));
    assert_eq!(created.user_id, Some(user()));
}

#[tokio::test]
async fn update_targets_id_and_sends_only_patch_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.4"))
        .and(query_param("user_id", "eq.u-1"))
        .and(body_partial_json(json!({ "amount": 50.0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 4,
            "user_id": "u-1",
            "title": "Groceries",
            "amount": 50.0,
            "type": "expense"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let filter = Filter::new().user(user()).id(TransactionId::new(4));
    let updated = client_for(&server)
        .update(&filter, &TransactionPatch::new().amount(50.0))
        .await
        .unwrap();
    assert!((updated.amount - 50.0).abs() < f64::EPSILON);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = requests.first().unwrap().body_json().unwrap();
    assert_eq!(body, json!({ "amount": 50.0 }));
}

#[tokio::test]
async fn empty_update_result_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let filter = Filter::new().user(user()).id(TransactionId::new(404));
    let err = client_for(&server)
        .update(&filter, &TransactionPatch::new().title("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, FinTrackError::NotFound { id } if id == TransactionId::new(404)));
}

#[tokio::test]
async fn delete_requires_id_and_reports_missing_rows() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 4,
            "type": "expense"
        }])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let filter = Filter::new().user(user()).id(TransactionId::new(4));
    client.delete(&filter).await.unwrap();
    assert!(client.delete(&filter).await.unwrap_err().is_not_found());

    let unscoped = client.delete(&Filter::new().user(user())).await.unwrap_err();
    assert!(unscoped.is_validation());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn malformed_rows_do_not_blank_a_fresh_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 12,
                "user_id": "u-1",
                "title": "Rent",
                "amount": 900,
                "type": "expense",
                "currency": "INR"
            },
            {
                "id": 11,
                "user_id": "u-1",
                "title": null,
                "amount": 15,
                "type": "expense",
                "currency": null
            },
            {
                "user_id": "u-1",
                "title": "no id",
                "type": "expense"
            }
        ])))
        .mount(&server)
        .await;

    let sync = CacheSync::builder()
        .remote(client_for(&server))
        .cache(InMemoryCache::new())
        .build()
        .unwrap();

    let loaded = sync.load(&user()).await;
    assert_eq!(loaded.freshness, Freshness::Fresh);
    let ids: Vec<i64> = loaded
        .transactions
        .iter()
        .map(|tx| tx.id.into_inner())
        .collect();
    assert_eq!(ids, vec![12, 11]);
    assert_eq!(sync.cached(&user()).await.unwrap(), loaded.transactions);
}

#[tokio::test]
async fn sync_serves_cache_when_store_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored_rows()))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let sync = CacheSync::builder()
        .remote(client_for(&server))
        .cache(InMemoryCache::new())
        .build()
        .unwrap();

    let fresh = sync.load(&user()).await;
    assert_eq!(fresh.freshness, Freshness::Fresh);
    assert_eq!(fresh.transactions.len(), 2);

    let stale = sync.load(&user()).await;
    assert_eq!(stale.freshness, Freshness::Stale);
    assert_eq!(stale.transactions, fresh.transactions);
}

#[cfg(feature = "blocking")]
#[tokio::test]
async fn blocking_client_selects_rows() {
    use fintrack::client::RestBlockingClient;
    use fintrack::remote::BlockingRemoteStore;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("user_id", "eq.u-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(stored_rows()))
        .mount(&server)
        .await;

    let uri = server.uri();
    let rows = tokio::task::spawn_blocking(move || {
        RestBlockingClient::builder()
            .base_url(uri)
            .api_key("anon")
            .build()
            .and_then(|client| client.select(&Filter::new().user(user()), OrderBy::id_desc()))
    })
    .await
    .unwrap()
    .unwrap();
    assert_eq!(rows.len(), 2);
}
