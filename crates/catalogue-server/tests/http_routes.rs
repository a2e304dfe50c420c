// crates/catalogue-server/tests/http_routes.rs
// ============================================================================
// Module: HTTP Route Tests
// Description: Route table and response encoding driven without sockets.
// Purpose: Pin methods, paths, status codes, headers, and body shapes.
// Dependencies: catalogue-server, axum, tower
// ============================================================================

//! HTTP route integration tests.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use axum::Router;
use axum::body::Body;
use axum::body::to_bytes;
use axum::http::HeaderValue;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use catalogue_config::ServerConfig;
use catalogue_server::server::router;
use common::PASSWORD;
use common::TRUSTED_SUBJECT;
use common::WRITER;
use common::basic;
use serde_json::Value;
use serde_json::json;
use tower::ServiceExt;

const SUBJECT_HEADER: &str = "x-catalogue-client-subject";

struct Response {
    status: StatusCode,
    content_type: Option<String>,
    body: Vec<u8>,
}

impl Response {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

fn app(harness: &common::Harness) -> Router {
    router(harness.dispatcher.clone(), &ServerConfig::default()).unwrap()
}

fn small_app(harness: &common::Harness, max_body_bytes: usize) -> Router {
    let config = ServerConfig {
        max_body_bytes,
        ..ServerConfig::default()
    };
    router(harness.dispatcher.clone(), &config).unwrap()
}

async fn send(app: Router, request: Request<Body>) -> Response {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec();
    Response {
        status,
        content_type,
        body,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn write(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(SUBJECT_HEADER, TRUSTED_SUBJECT)
        .header(AUTHORIZATION, basic(WRITER, PASSWORD))
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn item_types_route_returns_fixed_list() {
    let h = common::harness();
    let response = send(app(&h), get("/list/catalogue/item-types")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type.as_deref(), Some("application/json; charset=utf-8"));
    assert_eq!(response.json()["item-types"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn create_list_and_remove_round_trip() {
    let h = common::harness();
    let created = send(
        app(&h),
        write(Method::POST, "/create/catalogue/provider", json!({"name": "acme", "tags": ["X"]})),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = created.json()["id"].as_str().unwrap().to_string();

    let listed = send(app(&h), get("/list/catalogue/provider")).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.json()[0]["id"], json!(id));
    assert!(listed.json()[0].get("_tags").is_none());

    let tags = send(app(&h), get("/list/catalogue/tags")).await;
    assert_eq!(tags.json(), json!(["X"]));

    let removed =
        send(app(&h), write(Method::DELETE, &format!("/remove/catalogue/provider/{id}"), json!({})))
            .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    assert!(removed.body.is_empty());
}

#[tokio::test]
async fn search_and_count_read_the_query_string() {
    let h = common::harness();
    for name in ["a", "b"] {
        let request = write(Method::POST, "/create/catalogue/data-model", json!({"name": name}));
        assert_eq!(send(app(&h), request).await.status, StatusCode::CREATED);
    }
    let search = send(app(&h), get("/search/catalogue/attribute?name=b")).await;
    assert_eq!(search.status, StatusCode::OK);
    assert_eq!(search.json().as_array().unwrap().len(), 1);

    let count = send(app(&h), get("/count/catalogue/attribute?item-type=data-model")).await;
    assert_eq!(count.json(), json!({"count": 2}));

    let bad = send(app(&h), get("/search/catalogue/attribute")).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.json(), json!({"Status": "Bad Query"}));
}

#[tokio::test]
async fn faults_use_status_body_shape() {
    let h = common::harness();
    let unauthenticated = Request::builder()
        .method(Method::POST)
        .uri("/create/catalogue/provider")
        .header(AUTHORIZATION, basic(WRITER, PASSWORD))
        .body(Body::from("{}"))
        .unwrap();
    let response = send(app(&h), unauthenticated).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json(), json!({"Status": "Certificate authentication error"}));

    let wrong_password = Request::builder()
        .method(Method::POST)
        .uri("/create/catalogue/provider")
        .header(SUBJECT_HEADER, TRUSTED_SUBJECT)
        .header(AUTHORIZATION, basic(WRITER, "nope"))
        .body(Body::from("{}"))
        .unwrap();
    let response = send(app(&h), wrong_password).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({"Status": "Your password is invalid"}));

    let update = write(Method::PUT, "/update/catalogue/provider/a", json!({"id": "a"}));
    let response = send(app(&h), update).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn skip_validation_header_is_forwarded() {
    let h = common::harness();
    let mut request = write(Method::POST, "/create/catalogue/provider", json!({"name": "x"}));
    request.headers_mut().insert("skip_validation", "sometimes".parse().unwrap());
    let response = send(app(&h), request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({"Status": "Invalid value: skip_validation is not a boolean"})
    );
}

#[tokio::test]
async fn non_ascii_skip_validation_is_not_a_boolean() {
    let h = common::harness();
    let mut request = write(Method::POST, "/create/catalogue/provider", json!({"name": "x"}));
    request
        .headers_mut()
        .insert("skip_validation", HeaderValue::from_bytes(b"tr\xc3\xbce").unwrap());
    let response = send(app(&h), request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({"Status": "Invalid value: skip_validation is not a boolean"})
    );
}

#[tokio::test]
async fn non_ascii_authorization_is_malformed() {
    let h = common::harness();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/create/catalogue/provider")
        .header(SUBJECT_HEADER, TRUSTED_SUBJECT)
        .header(AUTHORIZATION, HeaderValue::from_bytes(b"Basic \xff\xfe").unwrap())
        .body(Body::from("{}"))
        .unwrap();
    let response = send(app(&h), request).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json(), json!({"Status": "Malformed authorization header"}));
}

#[tokio::test]
async fn bulk_routes_cover_create_update_and_remove() {
    let h = common::harness();
    let created = send(
        app(&h),
        write(
            Method::POST,
            "/create/catalogue/resource-item/bulk/run-1",
            json!([{"name": "a"}, {"name": "b"}]),
        ),
    )
    .await;
    assert_eq!(created.status, StatusCode::OK);
    let body = created.json();
    assert_eq!(body["bulk-id"], json!("run-1"));
    assert_eq!(body["status"], json!("success"));
    assert_eq!(body["ids"].as_array().unwrap().len(), 2);

    let updated = send(
        app(&h),
        write(Method::PATCH, "/update/catalogue/resource-item/bulk/run-1", json!({"a": 1})),
    )
    .await;
    assert_eq!(updated.status, StatusCode::INTERNAL_SERVER_ERROR);

    let removed = send(
        app(&h),
        write(Method::DELETE, "/remove/catalogue/resource-item/bulk/run-1", json!({})),
    )
    .await;
    assert_eq!(removed.status, StatusCode::NO_CONTENT);
    let listed = send(app(&h), get("/list/catalogue/resource-item")).await;
    assert_eq!(listed.json(), json!([]));
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let h = common::harness();
    let request = write(
        Method::POST,
        "/create/catalogue/provider",
        json!({"name": "x".repeat(256)}),
    );
    let response = send(small_app(&h, 64), request).await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
}
