use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use order_claim::api::rest::router;
use order_claim::state::AppState;
use order_claim::store::memory::MemoryOrderStore;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup() -> axum::Router {
    let state = AppState::new(
        Arc::new(MemoryOrderStore::new()),
        1024,
        Duration::from_secs(5),
    );
    router(Arc::new(state))
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn take_request(id: i64) -> Request<Body> {
    json_request("PATCH", &format!("/orders/{id}"), json!({ "status": "TAKEN" }))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn create_order(app: &axum::Router, origin: Value, destination: Value) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({ "origin": origin, "destination": destination }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

#[tokio::test]
async fn health_returns_ok() {
    let app = setup();
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["store"], "memory");
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let app = setup();
    create_order(&app, json!(["0", "0"]), json!(["1", "1"])).await;

    let response = app.oneshot(get_request("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("orders_created_total 1"));
}

#[tokio::test]
async fn create_order_computes_distance() {
    let app = setup();
    let order = create_order(
        &app,
        json!(["52.5200", "13.4050"]),
        json!(["48.8566", "2.3522"]),
    )
    .await;

    assert_eq!(order["status"], "UNASSIGNED");
    assert_eq!(order["version"], 1);
    assert!(order["id"].as_i64().unwrap() > 0);
    let distance = order["distance"].as_i64().unwrap();
    assert!((distance - 878_000).abs() <= 5_000);
}

#[tokio::test]
async fn create_order_accepts_numbers() {
    let app = setup();
    let order = create_order(&app, json!([39.9042, 116.4074]), json!([31.2304, 121.4737])).await;

    let distance = order["distance"].as_i64().unwrap();
    assert!((distance - 1_064_000).abs() <= 5_000);
}

#[tokio::test]
async fn create_order_out_of_range_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({ "origin": ["90.0001", "0"], "destination": ["0", "0"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("origin latitude"), "{message}");
}

#[tokio::test]
async fn create_order_non_numeric_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({ "origin": ["0", "0"], "destination": ["0", "east"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("destination longitude"));
}

#[tokio::test]
async fn create_order_malformed_body_returns_400() {
    let app = setup();
    let response = app
        .oneshot(json_request("POST", "/orders", json!({ "origin": ["0"] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_order_round_trips() {
    let app = setup();
    let created = create_order(&app, json!(["51.5074", "-0.1278"]), json!(["52.2297", "21.0122"])).await;
    let id = created["id"].as_i64().unwrap();

    let response = app
        .oneshot(get_request(&format!("/orders/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let fetched = body_json(response).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_nonexistent_order_returns_404() {
    let app = setup();
    let response = app.oneshot(get_request("/orders/9999")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_order_with_bad_id_returns_400() {
    let app = setup();
    for uri in ["/orders/0", "/orders/-3", "/orders/abc"] {
        let response = app.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}

#[tokio::test]
async fn take_order_then_retake_conflicts() {
    let app = setup();
    let created = create_order(&app, json!(["0", "0"]), json!(["0", "1"])).await;
    let id = created["id"].as_i64().unwrap();

    let response = app.clone().oneshot(take_request(id)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "SUCCESS");

    for _ in 0..3 {
        let response = app.clone().oneshot(take_request(id)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("already taken"));
    }

    let fetched = body_json(
        app.oneshot(get_request(&format!("/orders/{id}")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(fetched["status"], "TAKEN");
    assert_eq!(fetched["version"], 2);
    assert_eq!(fetched["distance"], created["distance"]);
}

#[tokio::test]
async fn take_missing_order_returns_404() {
    let app = setup();
    let response = app.oneshot(take_request(12)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn take_with_other_status_returns_400() {
    let app = setup();
    let created = create_order(&app, json!(["0", "0"]), json!(["0", "1"])).await;
    let id = created["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/orders/{id}"),
            json!({ "status": "UNASSIGNED" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let fetched = body_json(
        app.oneshot(get_request(&format!("/orders/{id}")))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(fetched["status"], "UNASSIGNED");
}

#[tokio::test]
async fn list_orders_pages_in_creation_order() {
    let app = setup();
    let mut ids = Vec::new();
    for step in 0..25 {
        let order = create_order(&app, json!(["0", "0"]), json!(["0", step.to_string()])).await;
        ids.push(order["id"].as_i64().unwrap());
    }

    let response = app
        .clone()
        .oneshot(get_request("/orders?page=2&limit=10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page: Vec<i64> = body_json(response)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|order| order["id"].as_i64().unwrap())
        .collect();
    assert_eq!(page, ids[10..20].to_vec());

    let response = app
        .oneshot(get_request("/orders?page=4&limit=10"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn list_orders_second_page_empty_when_few_orders() {
    let app = setup();
    for _ in 0..10 {
        create_order(&app, json!(["0", "0"]), json!(["1", "1"])).await;
    }

    let response = app
        .oneshot(get_request("/orders?page=2&limit=10"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_orders_with_bad_paging_returns_400() {
    let app = setup();
    for uri in [
        "/orders",
        "/orders?page=0&limit=10",
        "/orders?page=1&limit=0",
        "/orders?page=x&limit=10",
    ] {
        let response = app.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
    }
}
