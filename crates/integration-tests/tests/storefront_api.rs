//! Storefront API tests over a healthy primary store.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use quickdrop_integration_tests::{TestApp, decimal};
use quickdrop_storefront::services::default_catalog;

fn product_id(index: usize) -> String {
    default_catalog()[index].id.to_string()
}

fn line(index: usize, quantity: i64) -> Value {
    let product = &default_catalog()[index];
    json!({
        "productId": product.id.to_string(),
        "quantity": quantity,
        "price": product.price.amount().to_string(),
    })
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::new();

    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, json!("ok"));

    assert_eq!(app.get("/health/ready").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_every_response_carries_a_request_id() {
    let app = TestApp::new();

    let response = app.get("/api/products").await;
    assert!(response.headers.contains_key("x-request-id"));

    let response = app.get("/api/user").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_login_twice_updates_the_same_customer() {
    let app = TestApp::new();

    let first = app.login("Alice", "alice@example.com", "555-0100").await;
    let second = app.login("Alice Smith", "alice@example.com", "555-0199").await;

    assert_eq!(first["id"], second["id"]);
    assert_eq!(second["name"], "Alice Smith");
    assert_eq!(second["phone"], "555-0199");
    assert_eq!(app.store.user_count(), 1);

    let response = app.get("/api/user?email=alice@example.com").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "Alice Smith");
}

#[tokio::test]
async fn test_login_rejects_bad_input() {
    let app = TestApp::new();

    let response = app
        .post(
            "/api/auth/login",
            &json!({ "name": "Bob", "email": "bob-at-example", "phone": "1" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "InvalidInput");

    let response = app
        .post(
            "/api/auth/login",
            &json!({ "name": " ", "email": "bob@example.com", "phone": "1" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["detail"], "name is required");
}

#[tokio::test]
async fn test_malformed_json_is_invalid_input() {
    let app = TestApp::new();

    let response = app
        .post("/api/orders", &json!({ "userId": "x", "items": "not-a-list" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["kind"], "InvalidInput");
}

#[tokio::test]
async fn test_products_come_from_the_store() {
    let app = TestApp::new();

    let response = app.get("/api/products").await;
    assert_eq!(response.status, StatusCode::OK);
    let products = response.body.as_array().unwrap();
    assert_eq!(products.len(), 12);
    assert!(products.iter().any(|p| p["name"] == "Fresh Bananas"));
}

#[tokio::test]
async fn test_order_total_is_the_exact_sum_of_lines() {
    let app = TestApp::new();
    let user = app.login("Carol", "carol@example.com", "555-0101").await;

    // 49 x 2 + 10 x 3 + 125 x 1
    let response = app
        .post(
            "/api/orders",
            &json!({
                "userId": user["id"],
                "address": "12 Market Road",
                "items": [line(0, 2), line(10, 3), line(5, 1)],
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    let order = &response.body;
    assert_eq!(decimal(&order["totalPrice"]), Some(Decimal::from(253)));
    assert_eq!(order["status"], "PLACED");
    assert_eq!(order["persisted"], true);
    assert_eq!(order["items"].as_array().unwrap().len(), 3);
    assert_eq!(order["userId"], user["id"]);
}

#[tokio::test]
async fn test_fractional_prices_do_not_drift() {
    let app = TestApp::new();
    let user = app.login("Dan", "dan@example.com", "555-0102").await;

    let items: Vec<Value> = (0..10)
        .map(|i| {
            json!({
                "productId": product_id(i),
                "quantity": 1,
                "unitPrice": "0.10",
            })
        })
        .collect();

    let response = app
        .post(
            "/api/orders",
            &json!({ "userId": user["id"], "address": "1 Penny Lane", "items": items }),
        )
        .await;

    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    assert_eq!(
        decimal(&response.body["totalPrice"]),
        Some("1.00".parse::<Decimal>().unwrap())
    );
}

#[tokio::test]
async fn test_order_validation() {
    let app = TestApp::new();
    let user = app.login("Erin", "erin@example.com", "555-0103").await;

    let cases = [
        json!({ "address": "1 Main St", "items": [line(0, 1)] }),
        json!({ "userId": user["id"], "address": "", "items": [line(0, 1)] }),
        json!({ "userId": user["id"], "address": "1 Main St", "items": [] }),
        json!({ "userId": user["id"], "address": "1 Main St", "items": [line(0, 0)] }),
        json!({ "userId": user["id"], "address": "1 Main St", "items": [line(0, -2)] }),
    ];

    for body in &cases {
        let response = app.post("/api/orders", body).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(response.body["kind"], "InvalidInput", "{body}");
    }
    assert_eq!(app.store.order_count(), 0);
}

#[tokio::test]
async fn test_order_for_unknown_customer_is_not_found() {
    let app = TestApp::new();

    let response = app
        .post(
            "/api/orders",
            &json!({
                "userId": "00000000-0000-4000-8000-000000000000",
                "address": "1 Main St",
                "items": [line(0, 1)],
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["kind"], "NotFound");
}

#[tokio::test]
async fn test_customer_profile_and_orders() {
    let app = TestApp::new();
    let user = app.login("Faye", "faye@example.com", "555-0104").await;
    let other = app.login("Gus", "gus@example.com", "555-0105").await;

    for (customer, index) in [(&user, 0), (&user, 1), (&other, 2)] {
        let response = app
            .post(
                "/api/orders",
                &json!({
                    "userId": customer["id"],
                    "address": "1 Main St",
                    "items": [line(index, 1)],
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let uri = format!("/api/user?userId={}", user["id"].as_str().unwrap());
    let profile = app.get(&uri).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["email"], "faye@example.com");
    assert_eq!(profile.body["orderCount"], 2);

    let uri = format!("/api/user/orders?userId={}", user["id"].as_str().unwrap());
    let orders = app.get(&uri).await;
    let orders = orders.body.as_array().unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|o| o["userId"] == user["id"]));
    assert!(orders[0]["items"][0]["product"]["name"].is_string());

    let all = app.get("/api/orders").await;
    assert_eq!(all.body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_customer_lookup_errors() {
    let app = TestApp::new();

    let response = app.get("/api/user?email=nobody@example.com").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["kind"], "NotFound");

    let response = app.get("/api/user?userId=not-a-uuid").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.request(Method::GET, "/api/user/orders", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["detail"], "userId is required");
}
