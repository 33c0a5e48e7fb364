//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{AddressId, Money, ProductId, UserId};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{AddressRecord, InMemoryStore, ProductRecord, ProductStatus};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    store: InMemoryStore,
    user_id: UserId,
    address_id: AddressId,
}

async fn setup() -> TestApp {
    let store = InMemoryStore::new();
    let user_id = UserId::new();

    store
        .seed_product(ProductRecord {
            id: ProductId::new("SKU-001"),
            name: "Widget".to_string(),
            price: Money::from_major(50),
            discount_price: Some(Money::from_major(40)),
            stock: 10,
            status: ProductStatus::Active,
        })
        .await;

    let address = AddressRecord {
        id: AddressId::new(),
        user_id,
        recipient: "Jordan Doe".to_string(),
        phone: "555-0100".to_string(),
        line1: "1 Main St".to_string(),
        line2: None,
        city: "Springfield".to_string(),
        postal_code: "12345".to_string(),
    };
    let address_id = address.id;
    store.seed_address(address).await;

    let state = api::create_default_state(store.clone());
    let app = api::create_app(state, get_metrics_handle());

    TestApp {
        app,
        store,
        user_id,
        address_id,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn request(method: &str, uri: &str, user: Option<&str>, guest: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    if let Some(guest) = guest {
        builder = builder.header("x-guest-token", guest);
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(
    method: &str,
    uri: &str,
    user: Option<&str>,
    guest: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    if let Some(guest) = guest {
        builder = builder.header("x-guest-token", guest);
    }
    builder
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let t = setup().await;

    let response = t.app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_cart_requires_an_identity() {
    let t = setup().await;

    let response = t.app.oneshot(get("/cart")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_guest_cart_add_and_view() {
    let t = setup().await;

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/cart/lines",
            None,
            Some("guest-abc"),
            serde_json::json!({"product_id": "SKU-001", "quantity": 2}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t
        .app
        .oneshot(request("GET", "/cart", None, Some("guest-abc")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["lines"][0]["product_id"], "SKU-001");
    assert_eq!(json["lines"][0]["quantity"], 2);
    assert_eq!(json["subtotal"], "80");
    assert_eq!(json["savings"], "20");
}

#[tokio::test]
async fn test_add_line_unknown_product_is_404() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/cart/lines",
            None,
            Some("guest-abc"),
            serde_json::json!({"product_id": "SKU-404", "quantity": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_line_beyond_stock_is_409() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/cart/lines",
            None,
            Some("guest-abc"),
            serde_json::json!({"product_id": "SKU-001", "quantity": 11}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let json = body_json(response).await;
    assert_eq!(json["error"], "Only 10 unit(s) of Widget are available");
}

#[tokio::test]
async fn test_checkout_happy_path() {
    let t = setup().await;
    let user = t.user_id.to_string();

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/cart/lines",
            Some(&user),
            None,
            serde_json::json!({"product_id": "SKU-001", "quantity": 2}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/checkout",
            Some(&user),
            None,
            serde_json::json!({
                "address_id": t.address_id.to_string(),
                "payment_method": "card",
                "delivery_option": "normal"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["status"], "pending");
    assert_eq!(json["payment_status"], "pending");
    assert_eq!(json["subtotal"], "80");
    assert_eq!(json["shipping_fee"], "120");
    assert_eq!(json["grand_total"], "200");
    assert!(json["order_number"].as_str().unwrap().starts_with("ORD-"));

    // Stock committed and cart emptied.
    assert_eq!(
        t.store.product_stock(&ProductId::new("SKU-001")).await,
        Some(8)
    );
    let response = t
        .app
        .oneshot(request("GET", "/cart", Some(&user), None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["lines"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_checkout_with_empty_cart_is_400() {
    let t = setup().await;
    let user = t.user_id.to_string();

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/checkout",
            Some(&user),
            None,
            serde_json::json!({
                "address_id": t.address_id.to_string(),
                "payment_method": "card",
                "delivery_option": "normal"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_checkout_requires_authentication() {
    let t = setup().await;

    let response = t
        .app
        .oneshot(json_request(
            "POST",
            "/checkout",
            None,
            Some("guest-abc"),
            serde_json::json!({
                "address_id": t.address_id.to_string(),
                "payment_method": "card",
                "delivery_option": "normal"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_merge_guest_cart_after_login() {
    let t = setup().await;
    let user = t.user_id.to_string();

    t.app
        .clone()
        .oneshot(json_request(
            "POST",
            "/cart/lines",
            None,
            Some("guest-abc"),
            serde_json::json!({"product_id": "SKU-001", "quantity": 3}),
        ))
        .await
        .unwrap();

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/cart/merge",
            Some(&user),
            None,
            serde_json::json!({"guest_token": "guest-abc"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["lines"][0]["quantity"], 3);

    // The retired token resolves to a fresh empty cart.
    let response = t
        .app
        .oneshot(request("GET", "/cart", None, Some("guest-abc")))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["lines"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_cancel_order_restocks() {
    let t = setup().await;
    let user = t.user_id.to_string();

    t.app
        .clone()
        .oneshot(json_request(
            "POST",
            "/cart/lines",
            Some(&user),
            None,
            serde_json::json!({"product_id": "SKU-001", "quantity": 2}),
        ))
        .await
        .unwrap();

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/checkout",
            Some(&user),
            None,
            serde_json::json!({
                "address_id": t.address_id.to_string(),
                "payment_method": "card",
                "delivery_option": "normal"
            }),
        ))
        .await
        .unwrap();
    let order = body_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/orders/{order_id}/cancel"),
            Some(&user),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "cancelled");
    assert_eq!(
        t.store.product_stock(&ProductId::new("SKU-001")).await,
        Some(10)
    );

    // Cancelling again is an invalid state transition.
    let response = t
        .app
        .oneshot(request(
            "POST",
            &format!("/orders/{order_id}/cancel"),
            Some(&user),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_payment_flow_via_webhook() {
    let t = setup().await;
    let user = t.user_id.to_string();

    t.app
        .clone()
        .oneshot(json_request(
            "POST",
            "/cart/lines",
            Some(&user),
            None,
            serde_json::json!({"product_id": "SKU-001", "quantity": 1}),
        ))
        .await
        .unwrap();

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/checkout",
            Some(&user),
            None,
            serde_json::json!({
                "address_id": t.address_id.to_string(),
                "payment_method": "card",
                "delivery_option": "express"
            }),
        ))
        .await
        .unwrap();
    let order = body_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();
    assert_eq!(order["shipping_fee"], "180");

    // Start a payment session.
    let response = t
        .app
        .clone()
        .oneshot(request(
            "POST",
            &format!("/orders/{order_id}/pay"),
            Some(&user),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let session = body_json(response).await;
    assert!(session["redirect_url"].as_str().unwrap().contains("session"));

    // The gateway reports success through the webhook relay.
    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/webhooks/payment",
            None,
            None,
            serde_json::json!({
                "order_id": order_id,
                "outcome": "paid",
                "reference": "ch_123"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["payment_status"], "paid");
    assert_eq!(json["status"], "confirmed");

    // The order reflects the payment.
    let response = t
        .app
        .oneshot(request(
            "GET",
            &format!("/orders/{order_id}"),
            Some(&user),
            None,
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["payment_status"], "paid");
}

#[tokio::test]
async fn test_admin_advance_status() {
    let t = setup().await;
    let user = t.user_id.to_string();

    t.app
        .clone()
        .oneshot(json_request(
            "POST",
            "/cart/lines",
            Some(&user),
            None,
            serde_json::json!({"product_id": "SKU-001", "quantity": 1}),
        ))
        .await
        .unwrap();

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            "/checkout",
            Some(&user),
            None,
            serde_json::json!({
                "address_id": t.address_id.to_string(),
                "payment_method": "card",
                "delivery_option": "normal"
            }),
        ))
        .await
        .unwrap();
    let order = body_json(response).await;
    let order_id = order["id"].as_str().unwrap().to_string();

    let response = t
        .app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/status"),
            None,
            None,
            serde_json::json!({"status": "shipped"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "shipped");

    // Backward transitions are rejected.
    let response = t
        .app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/status"),
            None,
            None,
            serde_json::json!({"status": "confirmed"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_orders_list_is_user_scoped() {
    let t = setup().await;
    let user = t.user_id.to_string();

    t.app
        .clone()
        .oneshot(json_request(
            "POST",
            "/cart/lines",
            Some(&user),
            None,
            serde_json::json!({"product_id": "SKU-001", "quantity": 1}),
        ))
        .await
        .unwrap();
    t.app
        .clone()
        .oneshot(json_request(
            "POST",
            "/checkout",
            Some(&user),
            None,
            serde_json::json!({
                "address_id": t.address_id.to_string(),
                "payment_method": "card",
                "delivery_option": "normal"
            }),
        ))
        .await
        .unwrap();

    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/orders", Some(&user), None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);

    let stranger = UserId::new().to_string();
    let response = t
        .app
        .oneshot(request("GET", "/orders", Some(&stranger), None))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 0);
}
