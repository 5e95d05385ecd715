//! Router-level checks that are decided before any database access.

mod common;

use axum::{body::Body, http::{Request, StatusCode}};
use serde_json::json;
use storefront_api::{clients::signature, routes::build_app};
use uuid::Uuid;

use common::{
    KEY_SECRET, WEBHOOK_SECRET, empty_request, json_request, multipart_body, multipart_request,
    offline_state, send, token,
};

#[tokio::test]
async fn protected_routes_require_a_session() {
    let state = offline_state();

    for (method, uri) in [
        ("GET", "/api/auth/me"),
        ("GET", "/api/transactions"),
        ("GET", "/api/payments/cards"),
        ("GET", "/api/admin/transactions"),
    ] {
        let (status, body) = send(build_app(state.clone()), empty_request(method, uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["message"], "Please login to continue.");
    }

    let (status, _) = send(
        build_app(state.clone()),
        empty_request("GET", "/api/auth/me", Some("not-a-jwt")),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customers_cannot_manage_products() {
    let state = offline_state();
    let customer = token(&state, "user");

    let body = multipart_body(&[("title", "Mug")], &[]);
    let (status, body) = send(
        build_app(state.clone()),
        multipart_request("POST", "/api/products", &customer, body),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["data"]["redirect"], true);

    let (status, _) = send(
        build_app(state.clone()),
        empty_request(
            "DELETE",
            &format!("/api/products/{}", Uuid::new_v4()),
            Some(&customer),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        build_app(state),
        json_request(
            "PATCH",
            &format!("/api/admin/transactions/{}/status", Uuid::new_v4()),
            Some(&customer),
            json!({ "order_status": "DELIVERED" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn incomplete_product_form_lists_field_errors() {
    let state = offline_state();
    let admin = token(&state, "admin");

    let body = multipart_body(
        &[("title", "Mug"), ("price", "12.345"), ("categories", "[oops")],
        &[],
    );
    let (status, body) = send(
        build_app(state),
        multipart_request("POST", "/api/products", &admin, body),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid input provided.");
    let keys: Vec<&str> = body["data"]["errors"]
        .as_array()
        .expect("errors")
        .iter()
        .filter_map(|err| err["key"].as_str())
        .collect();
    for key in ["description", "price", "quantity", "categories", "image"] {
        assert!(keys.contains(&key), "missing {key} in {keys:?}");
    }
    assert!(!keys.contains(&"title"));
}

#[tokio::test]
async fn image_delete_needs_a_product_id() {
    let state = offline_state();
    let admin = token(&state, "admin");

    let (status, body) = send(
        build_app(state),
        empty_request("DELETE", "/api/products/images/file_1", Some(&admin)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide product id.");
}

#[tokio::test]
async fn malformed_listing_parameters_are_rejected() {
    let (status, body) = send(
        build_app(offline_state()),
        empty_request("GET", "/api/products?take=many", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["errors"][0]["key"], "take");
}

#[tokio::test]
async fn empty_cart_short_circuits_checkout() {
    let state = offline_state();
    let customer = token(&state, "user");

    let (status, body) = send(
        build_app(state.clone()),
        json_request("POST", "/api/checkout", Some(&customer), json!({ "cart": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Cart is empty.");
    assert!(body["data"].is_null());

    let mut lines = serde_json::Map::new();
    lines.insert(Uuid::new_v4().to_string(), json!({ "quantity": 0 }));
    let cart = json!({ "cart": lines });
    let (status, _) = send(
        build_app(state),
        json_request("POST", "/api/checkout", Some(&customer), cart),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_signature_is_verified() {
    let state = offline_state();
    let customer = token(&state, "user");
    let good = signature::sign(KEY_SECRET, b"order_1|pay_1");

    let (status, body) = send(
        build_app(state.clone()),
        json_request(
            "POST",
            "/api/payments/verify",
            Some(&customer),
            json!({
                "razorpay_order_id": "order_1",
                "razorpay_payment_id": "pay_1",
                "razorpay_signature": good,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["valid"], true);

    let (_, body) = send(
        build_app(state),
        json_request(
            "POST",
            "/api/payments/verify",
            Some(&customer),
            json!({ "order_id": "order_1", "payment_id": "pay_2", "signature": good }),
        ),
    )
    .await;
    assert_eq!(body["data"]["valid"], false);
}

#[tokio::test]
async fn payment_ids_must_be_plain_gateway_tokens() {
    let state = offline_state();
    let customer = token(&state, "user");

    let mut details = serde_json::Map::new();
    details.insert(Uuid::new_v4().to_string(), json!({ "quantity": 1 }));
    let (status, body) = send(
        build_app(state),
        json_request(
            "POST",
            "/api/payments/success",
            Some(&customer),
            json!({ "transaction_id": "../orders/order_abc", "details": details }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["errors"][0]["key"], "transaction_id");
    assert_eq!(body["data"]["errors"][0]["message"], "Invalid transaction id.");
}

fn webhook_request(body: &str, signature: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/payments/webhook")
        .header("content-type", "application/json")
        .header("x-razorpay-signature", signature)
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn webhook_rejects_forged_signatures() {
    let payload = json!({ "event": "payment.captured", "payload": {} }).to_string();
    let forged = signature::sign("someone-else", payload.as_bytes());

    let (status, body) = send(build_app(offline_state()), webhook_request(&payload, &forged)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid webhook signature.");
}

#[tokio::test]
async fn webhook_acknowledges_unrelated_events() {
    let payload = json!({ "event": "order.paid", "payload": {} }).to_string();
    let signed = signature::sign(WEBHOOK_SECRET, payload.as_bytes());

    let (status, body) = send(build_app(offline_state()), webhook_request(&payload, &signed)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["handled"], false);
}

#[tokio::test]
async fn logout_expires_the_cookie() {
    let response = tower::ServiceExt::oneshot(
        build_app(offline_state()),
        empty_request("POST", "/api/auth/logout", None),
    )
    .await
    .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(cookie.starts_with("token=;"));
    assert!(cookie.contains("Max-Age=0"));
}
