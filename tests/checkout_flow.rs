mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::json;
use storefront_api::{
    clients::signature,
    db::{create_orm_conn, run_migrations},
    entity::{
        json::{AddressList, StringList},
        products::Entity as Products,
        transactions::{Column as TxCol, Entity as Transactions},
        users::ActiveModel as UserActive,
    },
    routes::build_app,
    services::auth_service::hash_password,
    state::AppState,
};
use uuid::Uuid;

use common::{
    WEBHOOK_SECRET, empty_request, json_request, multipart_body, multipart_request, send,
    state_with, token_for,
};

/// Connects to the test database, or returns `None` so the caller can skip.
async fn connect() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(None);
        }
    };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;
    Ok(Some(state_with(orm)))
}

// Full flow: register -> admin creates catalog -> checkout -> payment recorded -> admin
// updates status and refunds.
#[tokio::test]
async fn register_checkout_pay_and_refund_flow() -> anyhow::Result<()> {
    let Some(state) = connect().await? else {
        return Ok(());
    };
    let app = || build_app(state.clone());
    let run = Uuid::new_v4().simple().to_string();

    // Customer signs up through the API.
    let (status, body) = send(
        app(),
        json_request(
            "POST",
            "/api/auth/register",
            None,
            json!({
                "email": format!("shopper-{run}@example.com"),
                "password": "correct horse",
                "fullname": "Test Shopper",
                "joining_reasons": ["gifts"],
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["data"]["user"].get("password_hash").is_none());
    let customer = body["data"]["token"].as_str().expect("token").to_string();

    let admin = create_user(&state, &run, true).await?;

    // Catalog setup.
    let (status, body) = send(
        app(),
        json_request(
            "POST",
            "/api/categories",
            Some(&admin),
            json!({ "name": format!("Mugs {run}") }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let category_id = body["data"]["id"].as_str().expect("category id").to_string();

    let categories = format!("[\"{category_id}\"]");
    let form = multipart_body(
        &[
            ("title", "Ferris Mug"),
            ("description", "Holds 350ml"),
            ("price", "499.50"),
            ("quantity", "5"),
            ("categories", &categories),
            ("sizes", "[\"M\"]"),
        ],
        &[("image", "mug.png", &b"\x89PNG fake"[..])],
    );
    let (status, body) = send(app(), multipart_request("POST", "/api/products", &admin, form)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let product_id = body["data"]["id"].as_str().expect("product id").to_string();
    assert_eq!(body["data"]["price"], 49950);
    assert_eq!(body["data"]["categories"][0]["id"], category_id.as_str());

    let (status, body) = send(
        app(),
        empty_request(
            "GET",
            &format!("/api/products?category_id={category_id}&select=title"),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["count"], 1);
    assert_eq!(body["data"][0]["title"], "Ferris Mug");
    assert!(body["data"][0].get("price").is_none());

    // Checkout for two mugs.
    let mut lines = serde_json::Map::new();
    lines.insert(product_id.clone(), json!({ "quantity": 2 }));
    let cart = serde_json::Value::Object(lines);

    let (status, body) = send(
        app(),
        json_request("POST", "/api/checkout", Some(&customer), json!({ "cart": cart })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["cart_total"], 99_900);
    assert_eq!(body["data"]["key_id"], "rzp_test_key");

    // Asking for more than is in stock fails up front.
    let mut greedy = serde_json::Map::new();
    greedy.insert(product_id.clone(), json!({ "quantity": 6 }));
    let (status, _) = send(
        app(),
        json_request("POST", "/api/checkout", Some(&customer), json!({ "cart": greedy })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Payment recorded once; stock drops by two.
    let payment_id = format!("pay_{run}");
    let success = json!({
        "transactionId": payment_id,
        "details": cart,
        "address": { "city": "Pune" },
    });
    let (status, body) = send(
        app(),
        json_request("POST", "/api/payments/success", Some(&customer), success.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["status"], "SUCCESS");
    assert_eq!(body["data"]["order_status"], "INPROCESS");
    let transaction_id = body["data"]["id"].as_str().expect("transaction id").to_string();

    let stored = Products::find_by_id(Uuid::parse_str(&product_id)?)
        .one(&state.orm)
        .await?
        .expect("product");
    assert_eq!(stored.quantity, 3);

    let (status, _) = send(
        app(),
        json_request("POST", "/api/payments/success", Some(&customer), success),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(app(), empty_request("GET", "/api/payments/cards", Some(&customer))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["last4"], "4242");

    let (status, body) = send(app(), empty_request("GET", "/api/transactions", Some(&customer))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);

    // Admin side.
    let (status, body) = send(
        app(),
        json_request(
            "PATCH",
            &format!("/api/admin/transactions/{transaction_id}/status"),
            Some(&admin),
            json!({ "order_status": "DELIVERED" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["order_status"], "DELIVERED");

    let (status, body) = send(
        app(),
        json_request(
            "POST",
            &format!("/api/admin/transactions/{transaction_id}/refund"),
            Some(&admin),
            json!({ "amount": "100.00" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["amount"], 10_000);
    assert_eq!(body["data"]["transaction"]["order_status"], "DELIVERED");

    let (status, body) = send(
        app(),
        empty_request(
            "POST",
            &format!("/api/admin/transactions/{transaction_id}/refund"),
            Some(&admin),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["transaction"]["order_status"], "CANCELLED");

    Ok(())
}

async fn create_user(state: &AppState, run: &str, is_admin: bool) -> anyhow::Result<String> {
    let role = if is_admin { "admin" } else { "user" };
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{role}-{run}@example.com")),
        password_hash: Set(hash_password("admin12345")?),
        fullname: Set(Some(role.into())),
        profile: Set(None),
        profile_image_id: Set(None),
        bio: Set(None),
        joining_reasons: Set(StringList::default()),
        addresses: Set(AddressList::default()),
        is_admin: Set(is_admin),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(token_for(state, user.id, role))
}

async fn create_category(state: &AppState, admin: &str, name: String) -> String {
    let (status, body) = send(
        build_app(state.clone()),
        json_request("POST", "/api/categories", Some(admin), json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().expect("category id").to_string()
}

fn cart_of(product_id: &str, quantity: i32) -> serde_json::Value {
    let mut lines = serde_json::Map::new();
    lines.insert(product_id.to_string(), json!({ "quantity": quantity }));
    serde_json::Value::Object(lines)
}

// Catalog maintenance, then the payment edge cases: a webhook flipping a stored
// status and a sold-out purchase leaving nothing behind.
#[tokio::test]
async fn product_edits_webhooks_and_sold_out_payments() -> anyhow::Result<()> {
    let Some(state) = connect().await? else {
        return Ok(());
    };
    let app = || build_app(state.clone());
    let run = Uuid::new_v4().simple().to_string();

    let admin = create_user(&state, &run, true).await?;
    let customer = create_user(&state, &run, false).await?;
    let shirts = create_category(&state, &admin, format!("Shirts {run}")).await;
    let sale = create_category(&state, &admin, format!("Sale {run}")).await;

    let categories = format!("[\"{shirts}\"]");
    let form = multipart_body(
        &[
            ("title", "Oxford shirt"),
            ("description", "Cotton"),
            ("price", "1299"),
            ("quantity", "1"),
            ("categories", &categories),
            ("sizes", "[\"S\", \"M\"]"),
            ("slideColors", r#"[{"name":"white"},{"name":"blue"}]"#),
        ],
        &[
            ("image", "front.png", &b"\x89PNG front"[..]),
            ("image", "back.png", &b"\x89PNG back"[..]),
        ],
    );
    let (status, body) = send(app(), multipart_request("POST", "/api/products", &admin, form)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let product_id = body["data"]["id"].as_str().expect("product id").to_string();

    // Partial edit: a repeated size still counts as a change, categories are
    // replaced and the new image is appended.
    let replaced = format!("[\"{sale}\"]");
    let form = multipart_body(
        &[
            ("title", "Oxford shirt"),
            ("sizes", "[\"S\", \"S\"]"),
            ("categories", &replaced),
        ],
        &[("image", "detail.png", &b"\x89PNG detail"[..])],
    );
    let (status, body) = send(
        app(),
        multipart_request("PATCH", &format!("/api/products/{product_id}"), &admin, form),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Product updated successfully.");
    assert_eq!(body["data"]["sizes"], json!(["S"]));
    assert_eq!(body["data"]["categories"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["data"]["categories"][0]["id"], sale.as_str());
    let images = body["data"]["images"].as_array().expect("images").clone();
    assert_eq!(images.len(), 3);
    assert_eq!(images[2]["name"], "detail.png");

    let form = multipart_body(&[("title", "Oxford shirt"), ("sizes", "[\"S\"]")], &[]);
    let (status, body) = send(
        app(),
        multipart_request("PATCH", &format!("/api/products/{product_id}"), &admin, form),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["message"], "Nothing to update.");

    // Deleting the first image drops the first swatch with it.
    let front = images[0]["file_id"].as_str().expect("file id").to_string();
    let (status, body) = send(
        app(),
        json_request(
            "DELETE",
            &format!("/api/products/images/{front}"),
            Some(&admin),
            json!({ "product_id": product_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["images"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["data"]["slide_colors"], json!([{ "name": "blue" }]));

    let (status, _) = send(
        app(),
        json_request(
            "DELETE",
            "/api/products/images/not-a-real-file",
            Some(&admin),
            json!({ "product_id": product_id }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The only unit in stock is bought.
    let paid = format!("pay_{run}a");
    let (status, body) = send(
        app(),
        json_request(
            "POST",
            "/api/payments/success",
            Some(&customer),
            json!({ "transaction_id": paid, "details": cart_of(&product_id, 1) }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let transaction_id = body["data"]["id"].as_str().expect("transaction id").to_string();

    // The gateway later reports the payment as failed.
    let event = json!({
        "event": "payment.failed",
        "payload": { "payment": { "entity": { "id": paid, "status": "failed" } } },
    })
    .to_string();
    let webhook = Request::builder()
        .method("POST")
        .uri("/api/payments/webhook")
        .header("content-type", "application/json")
        .header(
            "x-razorpay-signature",
            signature::sign(WEBHOOK_SECRET, event.as_bytes()),
        )
        .body(Body::from(event))
        .expect("request");
    let (status, body) = send(app(), webhook).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["handled"], true);

    let (status, body) = send(
        app(),
        empty_request(
            "GET",
            &format!("/api/transactions/{transaction_id}"),
            Some(&customer),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "FAILED");

    // Stock is gone: the second purchase is refused and nothing is recorded.
    let late = format!("pay_{run}b");
    let (status, _) = send(
        app(),
        json_request(
            "POST",
            "/api/payments/success",
            Some(&customer),
            json!({ "transaction_id": late, "details": cart_of(&product_id, 1) }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let recorded = Transactions::find()
        .filter(TxCol::TransactionId.eq(late.as_str()))
        .count(&state.orm)
        .await?;
    assert_eq!(recorded, 0);

    let stored = Products::find_by_id(Uuid::parse_str(&product_id)?)
        .one(&state.orm)
        .await?
        .expect("product");
    assert_eq!(stored.quantity, 0);

    Ok(())
}
