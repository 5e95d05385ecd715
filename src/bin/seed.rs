use serde_json::json;
use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let pool = orm.get_postgres_connection_pool();

    let admin_id = ensure_user(pool, "admin@example.com", "admin12345", true).await?;
    let user_id = ensure_user(pool, "user@example.com", "user12345", false).await?;

    let clothing = ensure_category(pool, "Clothing", None).await?;
    let hoodies = ensure_category(pool, "Hoodies", Some(clothing)).await?;
    let kitchen = ensure_category(pool, "Kitchen", None).await?;
    seed_products(pool, [clothing, hoodies], [kitchen]).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    is_admin: bool,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, fullname, is_admin)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET is_admin = EXCLUDED.is_admin
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(if is_admin { "Store Admin" } else { "Sample Customer" })
    .bind(is_admin)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (admin={is_admin})");
    Ok(user_id)
}

async fn ensure_category(
    pool: &sqlx::PgPool,
    name: &str,
    parent_id: Option<Uuid>,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO categories (id, name, parent_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO UPDATE SET parent_id = EXCLUDED.parent_id
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(parent_id)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

async fn seed_products(
    pool: &sqlx::PgPool,
    apparel: [Uuid; 2],
    kitchen: [Uuid; 1],
) -> anyhow::Result<()> {
    let products = [
        ("Ferris Hoodie", "Warm hoodie for Rustaceans", 249900_i64, 15, 50, true, &apparel[..]),
        ("Borrow Checker Tee", "Soft cotton tee", 79900, 0, 120, false, &apparel[..1]),
        ("Ferris Mug", "Coffee tastes better with Ferris", 49900, 10, 100, true, &kitchen[..]),
        ("Async Tea Infuser", "Steeps while you await", 29900, 0, 75, false, &kitchen[..]),
    ];

    for (title, description, price, discount, quantity, featured, categories) in products {
        let slug = title.to_lowercase().replace(' ', "-");
        let images = json!([{
            "file_id": format!("seed-{slug}"),
            "name": format!("{slug}.jpg"),
            "url": format!("https://ik.imagekit.io/demo/products/{slug}.jpg"),
            "thumbnail_url": null,
        }]);
        let sizes = json!(["S", "M", "L"]);

        let inserted: Option<(Uuid,)> = sqlx::query_as(
            r#"
            INSERT INTO products (id, title, description, price, discount, quantity, images, sizes, is_featured)
            SELECT $1, $2, $3, $4, $5, $6, $7::jsonb, $8::jsonb, $9
            WHERE NOT EXISTS (SELECT 1 FROM products WHERE title = $2)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(description)
        .bind(price)
        .bind(discount)
        .bind(quantity)
        .bind(images.to_string())
        .bind(sizes.to_string())
        .bind(featured)
        .fetch_optional(pool)
        .await?;

        let Some((product_id,)) = inserted else {
            continue;
        };

        for category_id in categories {
            sqlx::query(
                "INSERT INTO product_categories (product_id, category_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(product_id)
            .bind(category_id)
            .execute(pool)
            .await?;
        }
    }

    println!("Seeded products");
    Ok(())
}
