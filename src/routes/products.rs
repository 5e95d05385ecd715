use axum::{
    Json, Router,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    routing::{delete, get},
};
use uuid::Uuid;

use crate::{
    dto::products::{DeleteImageRequest, DeletedProduct, ProductFormSchema, ProductList, ProductRows},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Product,
    response::ApiResponse,
    routes::{json_or_default, params::ProductListQuery},
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/images/{image_id}", delete(delete_product_image))
        .route(
            "/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("take" = Option<u64>, Query, description = "Page size, default 10, at most 100"),
        ("skip" = Option<u64>, Query, description = "Rows to skip, default 0"),
        ("search" = Option<String>, Query, description = "Case-insensitive title search"),
        ("category" = Option<Vec<Uuid>>, Query, description = "Repeatable; matches any"),
        ("category_id" = Option<Uuid>, Query, description = "Category plus its direct children"),
        ("category_ids" = Option<String>, Query, description = "Comma separated ids; matches any"),
        ("is_featured" = Option<bool>, Query, description = "Only featured products"),
        ("is_hot_deals" = Option<bool>, Query, description = "Discounted products, biggest discount first"),
        ("select" = Option<String>, Query, description = "Comma separated fields to return")
    ),
    responses(
        (status = 200, description = "List products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Json<ApiResponse<ProductRows>>> {
    let query = ProductListQuery::from_pairs(pairs)?;
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok());
    let base_url = product_service::base_url(state.config.public_base_url.as_deref(), host);
    let resp = product_service::list_products(&state, query, &base_url).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body(content = ProductFormSchema, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid input"),
        (status = 502, description = "Image upload failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let resp = product_service::create_product(&state, &user, multipart).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body(content = ProductFormSchema, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &user, id, multipart).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/images/{image_id}",
    params(
        ("image_id" = String, Path, description = "CDN file id")
    ),
    request_body = DeleteImageRequest,
    responses(
        (status = 200, description = "Image removed", body = ApiResponse<Product>),
        (status = 400, description = "Missing product id or last image"),
        (status = 404, description = "Product or image not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product_image(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    user: AuthUser,
    body: Bytes,
) -> AppResult<Json<ApiResponse<Product>>> {
    let payload: DeleteImageRequest = json_or_default(&body)?;
    let resp = product_service::delete_product_image(&state, &user, image_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Deleted product", body = ApiResponse<DeletedProduct>),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DeletedProduct>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}
