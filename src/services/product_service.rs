use std::collections::HashMap;

use axum::extract::Multipart;
use chrono::Utc;
use futures::future::join_all;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    clients::{ClientError, ImageStore, UploadFile},
    dto::products::{
        DeleteImageRequest, DeletedProduct, ProductForm, ProductInput, ProductRows, project_products,
    },
    entity::{
        categories::{Column as CategoryCol, Entity as Categories},
        json::{ImageList, SlideColorList, SpecificationList, StringList},
        product_categories::{
            ActiveModel as LinkActive, Column as LinkCol, Entity as ProductCategories,
        },
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult, FieldError},
    middleware::auth::{AuthUser, ensure_admin},
    models::{CategoryRef, Product, ProductImage, SlideColor},
    response::{ApiResponse, Meta},
    routes::params::ProductListQuery,
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductListQuery,
    base_url: &str,
) -> AppResult<ApiResponse<ProductRows>> {
    let mut condition = Condition::all();

    if let Some(search) = query.search.as_ref() {
        condition = condition.add(Expr::col(Column::Title).ilike(format!("%{}%", search)));
    }

    if !query.categories.is_empty() {
        condition = condition.add(in_any_category(query.categories.clone()));
    }

    if !query.category_ids.is_empty() {
        condition = condition.add(in_any_category(query.category_ids.clone()));
    }

    if let Some(category_id) = query.category_id {
        let mut family: Vec<Uuid> = Categories::find()
            .select_only()
            .column(CategoryCol::Id)
            .filter(CategoryCol::ParentId.eq(category_id))
            .into_tuple()
            .all(&state.orm)
            .await?;
        family.push(category_id);
        condition = condition.add(in_any_category(family));
    }

    if query.is_featured {
        condition = condition.add(Column::IsFeatured.eq(true));
    }

    let mut finder = Products::find().filter(condition);
    if query.is_hot_deals {
        finder = finder
            .filter(Column::Discount.gt(0))
            .order_by_desc(Column::Discount);
    }
    finder = finder.order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await?;

    let models = finder
        .limit(query.take)
        .offset(query.skip)
        .all(&state.orm)
        .await?;
    let products = with_categories(&state.orm, models).await?;
    let rows = project_products(products, &query.select)?;

    let next = next_link(base_url, query.take, query.skip, total);
    let meta = Meta::window(query.skip as i64, query.take as i64, total as i64, next);
    Ok(ApiResponse::success("Products fetched.", rows, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let model = find_product(state, id).await?;
    let product = load_product(&state.orm, model).await?;
    Ok(ApiResponse::success("Product fetched.", product, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    multipart: Multipart,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let form = ProductForm::from_multipart(multipart).await?;
    let (input, files) = form.into_input(None)?;

    let category_ids = input.category_ids.clone().unwrap_or_default();
    ensure_categories_exist(state, &category_ids).await?;

    let images = upload_images(state.images.as_ref(), files).await?;

    let saved = insert_product(state, input, &category_ids, &images).await;
    let product = match saved {
        Ok(product) => product,
        Err(err) => {
            discard_images(state.images.as_ref(), &images).await;
            return Err(err);
        }
    };

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    let product = load_product(&state.orm, product).await?;
    Ok(ApiResponse::success(
        "Product created successfully.",
        product,
        Some(Meta::empty()),
    ))
}

async fn insert_product(
    state: &AppState,
    input: ProductInput,
    category_ids: &[Uuid],
    images: &[ProductImage],
) -> AppResult<ProductModel> {
    let txn = state.orm.begin().await?;

    let product = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(input.title.unwrap_or_default()),
        description: Set(input.description.unwrap_or_default()),
        price: Set(input.price.unwrap_or_default()),
        discount: Set(input.discount.unwrap_or_default()),
        quantity: Set(input.quantity.unwrap_or_default()),
        images: Set(ImageList(images.to_vec())),
        sizes: Set(StringList(input.sizes.unwrap_or_default())),
        key_features: Set(StringList(input.key_features.unwrap_or_default())),
        specifications: Set(SpecificationList(input.specifications.unwrap_or_default())),
        care_instructions: Set(input.care_instructions.unwrap_or_default()),
        slide_colors: Set(SlideColorList(input.slide_colors.unwrap_or_default())),
        variants: Set(input.variants),
        is_featured: Set(input.is_featured.unwrap_or(false)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    link_categories(&txn, product.id, category_ids).await?;

    txn.commit().await?;
    Ok(product)
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    multipart: Multipart,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let form = ProductForm::from_multipart(multipart).await?;
    let existing = find_product(state, id).await?;

    let current_categories: Vec<Uuid> = ProductCategories::find()
        .select_only()
        .column(LinkCol::CategoryId)
        .filter(LinkCol::ProductId.eq(id))
        .into_tuple()
        .all(&state.orm)
        .await?;

    let (input, files) = form.into_input(Some(&existing))?;
    let changes = input.changes_against(&existing, &current_categories);

    if changes.is_empty() && files.is_empty() {
        let product = load_product(&state.orm, existing).await?;
        return Ok(ApiResponse::success(
            "Nothing to update.",
            product,
            Some(Meta::empty()),
        ));
    }

    if let Some(category_ids) = changes.category_ids.as_ref() {
        ensure_categories_exist(state, category_ids).await?;
    }

    let uploaded = upload_images(state.images.as_ref(), files).await?;

    let mut changed = changes.changed_fields();
    if !uploaded.is_empty() {
        changed.push("images");
    }

    let product = match apply_changes(state, existing, changes, &uploaded).await {
        Ok(product) => product,
        Err(err) => {
            discard_images(state.images.as_ref(), &uploaded).await;
            return Err(err);
        }
    };

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id, "fields": changed }),
    )
    .await;

    let product = load_product(&state.orm, product).await?;
    Ok(ApiResponse::success(
        "Product updated successfully.",
        product,
        Some(Meta::empty()),
    ))
}

async fn apply_changes(
    state: &AppState,
    existing: ProductModel,
    changes: ProductInput,
    uploaded: &[ProductImage],
) -> AppResult<ProductModel> {
    let id = existing.id;
    let mut images = existing.images.0.clone();
    images.extend_from_slice(uploaded);

    let mut active: ActiveModel = existing.into();
    if let Some(title) = changes.title {
        active.title = Set(title);
    }
    if let Some(description) = changes.description {
        active.description = Set(description);
    }
    if let Some(price) = changes.price {
        active.price = Set(price);
    }
    if let Some(quantity) = changes.quantity {
        active.quantity = Set(quantity);
    }
    if let Some(discount) = changes.discount {
        active.discount = Set(discount);
    }
    if let Some(sizes) = changes.sizes {
        active.sizes = Set(StringList(sizes));
    }
    if let Some(key_features) = changes.key_features {
        active.key_features = Set(StringList(key_features));
    }
    if let Some(specifications) = changes.specifications {
        active.specifications = Set(SpecificationList(specifications));
    }
    if let Some(care_instructions) = changes.care_instructions {
        active.care_instructions = Set(care_instructions);
    }
    if let Some(slide_colors) = changes.slide_colors {
        active.slide_colors = Set(SlideColorList(slide_colors));
    }
    if let Some(variants) = changes.variants {
        active.variants = Set(Some(variants));
    }
    if let Some(is_featured) = changes.is_featured {
        active.is_featured = Set(is_featured);
    }
    if !uploaded.is_empty() {
        active.images = Set(ImageList(images));
    }
    active.updated_at = Set(Utc::now().fixed_offset());

    let txn = state.orm.begin().await?;
    let product = active.update(&txn).await?;

    if let Some(category_ids) = changes.category_ids {
        ProductCategories::delete_many()
            .filter(LinkCol::ProductId.eq(id))
            .exec(&txn)
            .await?;
        link_categories(&txn, id, &category_ids).await?;
    }

    txn.commit().await?;
    Ok(product)
}

pub async fn delete_product_image(
    state: &AppState,
    user: &AuthUser,
    image_id: String,
    payload: DeleteImageRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let product_id = payload
        .product_id
        .ok_or_else(|| AppError::bad_request("Please provide product id."))?;
    let existing = find_product(state, product_id).await?;

    let mut images = existing.images.0.clone();
    let mut slide_colors = existing.slide_colors.0.clone();
    let removed = remove_image(&mut images, &mut slide_colors, &image_id)?;

    match state.images.delete(&removed.file_id).await {
        Ok(()) => {}
        Err(ClientError::NotFound { .. }) => {
            tracing::warn!(file_id = %removed.file_id, "image already gone from CDN");
        }
        Err(err) => return Err(AppError::upstream("Image delete failed", err)),
    }

    let mut active: ActiveModel = existing.into();
    active.images = Set(ImageList(images));
    active.slide_colors = Set(SlideColorList(slide_colors));
    active.updated_at = Set(Utc::now().fixed_offset());
    let product = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_image_delete",
        "products",
        serde_json::json!({ "product_id": product.id, "file_id": removed.file_id }),
    )
    .await;

    let product = load_product(&state.orm, product).await?;
    Ok(ApiResponse::success(
        "Image deleted successfully.",
        product,
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<DeletedProduct>> {
    ensure_admin(user)?;
    let existing = find_product(state, id).await?;

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Product not found."));
    }

    discard_images(state.images.as_ref(), &existing.images.0).await;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted successfully.",
        DeletedProduct { id },
        Some(Meta::empty()),
    ))
}

/// Takes `image_id` out of the product's images. The last image can never
/// go; the swatch at the same position goes with it while more than one
/// swatch is left.
fn remove_image(
    images: &mut Vec<ProductImage>,
    slide_colors: &mut Vec<SlideColor>,
    image_id: &str,
) -> AppResult<ProductImage> {
    if images.len() <= 1 {
        return Err(AppError::bad_request(
            "You're not allowed to delete only present image of product.",
        ));
    }
    let index = images
        .iter()
        .position(|image| image.file_id == image_id)
        .ok_or_else(|| AppError::not_found("Image id not found in product."))?;

    if slide_colors.len() > 1 && index < slide_colors.len() {
        slide_colors.remove(index);
    }
    Ok(images.remove(index))
}

/// Scheme and host used for pagination links.
pub fn base_url(public_base_url: Option<&str>, host: Option<&str>) -> String {
    if let Some(url) = public_base_url {
        return url.trim_end_matches('/').to_string();
    }
    let host = host.unwrap_or("localhost");
    let scheme = if is_local_host(host) { "http" } else { "https" };
    format!("{scheme}://{host}")
}

fn is_local_host(host: &str) -> bool {
    if host.starts_with("[::1]") {
        return true;
    }
    let name = host.split(':').next().unwrap_or(host);
    matches!(name, "localhost" | "127.0.0.1" | "0.0.0.0")
}

pub fn next_link(base_url: &str, take: u64, skip: u64, total: u64) -> Option<String> {
    let next_skip = skip.saturating_add(take);
    (next_skip < total).then(|| format!("{base_url}/api/products/?take={take}&skip={next_skip}"))
}

fn in_any_category(category_ids: Vec<Uuid>) -> sea_orm::sea_query::SimpleExpr {
    Column::Id.in_subquery(
        Query::select()
            .column(LinkCol::ProductId)
            .from(ProductCategories)
            .and_where(LinkCol::CategoryId.is_in(category_ids))
            .to_owned(),
    )
}

async fn find_product(state: &AppState, id: Uuid) -> AppResult<ProductModel> {
    Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product not found."))
}

async fn ensure_categories_exist(state: &AppState, category_ids: &[Uuid]) -> AppResult<()> {
    if category_ids.is_empty() {
        return Ok(());
    }
    let found = Categories::find()
        .filter(CategoryCol::Id.is_in(category_ids.to_vec()))
        .count(&state.orm)
        .await?;
    if found as usize != category_ids.len() {
        return Err(AppError::Validation(vec![FieldError::new(
            "categories",
            "Please select valid categories.",
        )]));
    }
    Ok(())
}

async fn link_categories<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    category_ids: &[Uuid],
) -> AppResult<()> {
    if category_ids.is_empty() {
        return Ok(());
    }
    let links = category_ids.iter().map(|category_id| LinkActive {
        product_id: Set(product_id),
        category_id: Set(*category_id),
    });
    ProductCategories::insert_many(links).exec(conn).await?;
    Ok(())
}

/// Uploads every file concurrently. When any upload fails the ones that
/// succeeded are removed again and the request fails with 502.
async fn upload_images(
    store: &dyn ImageStore,
    files: Vec<UploadFile>,
) -> AppResult<Vec<ProductImage>> {
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let results = join_all(files.into_iter().map(|file| store.upload(file))).await;

    let mut uploaded = Vec::with_capacity(results.len());
    let mut failure = None;
    for result in results {
        match result {
            Ok(image) => uploaded.push(image),
            Err(err) => {
                failure.get_or_insert(err);
            }
        }
    }

    if let Some(err) = failure {
        discard_images(store, &uploaded).await;
        return Err(AppError::upstream("Image upload failed", err));
    }
    Ok(uploaded)
}

async fn discard_images(store: &dyn ImageStore, images: &[ProductImage]) {
    let results = join_all(images.iter().map(|image| store.delete(&image.file_id))).await;
    for (image, result) in images.iter().zip(results) {
        if let Err(err) = result {
            tracing::warn!(error = %err, file_id = %image.file_id, "image cleanup failed");
        }
    }
}

async fn category_refs<C: ConnectionTrait>(
    conn: &C,
    product_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, Vec<CategoryRef>>> {
    let mut refs: HashMap<Uuid, Vec<CategoryRef>> = HashMap::new();
    if product_ids.is_empty() {
        return Ok(refs);
    }

    let rows = ProductCategories::find()
        .filter(LinkCol::ProductId.is_in(product_ids))
        .find_also_related(Categories)
        .all(conn)
        .await?;

    for (link, category) in rows {
        if let Some(category) = category {
            refs.entry(link.product_id).or_default().push(CategoryRef {
                id: category.id,
                name: category.name,
            });
        }
    }
    for list in refs.values_mut() {
        list.sort_by(|a, b| a.name.cmp(&b.name));
    }
    Ok(refs)
}

async fn with_categories<C: ConnectionTrait>(
    conn: &C,
    models: Vec<ProductModel>,
) -> AppResult<Vec<Product>> {
    let mut refs = category_refs(conn, models.iter().map(|m| m.id).collect()).await?;
    Ok(models
        .into_iter()
        .map(|model| {
            let categories = refs.remove(&model.id).unwrap_or_default();
            product_from_entity(model, categories)
        })
        .collect())
}

async fn load_product<C: ConnectionTrait>(conn: &C, model: ProductModel) -> AppResult<Product> {
    let mut products = with_categories(conn, vec![model]).await?;
    products
        .pop()
        .ok_or_else(|| AppError::not_found("Product not found."))
}

pub fn product_from_entity(model: ProductModel, categories: Vec<CategoryRef>) -> Product {
    Product {
        id: model.id,
        title: model.title,
        description: model.description,
        price: model.price,
        discount: model.discount,
        quantity: model.quantity,
        images: model.images.0,
        sizes: model.sizes.0,
        key_features: model.key_features.0,
        specifications: model.specifications.0,
        care_instructions: model.care_instructions,
        slide_colors: model.slide_colors.0,
        variants: model.variants,
        is_featured: model.is_featured,
        category_ids: categories.iter().map(|c| c.id).collect(),
        categories,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::http::StatusCode;

    use super::*;
    use crate::clients::ClientResult;

    /// Uploads succeed unless the file is named `broken.jpg`.
    #[derive(Default)]
    struct FlakyStore {
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageStore for FlakyStore {
        async fn upload(&self, file: UploadFile) -> ClientResult<ProductImage> {
            if file.file_name == "broken.jpg" {
                return Err(ClientError::Status {
                    service: "imagekit",
                    status: 500,
                    body: "boom".into(),
                });
            }
            Ok(image(&format!("id-{}", file.file_name)))
        }

        async fn delete(&self, file_id: &str) -> ClientResult<()> {
            self.deleted.lock().expect("lock").push(file_id.to_string());
            Ok(())
        }
    }

    fn upload(name: &str) -> UploadFile {
        UploadFile {
            file_name: name.into(),
            content_type: Some("image/jpeg".into()),
            bytes: vec![0xff, 0xd8],
        }
    }

    fn image(file_id: &str) -> ProductImage {
        ProductImage {
            file_id: file_id.into(),
            name: format!("{file_id}.jpg"),
            url: format!("https://cdn.test/{file_id}.jpg"),
            thumbnail_url: None,
        }
    }

    fn swatch(name: &str) -> SlideColor {
        BTreeMap::from([("name".to_string(), name.to_string())])
    }

    #[tokio::test]
    async fn failed_upload_discards_the_successful_ones() {
        let store = FlakyStore::default();
        let err = upload_images(&store, vec![upload("a.jpg"), upload("broken.jpg"), upload("b.jpg")])
            .await
            .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        let mut deleted = store.deleted.lock().unwrap().clone();
        deleted.sort();
        assert_eq!(deleted, vec!["id-a.jpg", "id-b.jpg"]);
    }

    #[tokio::test]
    async fn successful_uploads_keep_their_order() {
        let store = FlakyStore::default();
        let images = upload_images(&store, vec![upload("a.jpg"), upload("b.jpg")])
            .await
            .unwrap();
        let ids: Vec<_> = images.iter().map(|i| i.file_id.as_str()).collect();
        assert_eq!(ids, vec!["id-a.jpg", "id-b.jpg"]);
        assert!(store.deleted.lock().unwrap().is_empty());
    }

    #[test]
    fn removing_an_image_drops_the_matching_swatch() {
        let mut images = vec![image("one"), image("two"), image("three")];
        let mut swatches = vec![swatch("red"), swatch("green"), swatch("blue")];

        let removed = remove_image(&mut images, &mut swatches, "two").unwrap();
        assert_eq!(removed.file_id, "two");
        assert_eq!(images.len(), 2);
        assert_eq!(swatches, vec![swatch("red"), swatch("blue")]);
    }

    #[test]
    fn a_single_swatch_is_kept() {
        let mut images = vec![image("one"), image("two")];
        let mut swatches = vec![swatch("red")];
        remove_image(&mut images, &mut swatches, "one").unwrap();
        assert_eq!(swatches, vec![swatch("red")]);
    }

    #[test]
    fn last_image_and_unknown_ids_are_refused() {
        let mut images = vec![image("only")];
        let mut swatches = Vec::new();
        let err = remove_image(&mut images, &mut swatches, "only").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(images.len(), 1);

        let mut images = vec![image("one"), image("two")];
        let err = remove_image(&mut images, &mut swatches, "missing").unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(images.len(), 2);
    }

    #[test]
    fn local_hosts_use_plain_http() {
        assert_eq!(base_url(None, Some("localhost:3000")), "http://localhost:3000");
        assert_eq!(base_url(None, Some("127.0.0.1:8080")), "http://127.0.0.1:8080");
        assert_eq!(base_url(None, Some("shop.example.com")), "https://shop.example.com");
        assert_eq!(base_url(None, None), "http://localhost");
    }

    #[test]
    fn configured_base_url_wins() {
        assert_eq!(
            base_url(Some("https://api.example.com/"), Some("localhost:3000")),
            "https://api.example.com"
        );
    }

    #[test]
    fn next_link_stops_when_exhausted() {
        assert_eq!(
            next_link("http://localhost:3000", 10, 0, 25).as_deref(),
            Some("http://localhost:3000/api/products/?take=10&skip=10")
        );
        assert_eq!(
            next_link("http://localhost:3000", 10, 10, 25).as_deref(),
            Some("http://localhost:3000/api/products/?take=10&skip=20")
        );
        assert_eq!(next_link("http://localhost:3000", 10, 20, 25), None);
        assert_eq!(next_link("http://localhost:3000", 10, 0, 10), None);
    }
}
