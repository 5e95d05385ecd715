use std::collections::HashSet;

use axum::extract::Multipart;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    clients::UploadFile,
    entity::products::Model as ProductModel,
    error::{AppError, AppResult},
    models::{Product, SlideColor, Specification},
    validation::{
        MAX_PRODUCT_IMAGES, MAX_TEXT_LEN, MAX_TITLE_LEN, MAX_UPLOADS_PER_REQUEST, Violations,
        parse_amount, parse_bool, parse_integer, price_message,
    },
};

/// Raw admin product form as posted by the catalog UI: scalar fields as
/// text, list fields JSON-encoded, photos as `image` file parts.
#[derive(Debug, Default)]
pub struct ProductForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub quantity: Option<String>,
    pub discount: Option<String>,
    pub categories: Option<String>,
    pub sizes: Option<String>,
    pub key_features: Option<String>,
    pub specifications: Option<String>,
    pub care_instructions: Option<String>,
    pub slide_colors: Option<String>,
    pub variants: Option<String>,
    pub is_featured: Option<String>,
    pub images: Vec<UploadFile>,
}

/// Documentation shape of the multipart body.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ProductFormSchema {
    title: Option<String>,
    description: Option<String>,
    /// Decimal, at most two fractional digits.
    price: Option<String>,
    quantity: Option<String>,
    /// Percent, 0 to 100.
    discount: Option<String>,
    /// JSON array of category ids.
    categories: Option<String>,
    /// JSON array of strings.
    sizes: Option<String>,
    /// JSON array of strings.
    key_features: Option<String>,
    /// JSON array of `{label, value}`.
    specifications: Option<String>,
    care_instructions: Option<String>,
    /// JSON array of objects, one per image.
    slide_colors: Option<String>,
    /// Arbitrary JSON.
    variants: Option<String>,
    is_featured: Option<String>,
    #[schema(value_type = Vec<String>, format = Binary)]
    image: Vec<Vec<u8>>,
}

impl ProductForm {
    /// Assigns a text field. The camelCase names of the storefront UI are
    /// accepted next to the snake_case ones.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "title" => &mut self.title,
            "description" => &mut self.description,
            "price" => &mut self.price,
            "quantity" => &mut self.quantity,
            "discount" => &mut self.discount,
            "categories" => &mut self.categories,
            "sizes" => &mut self.sizes,
            "key_features" | "keyFeatures" => &mut self.key_features,
            "specifications" => &mut self.specifications,
            "care_instructions" | "careInstructions" => &mut self.care_instructions,
            "slide_colors" | "slideColors" => &mut self.slide_colors,
            "variants" => &mut self.variants,
            "is_featured" | "isFeatured" => &mut self.is_featured,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    pub async fn from_multipart(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = ProductForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| AppError::bad_request(format!("Invalid multipart body: {err}")))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "image" || name == "images" {
                let file_name = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .unwrap_or("image")
                    .to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(|err| {
                    AppError::bad_request(format!("Invalid multipart body: {err}"))
                })?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    form.images.push(UploadFile {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|err| AppError::bad_request(format!("Invalid multipart body: {err}")))?;
            if !form.set_field(&name, value) {
                tracing::debug!(field = %name, "ignoring unknown product form field");
            }
        }

        Ok(form)
    }

    /// Parses and validates the form.
    ///
    /// `existing` is the stored product for a partial update, `None` when
    /// creating; required fields are only enforced on creation.
    pub fn into_input(
        self,
        existing: Option<&ProductModel>,
    ) -> AppResult<(ProductInput, Vec<UploadFile>)> {
        let creating = existing.is_none();
        let mut violations = Violations::new();
        let mut input = ProductInput::default();

        match non_blank(self.title) {
            Some(title) if title.chars().count() > MAX_TITLE_LEN => violations.add(
                "title",
                format!("Title must be at most {MAX_TITLE_LEN} characters."),
            ),
            Some(title) => input.title = Some(title),
            None if creating => violations.add("title", "Please enter product title."),
            None => {}
        }

        match self.description.map(|d| d.trim().to_string()) {
            Some(description) if description.chars().count() > MAX_TEXT_LEN => violations.add(
                "description",
                format!("Description must be at most {MAX_TEXT_LEN} characters."),
            ),
            Some(description) if description.is_empty() && creating => {
                violations.add("description", "Please enter product description.")
            }
            Some(description) if description.is_empty() => {}
            Some(description) => input.description = Some(description),
            None if creating => {
                violations.add("description", "Please enter product description.")
            }
            None => {}
        }

        match non_blank(self.price) {
            Some(raw) => match parse_amount(&raw) {
                Ok(0) => violations.add("price", "Price must be greater than zero."),
                Ok(price) => input.price = Some(price),
                Err(err) => violations.add("price", price_message(&err)),
            },
            None if creating => violations.add("price", "Please enter price."),
            None => {}
        }

        match non_blank(self.quantity) {
            Some(raw) => match parse_integer(&raw).and_then(|q| i32::try_from(q).ok()) {
                Some(q) if q < 0 => violations.add("quantity", "Quantity cannot be negative."),
                Some(0) if creating => {
                    violations.add("quantity", "Quantity must be greater than zero.")
                }
                Some(q) => input.quantity = Some(q),
                None => violations.add("quantity", "Please enter valid integer."),
            },
            None if creating => violations.add("quantity", "Please enter quantity."),
            None => {}
        }

        if let Some(raw) = non_blank(self.discount) {
            match parse_integer(&raw).and_then(|d| i32::try_from(d).ok()) {
                Some(d) if (0..=100).contains(&d) => input.discount = Some(d),
                _ => violations.add("discount", "Please enter valid discount."),
            }
        }

        match parse_json_field::<Vec<Uuid>>(self.categories, "categories", &mut violations) {
            Some(ids) if ids.is_empty() => {
                violations.add("categories", "Please select atleast one category.")
            }
            Some(ids) => input.category_ids = Some(dedup(ids)),
            None if creating && !violations.has("categories") => {
                violations.add("categories", "Please select atleast one category.")
            }
            None => {}
        }

        input.sizes = parse_json_field::<Vec<String>>(self.sizes, "sizes", &mut violations)
            .map(clean_strings);
        input.key_features =
            parse_json_field::<Vec<String>>(self.key_features, "key_features", &mut violations)
                .map(clean_strings);

        if let Some(specs) = parse_json_field::<Vec<Specification>>(
            self.specifications,
            "specifications",
            &mut violations,
        ) {
            if specs
                .iter()
                .any(|s| s.label.trim().is_empty() || s.value.trim().is_empty())
            {
                violations.add(
                    "specifications",
                    "Every specification needs a label and a value.",
                );
            } else {
                input.specifications = Some(specs);
            }
        }

        if let Some(care) = self.care_instructions {
            let care = care.trim().to_string();
            if care.chars().count() > MAX_TEXT_LEN {
                violations.add(
                    "care_instructions",
                    format!("Care instructions must be at most {MAX_TEXT_LEN} characters."),
                );
            } else {
                input.care_instructions = Some(care);
            }
        }

        input.slide_colors =
            parse_json_field::<Vec<SlideColor>>(self.slide_colors, "slide_colors", &mut violations);
        input.variants = parse_json_field::<Value>(self.variants, "variants", &mut violations)
            .filter(|value| !value.is_null());

        if let Some(raw) = self.is_featured {
            match parse_bool(&raw) {
                Some(flag) => input.is_featured = Some(flag),
                None => violations.add("is_featured", "Please enter true or false."),
            }
        }

        let images = self.images;
        if creating && images.is_empty() {
            violations.add("image", "Please upload atleast one image.");
        }
        if images.len() > MAX_UPLOADS_PER_REQUEST {
            violations.add(
                "image",
                format!("At most {MAX_UPLOADS_PER_REQUEST} images can be uploaded at once."),
            );
        }
        let stored = existing.map(|p| p.images.0.len()).unwrap_or(0);
        if stored + images.len() > MAX_PRODUCT_IMAGES {
            violations.add(
                "image",
                format!("A product can have at most {MAX_PRODUCT_IMAGES} images."),
            );
        }
        if images.iter().any(|file| {
            file.content_type
                .as_deref()
                .is_some_and(|ct| !ct.starts_with("image/"))
        }) {
            violations.add("image", "Only image files can be uploaded.");
        }

        violations.into_result()?;
        Ok((input, images))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Decodes a JSON-encoded form field; blank values count as absent.
fn parse_json_field<T: DeserializeOwned>(
    raw: Option<String>,
    key: &str,
    violations: &mut Violations,
) -> Option<T> {
    let raw = non_blank(raw)?;
    match serde_json::from_str::<T>(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(field = key, error = %err, "malformed JSON form field");
            violations.add(key, format!("Invalid format for {key}."));
            None
        }
    }
}

/// Trims entries, drops blanks and keeps the first of any repeats.
fn clean_strings(values: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Validated product fields; `None` means "not submitted".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub quantity: Option<i32>,
    pub discount: Option<i32>,
    pub category_ids: Option<Vec<Uuid>>,
    pub sizes: Option<Vec<String>>,
    pub key_features: Option<Vec<String>>,
    pub specifications: Option<Vec<Specification>>,
    pub care_instructions: Option<String>,
    pub slide_colors: Option<Vec<SlideColor>>,
    pub variants: Option<Value>,
    pub is_featured: Option<bool>,
}

/// The subset of a submitted update that actually differs from the stored
/// product.
pub type ProductChanges = ProductInput;

impl ProductInput {
    /// Drops every submitted value that equals what is stored. Category,
    /// size and feature lists compare as sets; specifications and slide
    /// colours compare in order.
    pub fn changes_against(self, existing: &ProductModel, category_ids: &[Uuid]) -> ProductChanges {
        ProductChanges {
            title: self.title.filter(|v| *v != existing.title),
            description: self.description.filter(|v| *v != existing.description),
            price: self.price.filter(|v| *v != existing.price),
            quantity: self.quantity.filter(|v| *v != existing.quantity),
            discount: self.discount.filter(|v| *v != existing.discount),
            category_ids: self
                .category_ids
                .filter(|ids| !same_set(ids, category_ids)),
            sizes: self.sizes.filter(|v| !same_set(v, &existing.sizes.0)),
            key_features: self
                .key_features
                .filter(|v| !same_set(v, &existing.key_features.0)),
            specifications: self
                .specifications
                .filter(|v| *v != existing.specifications.0),
            care_instructions: self
                .care_instructions
                .filter(|v| *v != existing.care_instructions),
            slide_colors: self
                .slide_colors
                .filter(|v| *v != existing.slide_colors.0),
            variants: self
                .variants
                .filter(|v| existing.variants.as_ref() != Some(v)),
            is_featured: self.is_featured.filter(|v| *v != existing.is_featured),
        }
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        let flags = [
            ("title", self.title.is_some()),
            ("description", self.description.is_some()),
            ("price", self.price.is_some()),
            ("quantity", self.quantity.is_some()),
            ("discount", self.discount.is_some()),
            ("categories", self.category_ids.is_some()),
            ("sizes", self.sizes.is_some()),
            ("key_features", self.key_features.is_some()),
            ("specifications", self.specifications.is_some()),
            ("care_instructions", self.care_instructions.is_some()),
            ("slide_colors", self.slide_colors.is_some()),
            ("variants", self.variants.is_some()),
            ("is_featured", self.is_featured.is_some()),
        ];
        flags
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.changed_fields().is_empty()
    }
}

fn same_set<T: Eq + std::hash::Hash>(left: &[T], right: &[T]) -> bool {
    left.iter().collect::<HashSet<_>>() == right.iter().collect::<HashSet<_>>()
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DeleteImageRequest {
    #[serde(alias = "productId")]
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedProduct {
    pub id: Uuid,
}

/// Listing payload: whole products, or the fields picked with `select`.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProductRows {
    Full(Vec<Product>),
    Projected(Vec<Map<String, Value>>),
}

/// Keeps only the requested top-level fields (plus `id`). `category` is an
/// alias for the `{id, name}` category list.
pub fn project_products(products: Vec<Product>, fields: &[String]) -> AppResult<ProductRows> {
    if fields.is_empty() {
        return Ok(ProductRows::Full(products));
    }

    let wanted: HashSet<&str> = fields
        .iter()
        .map(|f| match f.as_str() {
            "category" => "categories",
            "categoryIds" => "category_ids",
            "keyFeatures" => "key_features",
            "slideColors" => "slide_colors",
            "isFeatured" => "is_featured",
            other => other,
        })
        .chain(std::iter::once("id"))
        .collect();

    let rows = products
        .into_iter()
        .map(|product| match serde_json::to_value(product) {
            Ok(Value::Object(map)) => Ok(map
                .into_iter()
                .filter(|(key, _)| wanted.contains(key.as_str()))
                .collect()),
            Ok(_) => Ok(Map::new()),
            Err(err) => Err(AppError::Internal(err.into())),
        })
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ProductRows::Projected(rows))
}
