use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::PaymentStatus,
    validation::{Violations, parse_bool},
};

#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

pub const MAX_PAGE: i64 = 1_000_000;

impl Pagination {
    /// `(page, per_page, offset)` with page in `1..=MAX_PAGE` and per_page in
    /// `1..=100`, so the offset always fits.
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<PaymentStatus>,
}

impl TransactionListQuery {
    // Kept flat: `serde(flatten)` would hand the numbers over as strings.
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

pub const DEFAULT_TAKE: u64 = 10;
pub const MAX_TAKE: u64 = 100;
/// Far beyond any catalog; keeps `skip` inside `i64` for the meta block.
pub const MAX_SKIP: u64 = 1_000_000_000;

/// Product listing filters.
///
/// `category` may repeat, so the query string is read as raw pairs rather
/// than through a flat struct.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductListQuery {
    pub take: u64,
    pub skip: u64,
    pub search: Option<String>,
    pub categories: Vec<Uuid>,
    pub category_id: Option<Uuid>,
    pub category_ids: Vec<Uuid>,
    pub is_featured: bool,
    pub is_hot_deals: bool,
    pub select: Vec<String>,
}

impl Default for ProductListQuery {
    fn default() -> Self {
        Self {
            take: DEFAULT_TAKE,
            skip: 0,
            search: None,
            categories: Vec::new(),
            category_id: None,
            category_ids: Vec::new(),
            is_featured: false,
            is_hot_deals: false,
            select: Vec::new(),
        }
    }
}

impl ProductListQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> AppResult<Self> {
        let mut query = ProductListQuery::default();
        let mut violations = Violations::new();

        for (key, value) in pairs {
            let value = value.trim();
            match key.as_str() {
                "take" => match value.parse::<u64>() {
                    Ok(take) => query.take = take.clamp(1, MAX_TAKE),
                    Err(_) => violations.add("take", "Please enter valid integer."),
                },
                "skip" => match value.parse::<u64>() {
                    Ok(skip) => query.skip = skip.min(MAX_SKIP),
                    Err(_) => violations.add("skip", "Please enter valid integer."),
                },
                "search" => {
                    query.search = Some(value.to_string()).filter(|s| !s.is_empty());
                }
                "category" => match Uuid::parse_str(value) {
                    Ok(id) => query.categories.push(id),
                    Err(_) => violations.add("category", "Please enter valid category id."),
                },
                "category_id" | "categoryId" => match Uuid::parse_str(value) {
                    Ok(id) => query.category_id = Some(id),
                    Err(_) => violations.add("category_id", "Please enter valid category id."),
                },
                "category_ids" | "categoryIds" => {
                    for raw in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                        match Uuid::parse_str(raw) {
                            Ok(id) => query.category_ids.push(id),
                            Err(_) => violations
                                .add("category_ids", "Please enter valid category ids."),
                        }
                    }
                }
                "is_featured" | "isFeatured" => {
                    query.is_featured = parse_bool(value).unwrap_or(false);
                }
                "is_hot_deals" | "isHotDeals" => {
                    query.is_hot_deals = parse_bool(value).unwrap_or(false);
                }
                "select" => query.select.extend(
                    value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                ),
                _ => {}
            }
        }

        violations.into_result()?;
        Ok(query)
    }
}
