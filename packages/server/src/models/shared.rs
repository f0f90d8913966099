use sea_orm::Order;
use serde::Serialize;

use crate::error::AppError;

/// Upper bound for `per_page` on every list endpoint.
pub const MAX_PER_PAGE: u64 = 100;

/// Pagination metadata included in list responses.
#[derive(Debug, Serialize, PartialEq, Eq, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 20)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 3)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }

    /// Number of rows to skip for this page.
    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.per_page
    }
}

/// Normalise raw `page` / `per_page` query values: page is at least 1 and
/// per_page is clamped to `1..=MAX_PER_PAGE`.
pub fn page_params(
    page: Option<u64>,
    per_page: Option<u64>,
    default_per_page: u64,
) -> (u64, u64) {
    let page = Ord::max(page.unwrap_or(1), 1);
    let per_page = per_page.unwrap_or(default_per_page).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

/// Parse `asc` / `desc`, falling back to `default` when absent.
pub fn parse_sort_order(raw: Option<&str>, default: Order) -> Result<Order, AppError> {
    match raw {
        None => Ok(default),
        Some("asc") => Ok(Order::Asc),
        Some("desc") => Ok(Order::Desc),
        Some(_) => Err(AppError::Validation(
            "sort_order must be one of: asc, desc".into(),
        )),
    }
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Public URL of a stored image.
pub fn image_url(hash: &str) -> String {
    format!("/api/v1/images/{hash}")
}
