use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub use super::shared::Pagination;

pub const MAX_COMMENT_LENGTH: usize = 1000;

/// Create-or-update body: a second submission for the same restaurant
/// replaces the caller's existing review.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmitReviewRequest {
    #[schema(example = 12)]
    pub restaurant_id: i32,
    /// Integer 1-5.
    #[schema(example = 5)]
    pub rating: i32,
    /// Optional, at most 1000 characters after trimming.
    #[schema(example = "Najlepsze pierogi w mieście")]
    pub comment: Option<String>,
}

/// Validate a submission and return the normalised comment.
pub fn validate_submit_review(req: &SubmitReviewRequest) -> Result<String, AppError> {
    if !(1..=5).contains(&req.rating) {
        return Err(AppError::Validation(
            "Rating must be an integer between 1 and 5".into(),
        ));
    }
    let comment = req.comment.as_deref().unwrap_or("").trim();
    if comment.chars().count() > MAX_COMMENT_LENGTH {
        return Err(AppError::Validation(format!(
            "Comment must be at most {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(comment.to_string())
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReviewAuthor {
    pub id: i32,
    pub username: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReviewResponse {
    pub id: i32,
    pub user: ReviewAuthor,
    pub restaurant_id: i32,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewResponse {
    pub fn new(m: crate::entity::review::Model, username: String) -> Self {
        Self {
            id: m.id,
            user: ReviewAuthor {
                id: m.user_id,
                username,
            },
            restaurant_id: m.restaurant_id,
            rating: m.rating,
            comment: m.comment,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RestaurantSummary {
    pub id: i32,
    pub name: String,
    pub image_url: Option<String>,
}

/// One of the caller's reviews, with enough of the restaurant to link to it.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MyReviewItem {
    pub id: i32,
    pub restaurant: RestaurantSummary,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewListQuery {
    pub page: Option<u64>,
    /// Items per page, 1-100 (default 10).
    pub per_page: Option<u64>,
    /// One of `created_at` (default), `rating`, `updated_at`.
    pub sort_by: Option<String>,
    /// `asc` or `desc` (default).
    pub sort_order: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReviewSearchQuery {
    /// Full-text query matched against review comments.
    #[param(example = "pierogi")]
    pub query: Option<String>,
    pub page: Option<u64>,
    /// Items per page, 1-100 (default 10).
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReviewListResponse {
    pub data: Vec<ReviewResponse>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MyReviewListResponse {
    pub data: Vec<MyReviewItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct ReviewSearchItem {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub restaurant_id: i32,
    pub restaurant_name: String,
    pub rating: i32,
    pub comment: String,
    /// `ts_rank` relevance; higher is better.
    pub score: f32,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ReviewSearchResponse {
    pub data: Vec<ReviewSearchItem>,
    pub pagination: Pagination,
}
