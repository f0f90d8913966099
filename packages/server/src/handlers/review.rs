use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{restaurant, review};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::models::review::*;
use crate::models::shared::{image_url, page_params, parse_sort_order};
use crate::services::lookup::review_responses;
use crate::services::review::ReviewService;
use crate::state::AppState;

use super::restaurant::find_restaurant;

const DEFAULT_REVIEWS_PER_PAGE: u64 = 10;

#[utoipa::path(
    post,
    path = "/",
    tag = "Reviews",
    operation_id = "submitReview",
    summary = "Create or update the caller's review of a restaurant",
    description = "Each user has at most one review per restaurant. The first submission creates it (201); later submissions overwrite rating and comment in place (200). The restaurant's average rating and review count are recomputed in the same transaction.",
    request_body = SubmitReviewRequest,
    responses(
        (status = 201, description = "Review created", body = ReviewResponse),
        (status = 200, description = "Existing review updated", body = ReviewResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Restaurant not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(
    skip(state, auth_user, payload),
    fields(user_id = auth_user.user_id, restaurant_id = payload.restaurant_id)
)]
pub async fn submit_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SubmitReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = validate_submit_review(&payload)?;

    let txn = state.db.begin().await?;
    let outcome = ReviewService::new(&txn)
        .submit(
            auth_user.user_id,
            payload.restaurant_id,
            payload.rating,
            comment,
        )
        .await?;
    txn.commit().await?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((
        status,
        Json(ReviewResponse::new(outcome.review, auth_user.username)),
    ))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Reviews",
    operation_id = "deleteReview",
    summary = "Delete a review",
    description = "Deletes a review by ID. Only its author may delete it. The restaurant's rating summary is recomputed.",
    params(("id" = i32, Path, description = "Review ID")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the author (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Review not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn delete_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    ReviewService::new(&txn)
        .delete(id, auth_user.user_id)
        .await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/mine",
    tag = "Reviews",
    operation_id = "listMyReviews",
    summary = "List the caller's reviews",
    description = "Reviews written by the caller, newest first, with the reviewed restaurant's name and image.",
    params(ReviewListQuery),
    responses(
        (status = 200, description = "Caller's reviews", body = MyReviewListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_my_reviews(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ReviewListQuery>,
) -> Result<Json<MyReviewListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page, DEFAULT_REVIEWS_PER_PAGE);
    let (sort_column, sort_order) = review_sort(&query)?;

    let select = review::Entity::find().filter(review::Column::UserId.eq(auth_user.user_id));

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let pagination = Pagination::new(page, per_page, total);

    let rows = select
        .find_also_related(restaurant::Entity)
        .order_by(sort_column, sort_order)
        .order_by_desc(review::Column::Id)
        .offset(Some(pagination.offset()))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let data = rows
        .into_iter()
        .filter_map(|(r, restaurant)| {
            let restaurant = restaurant?;
            Some(MyReviewItem {
                id: r.id,
                restaurant: RestaurantSummary {
                    id: restaurant.id,
                    name: restaurant.name,
                    image_url: restaurant.image_hash.as_deref().map(image_url),
                },
                rating: r.rating,
                comment: r.comment,
                created_at: r.created_at,
                updated_at: r.updated_at,
            })
        })
        .collect();

    Ok(Json(MyReviewListResponse { data, pagination }))
}

#[utoipa::path(
    get,
    path = "/search",
    tag = "Reviews",
    operation_id = "searchReviews",
    summary = "Full-text search over review comments",
    description = "Matches the query against non-empty review comments using PostgreSQL full-text search and returns results by relevance (`score`, highest first).",
    params(ReviewSearchQuery),
    responses(
        (status = 200, description = "Matching reviews", body = ReviewSearchResponse),
        (status = 400, description = "Missing or blank query (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query))]
pub async fn search_reviews(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ReviewSearchQuery>,
) -> Result<Json<ReviewSearchResponse>, AppError> {
    let text = query.query.as_deref().map(str::trim).unwrap_or("");
    if text.is_empty() {
        return Err(AppError::Validation("query must not be empty".into()));
    }
    let (page, per_page) = page_params(query.page, query.per_page, DEFAULT_REVIEWS_PER_PAGE);

    // Expression must match idx_review_comment_fts to use the index.
    const MATCH_SQL: &str = "r.comment <> '' \
        AND to_tsvector('simple', r.comment) @@ plainto_tsquery('simple', $1)";

    let backend = state.db.get_database_backend();

    let count_sql = format!("SELECT COUNT(*) AS total FROM review r WHERE {MATCH_SQL}");
    let total = state
        .db
        .query_one_raw(Statement::from_sql_and_values(
            backend,
            count_sql,
            [text.into()],
        ))
        .await?
        .map(|row| row.try_get::<i64>("", "total"))
        .transpose()?
        .unwrap_or(0);
    let pagination = Pagination::new(page, per_page, u64::try_from(total).unwrap_or(0));

    let page_sql = format!(
        "SELECT r.id, r.user_id, u.username, r.restaurant_id, s.name AS restaurant_name, \
         r.rating, r.comment, r.created_at, \
         ts_rank(to_tsvector('simple', r.comment), plainto_tsquery('simple', $1)) AS score \
         FROM review r \
         JOIN \"user\" u ON u.id = r.user_id \
         JOIN restaurant s ON s.id = r.restaurant_id \
         WHERE {MATCH_SQL} \
         ORDER BY score DESC, r.id DESC \
         LIMIT $2 OFFSET $3"
    );
    let data = ReviewSearchItem::find_by_statement(Statement::from_sql_and_values(
        backend,
        page_sql,
        [
            text.into(),
            (per_page as i64).into(),
            (pagination.offset() as i64).into(),
        ],
    ))
    .all(&state.db)
    .await?;

    Ok(Json(ReviewSearchResponse { data, pagination }))
}

#[utoipa::path(
    get,
    path = "/{id}/reviews",
    tag = "Reviews",
    operation_id = "listRestaurantReviews",
    summary = "List reviews of a restaurant",
    description = "Paginated reviews of one restaurant. Sorting by `created_at` (default, desc), `rating`, or `updated_at`.",
    params(("id" = i32, Path, description = "Restaurant ID"), ReviewListQuery),
    responses(
        (status = 200, description = "Reviews", body = ReviewListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Restaurant not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query), fields(id))]
pub async fn list_restaurant_reviews(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppQuery(query): AppQuery<ReviewListQuery>,
) -> Result<Json<ReviewListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page, DEFAULT_REVIEWS_PER_PAGE);
    let (sort_column, sort_order) = review_sort(&query)?;

    find_restaurant(&state.db, id).await?;

    let select = review::Entity::find().filter(review::Column::RestaurantId.eq(id));
    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let pagination = Pagination::new(page, per_page, total);

    let models = select
        .order_by(sort_column, sort_order)
        .order_by_desc(review::Column::Id)
        .offset(Some(pagination.offset()))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    Ok(Json(ReviewListResponse {
        data: review_responses(&state.db, models).await?,
        pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}/reviews/mine",
    tag = "Reviews",
    operation_id = "getMyRestaurantReview",
    summary = "Get the caller's review of a restaurant",
    params(("id" = i32, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Caller's review", body = ReviewResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No review by the caller (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn get_my_restaurant_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ReviewResponse>, AppError> {
    let model = review::Entity::find()
        .filter(review::Column::RestaurantId.eq(id))
        .filter(review::Column::UserId.eq(auth_user.user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Review not found".into()))?;

    Ok(Json(ReviewResponse::new(model, auth_user.username)))
}

#[utoipa::path(
    delete,
    path = "/{id}/reviews/mine",
    tag = "Reviews",
    operation_id = "deleteMyRestaurantReview",
    summary = "Delete the caller's review of a restaurant",
    params(("id" = i32, Path, description = "Restaurant ID")),
    responses(
        (status = 204, description = "Review deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No review by the caller (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn delete_my_restaurant_review(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    ReviewService::new(&txn)
        .delete_mine(auth_user.user_id, id)
        .await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

fn review_sort(query: &ReviewListQuery) -> Result<(review::Column, Order), AppError> {
    let column = match query.sort_by.as_deref().unwrap_or("created_at") {
        "created_at" => review::Column::CreatedAt,
        "updated_at" => review::Column::UpdatedAt,
        "rating" => review::Column::Rating,
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: created_at, rating, updated_at".into(),
            ));
        }
    };
    let order = parse_sort_order(query.sort_order.as_deref(), Order::Desc)?;
    Ok((column, order))
}
