use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr, Query as SeaQuery, SimpleExpr};
use sea_orm::*;
use tracing::instrument;

use crate::entity::{restaurant, restaurant_cuisine, review};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AuthUser, MaybeAuthUser};
use crate::extractors::json::AppJson;
use crate::extractors::query::AppQuery;
use crate::models::cuisine::parse_cuisine_filter;
use crate::models::restaurant::*;
use crate::models::shared::{escape_like, page_params, parse_sort_order};
use crate::services::lookup::{restaurant_response, restaurant_responses, review_responses};
use crate::services::restaurant::{RestaurantService, lock_image_hash, release_image};
use crate::state::AppState;
use crate::utils::geo::{DEFAULT_RADIUS_M, DISTANCE_SQL, distance_m, validate_coordinates};

/// Reviews shown on the restaurant detail page.
const DETAIL_REVIEWS_PER_PAGE: u64 = 10;

/// Multipart overhead allowed on top of the image size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn image_upload_body_limit(max_image_size: u64) -> DefaultBodyLimit {
    let limit = usize::try_from(max_image_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);
    DefaultBodyLimit::max(limit)
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Restaurants",
    operation_id = "createRestaurant",
    summary = "Create a restaurant",
    description = "Creates a restaurant owned by the caller. The rating summary starts at 0 with no reviews. `address.country` defaults to \"Polska\".",
    request_body = CreateRestaurantRequest,
    responses(
        (status = 201, description = "Restaurant created", body = RestaurantResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, name = %payload.name))]
pub async fn create_restaurant(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateRestaurantRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_restaurant(&payload)?;

    let txn = state.db.begin().await?;
    let model = RestaurantService::new(&txn)
        .create(auth_user.user_id, payload)
        .await?;
    let response = restaurant_response(&txn, model).await?;
    txn.commit().await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Restaurants",
    operation_id = "listRestaurants",
    summary = "List restaurants with filters",
    description = "Returns a paginated list of restaurants. Filters combine: case-insensitive name search, any-of cuisine tags, and proximity (`lat` + `lng`, optional `radius` in metres, default 10000). With a proximity filter each item carries `distance_m`. Sorting by `name`, `average_rating`, `total_reviews`, `created_at` or `distance` (only with a point). The default is `name`, or `distance` when a point is given; order defaults to asc.",
    params(RestaurantListQuery),
    responses(
        (status = 200, description = "List of restaurants", body = RestaurantListResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_restaurants(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<RestaurantListQuery>,
) -> Result<Json<RestaurantListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page, 20);

    let mut select = restaurant::Entity::find();

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(restaurant::Column::Name)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    if let Some(ref raw) = query.cuisine {
        let cuisines = parse_cuisine_filter(raw)?;
        if !cuisines.is_empty() {
            let tags: Vec<&str> = cuisines.iter().map(|c| c.as_str()).collect();
            select = select.filter(
                restaurant::Column::Id.in_subquery(
                    SeaQuery::select()
                        .column(restaurant_cuisine::Column::RestaurantId)
                        .from(restaurant_cuisine::Entity)
                        .and_where(restaurant_cuisine::Column::Cuisine.is_in(tags))
                        .to_owned(),
                ),
            );
        }
    }

    let origin = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => {
            validate_coordinates(lat, lng)?;
            Some((lat, lng))
        }
        (None, None) => None,
        _ => {
            return Err(AppError::Validation(
                "lat and lng must be provided together".into(),
            ));
        }
    };

    if let Some((lat, lng)) = origin {
        let radius = query.radius.unwrap_or(DEFAULT_RADIUS_M);
        if !radius.is_finite() || radius <= 0.0 {
            return Err(AppError::Validation(
                "radius must be a positive number of metres".into(),
            ));
        }
        select = select.filter(Expr::cust_with_values(
            format!("{DISTANCE_SQL} <= $3"),
            [lat, lng, radius],
        ));
    }

    // With a point and no explicit key, nearest first.
    let default_sort = if origin.is_some() { "distance" } else { "name" };
    let sort_key: SimpleExpr = match query.sort_by.as_deref().unwrap_or(default_sort) {
        "name" => Expr::col(restaurant::Column::Name).into(),
        "average_rating" => Expr::col(restaurant::Column::AverageRating).into(),
        "total_reviews" => Expr::col(restaurant::Column::TotalReviews).into(),
        "created_at" => Expr::col(restaurant::Column::CreatedAt).into(),
        "distance" => match origin {
            Some((lat, lng)) => Expr::cust_with_values(DISTANCE_SQL, [lat, lng]).into(),
            None => {
                return Err(AppError::Validation(
                    "sort_by=distance requires lat and lng".into(),
                ));
            }
        },
        _ => {
            return Err(AppError::Validation(
                "sort_by must be one of: name, average_rating, total_reviews, created_at, distance"
                    .into(),
            ));
        }
    };
    let sort_order = parse_sort_order(query.sort_order.as_deref(), Order::Asc)?;

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let pagination = Pagination::new(page, per_page, total);

    let models = select
        .order_by(sort_key, sort_order)
        .order_by_asc(restaurant::Column::Id)
        .offset(Some(pagination.offset()))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    let mut data = restaurant_responses(&state.db, models).await?;
    if let Some((lat, lng)) = origin {
        for item in &mut data {
            item.distance_m = Some(distance_m(
                lat,
                lng,
                item.location.latitude,
                item.location.longitude,
            ));
        }
    }

    Ok(Json(RestaurantListResponse { data, pagination }))
}

#[utoipa::path(
    get,
    path = "/mine",
    tag = "Restaurants",
    operation_id = "listMyRestaurants",
    summary = "List the caller's restaurants",
    description = "Restaurants owned by the caller, newest first.",
    params(MyRestaurantsQuery),
    responses(
        (status = 200, description = "Caller's restaurants", body = RestaurantListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_my_restaurants(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<MyRestaurantsQuery>,
) -> Result<Json<RestaurantListResponse>, AppError> {
    let (page, per_page) = page_params(query.page, query.per_page, 20);

    let select = restaurant::Entity::find()
        .filter(restaurant::Column::OwnerId.eq(auth_user.user_id));

    let total = select
        .clone()
        .paginate(&state.db, per_page)
        .num_items()
        .await?;
    let pagination = Pagination::new(page, per_page, total);

    let models = select
        .order_by_desc(restaurant::Column::CreatedAt)
        .order_by_desc(restaurant::Column::Id)
        .offset(Some(pagination.offset()))
        .limit(Some(per_page))
        .all(&state.db)
        .await?;

    Ok(Json(RestaurantListResponse {
        data: restaurant_responses(&state.db, models).await?,
        pagination,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Restaurants",
    operation_id = "getRestaurant",
    summary = "Get a restaurant with its first page of reviews",
    description = "Returns the restaurant, the newest reviews, and, when the request is authenticated, the caller's own review. Authentication is optional.",
    params(("id" = i32, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Restaurant details", body = RestaurantDetailResponse),
        (status = 404, description = "Restaurant not found (NOT_FOUND)", body = ErrorBody),
    ),
    security((), ("jwt" = [])),
)]
#[instrument(skip(state, viewer), fields(id))]
pub async fn get_restaurant(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<RestaurantDetailResponse>, AppError> {
    let model = find_restaurant(&state.db, id).await?;

    let reviews_select = review::Entity::find().filter(review::Column::RestaurantId.eq(id));
    let total = reviews_select
        .clone()
        .paginate(&state.db, DETAIL_REVIEWS_PER_PAGE)
        .num_items()
        .await?;
    let reviews = reviews_select
        .order_by_desc(review::Column::CreatedAt)
        .order_by_desc(review::Column::Id)
        .limit(Some(DETAIL_REVIEWS_PER_PAGE))
        .all(&state.db)
        .await?;

    let user_review = match viewer {
        Some(user) => {
            review::Entity::find()
                .filter(review::Column::RestaurantId.eq(id))
                .filter(review::Column::UserId.eq(user.user_id))
                .one(&state.db)
                .await?
        }
        None => None,
    };
    let user_review = match user_review {
        Some(m) => review_responses(&state.db, vec![m]).await?.pop(),
        None => None,
    };

    Ok(Json(RestaurantDetailResponse {
        restaurant: restaurant_response(&state.db, model).await?,
        reviews: review_responses(&state.db, reviews).await?,
        pagination: Pagination::new(1, DETAIL_REVIEWS_PER_PAGE, total),
        user_review,
    }))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Restaurants",
    operation_id = "updateRestaurant",
    summary = "Update a restaurant",
    description = "Partially updates a restaurant using PATCH semantics. Only the owner may update. `cuisines` and `address` are replaced as a whole when present. The rating summary cannot be set.",
    params(("id" = i32, Path, description = "Restaurant ID")),
    request_body = UpdateRestaurantRequest,
    responses(
        (status = 200, description = "Restaurant updated", body = RestaurantResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Restaurant not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(id, user_id = auth_user.user_id))]
pub async fn update_restaurant(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateRestaurantRequest>,
) -> Result<Json<RestaurantResponse>, AppError> {
    validate_update_restaurant(&payload)?;

    let txn = state.db.begin().await?;
    let model = RestaurantService::new(&txn)
        .update(id, auth_user.user_id, payload)
        .await?;
    let response = restaurant_response(&txn, model).await?;
    txn.commit().await?;

    Ok(Json(response))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Restaurants",
    operation_id = "deleteRestaurant",
    summary = "Delete a restaurant",
    description = "Deletes the restaurant together with all its reviews. Only the owner may delete. The image is removed afterwards if no other restaurant uses it.",
    params(("id" = i32, Path, description = "Restaurant ID")),
    responses(
        (status = 204, description = "Restaurant deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Restaurant not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id, user_id = auth_user.user_id))]
pub async fn delete_restaurant(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let image_hash = RestaurantService::new(&txn)
        .delete(id, auth_user.user_id)
        .await?;
    txn.commit().await?;

    if let Some(hash) = image_hash {
        release_image(&state.db, state.images.as_ref(), &hash).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/{id}/image",
    tag = "Restaurants",
    operation_id = "uploadRestaurantImage",
    summary = "Upload or replace a restaurant image",
    description = "Stores the `file` multipart field as the restaurant's image. Accepts JPEG, PNG, GIF and WebP (detected from content), up to `storage.max_image_size` bytes. Only the owner may upload. The previous image is removed if no other restaurant uses it.",
    params(("id" = i32, Path, description = "Restaurant ID")),
    request_body(content_type = "multipart/form-data", description = "Image upload in the `file` field"),
    responses(
        (status = 200, description = "Image stored", body = ImageUploadResponse),
        (status = 400, description = "Missing, oversized or unsupported file (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Not the owner (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Restaurant not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(id, user_id = auth_user.user_id))]
pub async fn upload_restaurant_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<ImageUploadResponse>, AppError> {
    // Reject non-owners before anything is written to the store.
    let existing = find_restaurant(&state.db, id).await?;
    auth_user.require_self(existing.owner_id)?;

    let max_size = state.config.storage.max_image_size;
    let mut data: Option<Vec<u8>> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let mut buf = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
        {
            if (buf.len() + chunk.len()) as u64 > max_size {
                return Err(AppError::Validation(format!(
                    "Image must be at most {max_size} bytes"
                )));
            }
            buf.extend_from_slice(&chunk);
        }
        data = Some(buf);
    }

    let data = data.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded file is empty".into()));
    }

    let stored = state.images.put_image(&data).await?;
    let content_type = stored.format.mime_type();

    let hex = stored.hash.to_hex();
    let result = async {
        let txn = state.db.begin().await?;
        // A concurrent release may have removed a deduplicated blob between
        // put_image and here; under the hash lock it cannot happen again.
        lock_image_hash(&txn, &hex).await?;
        if !state.images.exists(&stored.hash).await? {
            state.images.put_image(&data).await?;
        }
        let previous = RestaurantService::new(&txn)
            .set_image(id, auth_user.user_id, &stored.hash, content_type)
            .await?;
        txn.commit().await?;
        Ok::<_, AppError>(previous)
    }
    .await;

    let previous = match result {
        Ok(previous) => previous,
        Err(e) => {
            release_image(&state.db, state.images.as_ref(), &hex).await;
            return Err(e);
        }
    };

    if let Some(old) = previous {
        release_image(&state.db, state.images.as_ref(), &old).await;
    }

    tracing::info!(hash = %stored.hash, size = stored.size, "Restaurant image stored");

    Ok(Json(ImageUploadResponse {
        image_url: crate::models::shared::image_url(&hex),
        content_type: content_type.to_string(),
        size: stored.size,
    }))
}

pub(crate) async fn find_restaurant<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<restaurant::Model, AppError> {
    restaurant::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Restaurant not found".into()))
}
