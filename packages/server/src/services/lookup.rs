//! Batched lookups used to decorate list responses without N+1 queries.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

use crate::entity::{restaurant, restaurant_cuisine, review, user};
use crate::error::AppError;
use crate::models::cuisine::CuisineType;
use crate::models::restaurant::RestaurantResponse;
use crate::models::review::ReviewResponse;

pub async fn usernames_by_id<C: ConnectionTrait>(
    conn: &C,
    ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, String>, AppError> {
    let mut ids: Vec<i32> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i32, String)> = user::Entity::find()
        .select_only()
        .column(user::Column::Id)
        .column(user::Column::Username)
        .filter(user::Column::Id.is_in(ids))
        .into_tuple()
        .all(conn)
        .await?;
    Ok(rows.into_iter().collect())
}

/// Cuisine tags per restaurant, in enumeration order.
pub async fn cuisines_by_restaurant<C: ConnectionTrait>(
    conn: &C,
    restaurant_ids: &[i32],
) -> Result<HashMap<i32, Vec<CuisineType>>, AppError> {
    if restaurant_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(i32, String)> = restaurant_cuisine::Entity::find()
        .select_only()
        .column(restaurant_cuisine::Column::RestaurantId)
        .column(restaurant_cuisine::Column::Cuisine)
        .filter(restaurant_cuisine::Column::RestaurantId.is_in(restaurant_ids.to_vec()))
        .into_tuple()
        .all(conn)
        .await?;

    let mut map: HashMap<i32, Vec<CuisineType>> = HashMap::new();
    for (restaurant_id, tag) in rows {
        match tag.parse::<CuisineType>() {
            Ok(cuisine) => map.entry(restaurant_id).or_default().push(cuisine),
            Err(_) => tracing::warn!(restaurant_id, %tag, "Ignoring unknown stored cuisine"),
        }
    }
    for cuisines in map.values_mut() {
        cuisines.sort_unstable();
    }
    Ok(map)
}

pub async fn restaurant_responses<C: ConnectionTrait>(
    conn: &C,
    models: Vec<restaurant::Model>,
) -> Result<Vec<RestaurantResponse>, AppError> {
    let ids: Vec<i32> = models.iter().map(|m| m.id).collect();
    let owners = usernames_by_id(conn, models.iter().map(|m| m.owner_id)).await?;
    let mut cuisines = cuisines_by_restaurant(conn, &ids).await?;

    Ok(models
        .into_iter()
        .map(|m| {
            let owner = owners.get(&m.owner_id).cloned().unwrap_or_default();
            let tags = cuisines.remove(&m.id).unwrap_or_default();
            RestaurantResponse::new(m, owner, tags)
        })
        .collect())
}

pub async fn restaurant_response<C: ConnectionTrait>(
    conn: &C,
    model: restaurant::Model,
) -> Result<RestaurantResponse, AppError> {
    restaurant_responses(conn, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("restaurant response missing".into()))
}

pub async fn review_responses<C: ConnectionTrait>(
    conn: &C,
    models: Vec<review::Model>,
) -> Result<Vec<ReviewResponse>, AppError> {
    let authors = usernames_by_id(conn, models.iter().map(|m| m.user_id)).await?;
    Ok(models
        .into_iter()
        .map(|m| {
            let username = authors.get(&m.user_id).cloned().unwrap_or_default();
            ReviewResponse::new(m, username)
        })
        .collect())
}
