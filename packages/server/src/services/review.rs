use chrono::Utc;
use sea_orm::sea_query::{LockType, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set,
    SqlErr,
};

use crate::entity::{restaurant, review};
use crate::error::AppError;
use crate::utils::rating::RatingSummary;

use super::rating::recompute_rating;

/// Result of a create-or-update submission.
#[derive(Debug)]
pub struct SubmitOutcome {
    pub review: review::Model,
    /// `true` when the row was inserted, `false` when an existing review was
    /// overwritten.
    pub created: bool,
    pub summary: RatingSummary,
}

/// Review writes. Every method locks the restaurant row before touching
/// reviews and ends with a rating recompute, so it must run on a
/// transaction that the caller commits.
pub struct ReviewService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> ReviewService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Lock the restaurant row (`SELECT ... FOR UPDATE`).
    pub async fn lock_restaurant(&self, restaurant_id: i32) -> Result<restaurant::Model, AppError> {
        restaurant::Entity::find_by_id(restaurant_id)
            .lock(LockType::Update)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Restaurant not found".into()))
    }

    /// Create the caller's review of a restaurant, or overwrite it if one
    /// already exists.
    ///
    /// The write is a single `INSERT ... ON CONFLICT (user_id, restaurant_id)
    /// DO UPDATE`, so two concurrent first submissions still end with one row.
    pub async fn submit(
        &self,
        user_id: i32,
        restaurant_id: i32,
        rating: i32,
        comment: String,
    ) -> Result<SubmitOutcome, AppError> {
        self.lock_restaurant(restaurant_id).await?;

        // Review writes for this restaurant are serialised by the row lock,
        // so the pair cannot appear between this read and the upsert.
        let existed = review::Entity::find()
            .filter(review::Column::UserId.eq(user_id))
            .filter(review::Column::RestaurantId.eq(restaurant_id))
            .count(self.conn)
            .await?
            > 0;

        let now = Utc::now();
        let new_review = review::ActiveModel {
            user_id: Set(user_id),
            restaurant_id: Set(restaurant_id),
            rating: Set(rating),
            comment: Set(comment),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = review::Entity::insert(new_review)
            .on_conflict(
                OnConflict::columns([review::Column::UserId, review::Column::RestaurantId])
                    .update_columns([
                        review::Column::Rating,
                        review::Column::Comment,
                        review::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_with_returning(self.conn)
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => {
                    AppError::Conflict("Review already exists".into())
                }
                _ => AppError::from(e),
            })?;

        let created = !existed;
        let summary = recompute_rating(self.conn, restaurant_id).await?;

        tracing::info!(
            review_id = model.id,
            restaurant_id,
            user_id,
            created,
            "Review submitted"
        );

        Ok(SubmitOutcome {
            review: model,
            created,
            summary,
        })
    }

    /// Delete a review by id. Only its author may delete it.
    pub async fn delete(&self, review_id: i32, user_id: i32) -> Result<RatingSummary, AppError> {
        let existing = review::Entity::find_by_id(review_id)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".into()))?;

        if existing.user_id != user_id {
            return Err(AppError::PermissionDenied);
        }

        self.remove(existing.id, existing.restaurant_id).await
    }

    /// Delete the caller's review of a restaurant.
    pub async fn delete_mine(
        &self,
        user_id: i32,
        restaurant_id: i32,
    ) -> Result<RatingSummary, AppError> {
        let existing = review::Entity::find()
            .filter(review::Column::UserId.eq(user_id))
            .filter(review::Column::RestaurantId.eq(restaurant_id))
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Review not found".into()))?;

        self.remove(existing.id, restaurant_id).await
    }

    async fn remove(&self, review_id: i32, restaurant_id: i32) -> Result<RatingSummary, AppError> {
        self.lock_restaurant(restaurant_id).await?;

        // A concurrent delete may have won while we waited for the lock.
        let result = review::Entity::delete_by_id(review_id)
            .exec(self.conn)
            .await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Review not found".into()));
        }

        let summary = recompute_rating(self.conn, restaurant_id).await?;
        tracing::info!(review_id, restaurant_id, "Review deleted");
        Ok(summary)
    }
}
