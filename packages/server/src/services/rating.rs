use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

use crate::entity::{restaurant, review};
use crate::error::AppError;
use crate::utils::rating::RatingSummary;

/// Recompute a restaurant's rating summary from its current reviews and
/// persist it.
///
/// Always derived from the full review set, so running it twice is the same
/// as running it once. Callers run it inside the transaction that changed
/// the reviews, holding the restaurant row lock.
pub async fn recompute_rating<C: ConnectionTrait>(
    conn: &C,
    restaurant_id: i32,
) -> Result<RatingSummary, AppError> {
    let (count, sum): (i64, Option<i64>) = review::Entity::find()
        .filter(review::Column::RestaurantId.eq(restaurant_id))
        .select_only()
        .column_as(review::Column::Id.count(), "review_count")
        .column_as(review::Column::Rating.sum(), "rating_sum")
        .into_tuple()
        .one(conn)
        .await?
        .unwrap_or((0, None));

    let summary = RatingSummary::from_totals(sum.unwrap_or(0), count);

    let result = restaurant::Entity::update_many()
        .col_expr(
            restaurant::Column::AverageRating,
            Expr::value(summary.average_rating),
        )
        .col_expr(
            restaurant::Column::TotalReviews,
            Expr::value(summary.total_reviews),
        )
        .col_expr(restaurant::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(restaurant::Column::Id.eq(restaurant_id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Restaurant not found".into()));
    }

    tracing::debug!(
        restaurant_id,
        average_rating = summary.average_rating,
        total_reviews = summary.total_reviews,
        "Recomputed restaurant rating"
    );
    Ok(summary)
}
