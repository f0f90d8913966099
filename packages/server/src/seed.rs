use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::entity::{restaurant, review};

/// Name of the unique index enforcing one review per (user, restaurant).
pub const REVIEW_PAIR_INDEX: &str = "idx_review_user_restaurant";

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't create composite or expression indexes, so
/// they are created here on startup. The review-pair index is required by
/// the review upsert and its absence is fatal; the others only affect
/// query speed.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name(REVIEW_PAIR_INDEX)
        .table(review::Entity)
        .col(review::Column::UserId)
        .col(review::Column::RestaurantId)
        .to_string(PostgresQueryBuilder);
    db.execute_unprepared(&stmt).await?;
    info!("Ensured index {} exists", REVIEW_PAIR_INDEX);

    // Restaurant page: reviews of one restaurant, newest first
    let stmt = Index::create()
        .if_not_exists()
        .name("idx_review_restaurant_created")
        .table(review::Entity)
        .col(review::Column::RestaurantId)
        .col(review::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);
    ensure_optional_index(db, "idx_review_restaurant_created", &stmt).await;

    let stmt = Index::create()
        .if_not_exists()
        .name("idx_restaurant_owner")
        .table(restaurant::Entity)
        .col(restaurant::Column::OwnerId)
        .to_string(PostgresQueryBuilder);
    ensure_optional_index(db, "idx_restaurant_owner", &stmt).await;

    // Must match the expression used by the comment search query.
    let stmt = "CREATE INDEX IF NOT EXISTS idx_review_comment_fts \
                ON review USING GIN (to_tsvector('simple', comment))";
    ensure_optional_index(db, "idx_review_comment_fts", stmt).await;

    Ok(())
}

async fn ensure_optional_index(db: &DatabaseConnection, name: &str, stmt: &str) {
    match db.execute_unprepared(stmt).await {
        Ok(_) => info!("Ensured index {} exists", name),
        Err(e) => tracing::warn!("Failed to create index {}: {}", name, e),
    }
}
