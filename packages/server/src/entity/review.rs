use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A user's review of a restaurant.
///
/// `(user_id, restaurant_id)` is unique; the index is created by
/// `seed::ensure_indexes` and backs the upsert in `services::review`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "review")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: HasOne<super::user::Entity>,

    pub restaurant_id: i32,
    #[sea_orm(belongs_to, from = "restaurant_id", to = "id")]
    pub restaurant: HasOne<super::restaurant::Entity>,

    pub rating: i32, // 1-5
    #[sea_orm(column_type = "Text")]
    pub comment: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
