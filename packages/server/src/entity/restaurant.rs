use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "restaurant")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,

    pub longitude: f64,
    pub latitude: f64,

    pub image_hash: Option<String>, // SHA-256 hex in the image store
    pub image_content_type: Option<String>,

    pub owner_id: i32,
    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: HasOne<super::user::Entity>,

    #[sea_orm(has_many)]
    pub cuisines: HasMany<super::restaurant_cuisine::Entity>,

    #[sea_orm(has_many)]
    pub reviews: HasMany<super::review::Entity>,

    // Derived from the review set; written only by the rating recompute.
    pub average_rating: f64,
    pub total_reviews: i32,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
