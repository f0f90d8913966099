use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "restaurant_cuisine")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub restaurant_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub cuisine: String, // CuisineType::as_str()
    #[sea_orm(belongs_to, from = "restaurant_id", to = "id")]
    pub restaurant: HasOne<super::restaurant::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
