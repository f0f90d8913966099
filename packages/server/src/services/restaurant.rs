use chrono::Utc;
use common::{ContentHash, ImageStore};
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set, Statement, TransactionSession, TransactionTrait,
};

use crate::entity::{restaurant, restaurant_cuisine, review};
use crate::error::AppError;
use crate::models::cuisine::CuisineType;
use crate::models::restaurant::{
    CreateRestaurantRequest, UpdateRestaurantRequest, country_or_default,
};

pub struct RestaurantService<'a, C: ConnectionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait> RestaurantService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// Insert a restaurant owned by `owner_id` with an empty rating summary.
    pub async fn create(
        &self,
        owner_id: i32,
        req: CreateRestaurantRequest,
    ) -> Result<restaurant::Model, AppError> {
        let now = Utc::now();
        let new_restaurant = restaurant::ActiveModel {
            name: Set(req.name.trim().to_string()),
            description: Set(req.description.trim().to_string()),
            street: Set(req.address.street.trim().to_string()),
            city: Set(req.address.city.trim().to_string()),
            postal_code: Set(req.address.postal_code.trim().to_string()),
            country: Set(country_or_default(req.address.country.as_deref())),
            longitude: Set(req.location.longitude),
            latitude: Set(req.location.latitude),
            image_hash: Set(None),
            image_content_type: Set(None),
            owner_id: Set(owner_id),
            average_rating: Set(0.0),
            total_reviews: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = new_restaurant.insert(self.conn).await?;
        self.replace_cuisines(model.id, &req.cuisines).await?;

        tracing::info!(restaurant_id = model.id, owner_id, "Restaurant created");
        Ok(model)
    }

    /// Lock the restaurant row and check that `user_id` owns it.
    pub async fn lock_owned(
        &self,
        restaurant_id: i32,
        user_id: i32,
    ) -> Result<restaurant::Model, AppError> {
        let model = restaurant::Entity::find_by_id(restaurant_id)
            .lock(LockType::Update)
            .one(self.conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Restaurant not found".into()))?;

        if model.owner_id != user_id {
            return Err(AppError::PermissionDenied);
        }
        Ok(model)
    }

    /// Apply a partial update. Rating fields are never touched here.
    pub async fn update(
        &self,
        restaurant_id: i32,
        user_id: i32,
        req: UpdateRestaurantRequest,
    ) -> Result<restaurant::Model, AppError> {
        let existing = self.lock_owned(restaurant_id, user_id).await?;
        let mut active: restaurant::ActiveModel = existing.into();

        if let Some(ref name) = req.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(ref description) = req.description {
            active.description = Set(description.trim().to_string());
        }
        if let Some(address) = req.address {
            active.street = Set(address.street.trim().to_string());
            active.city = Set(address.city.trim().to_string());
            active.postal_code = Set(address.postal_code.trim().to_string());
            active.country = Set(country_or_default(address.country.as_deref()));
        }
        if let Some(location) = req.location {
            active.latitude = Set(location.latitude);
            active.longitude = Set(location.longitude);
        }
        if let Some(ref cuisines) = req.cuisines {
            restaurant_cuisine::Entity::delete_many()
                .filter(restaurant_cuisine::Column::RestaurantId.eq(restaurant_id))
                .exec(self.conn)
                .await?;
            self.replace_cuisines(restaurant_id, cuisines).await?;
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(self.conn).await?)
    }

    /// Delete a restaurant with its reviews and cuisine rows.
    ///
    /// Returns the image hash the restaurant referenced, for release after
    /// the caller commits.
    pub async fn delete(
        &self,
        restaurant_id: i32,
        user_id: i32,
    ) -> Result<Option<String>, AppError> {
        let existing = self.lock_owned(restaurant_id, user_id).await?;

        let reviews = review::Entity::delete_many()
            .filter(review::Column::RestaurantId.eq(restaurant_id))
            .exec(self.conn)
            .await?;
        restaurant_cuisine::Entity::delete_many()
            .filter(restaurant_cuisine::Column::RestaurantId.eq(restaurant_id))
            .exec(self.conn)
            .await?;
        restaurant::Entity::delete_by_id(restaurant_id)
            .exec(self.conn)
            .await?;

        tracing::info!(
            restaurant_id,
            reviews_deleted = reviews.rows_affected,
            "Restaurant deleted"
        );
        Ok(existing.image_hash)
    }

    /// Point the restaurant at a stored image. Returns the previous hash.
    pub async fn set_image(
        &self,
        restaurant_id: i32,
        user_id: i32,
        hash: &ContentHash,
        content_type: &str,
    ) -> Result<Option<String>, AppError> {
        let existing = self.lock_owned(restaurant_id, user_id).await?;
        let previous = existing.image_hash.clone();

        let mut active: restaurant::ActiveModel = existing.into();
        active.image_hash = Set(Some(hash.to_hex()));
        active.image_content_type = Set(Some(content_type.to_string()));
        active.updated_at = Set(Utc::now());
        active.update(self.conn).await?;

        Ok(previous.filter(|old| *old != hash.to_hex()))
    }

    async fn replace_cuisines(
        &self,
        restaurant_id: i32,
        cuisines: &[CuisineType],
    ) -> Result<(), AppError> {
        if cuisines.is_empty() {
            return Ok(());
        }
        let rows = cuisines.iter().map(|c| restaurant_cuisine::ActiveModel {
            restaurant_id: Set(restaurant_id),
            cuisine: Set(c.as_str().to_string()),
        });
        restaurant_cuisine::Entity::insert_many(rows)
            .exec_without_returning(self.conn)
            .await?;
        Ok(())
    }
}

/// Take a transaction-scoped advisory lock on an image hash.
///
/// Every path that adds a reference to a blob or removes an unreferenced
/// blob holds this lock, so a reference count seen under it stays valid
/// until the blob has been deleted or the new reference committed.
pub async fn lock_image_hash<C: ConnectionTrait>(conn: &C, hash: &str) -> Result<(), AppError> {
    conn.query_one_raw(Statement::from_sql_and_values(
        conn.get_database_backend(),
        "SELECT 1 AS locked FROM pg_advisory_xact_lock(hashtext($1))",
        [hash.into()],
    ))
    .await?;
    Ok(())
}

/// Remove an image blob once no restaurant references it.
///
/// Best-effort: runs after the owning transaction has committed, and
/// failures are logged and swallowed since the database is already
/// consistent. A leftover blob only costs disk space.
pub async fn release_image<C>(db: &C, images: &dyn ImageStore, hash: &str)
where
    C: ConnectionTrait + TransactionTrait,
{
    let parsed: ContentHash = match hash.parse() {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(hash, error = %e, "Stored image hash is malformed");
            return;
        }
    };

    if let Err(e) = release_locked(db, images, hash, &parsed).await {
        tracing::warn!(hash, error = ?e, "Failed to release image");
    }
}

async fn release_locked<C>(
    db: &C,
    images: &dyn ImageStore,
    hash: &str,
    parsed: &ContentHash,
) -> Result<(), AppError>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    lock_image_hash(&txn, hash).await?;

    let in_use = restaurant::Entity::find()
        .filter(restaurant::Column::ImageHash.eq(hash))
        .count(&txn)
        .await?;

    if in_use == 0 && images.delete(parsed).await? {
        tracing::debug!(hash, "Released unreferenced image");
    }

    txn.commit().await?;
    Ok(())
}
