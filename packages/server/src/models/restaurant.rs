use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::utils::geo::validate_coordinates;

use super::cuisine::{CuisineType, validate_cuisines};
use super::review::ReviewResponse;
pub use super::shared::Pagination;
use super::shared::image_url;

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_DESCRIPTION_LENGTH: usize = 500;
pub const MAX_ADDRESS_FIELD_LENGTH: usize = 200;
pub const DEFAULT_COUNTRY: &str = "Polska";

/// Postal address as submitted by the owner.
#[derive(Debug, Clone, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct AddressInput {
    #[schema(example = "ul. Półwiejska 2")]
    pub street: String,
    #[schema(example = "Poznań")]
    pub city: String,
    #[schema(example = "61-888")]
    pub postal_code: String,
    /// Defaults to "Polska" when omitted.
    #[schema(example = "Polska")]
    pub country: Option<String>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// WGS84 coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, utoipa::ToSchema)]
pub struct Location {
    #[schema(example = 52.4064)]
    pub latitude: f64,
    #[schema(example = 16.9252)]
    pub longitude: f64,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateRestaurantRequest {
    #[schema(example = "Pierogarnia Stary Rynek")]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub address: AddressInput,
    pub location: Location,
    /// At least one tag, no duplicates.
    pub cuisines: Vec<CuisineType>,
}

/// PATCH body. Omitted fields are left unchanged; `address` is replaced as a
/// whole when present.
#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateRestaurantRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<AddressInput>,
    pub location: Option<Location>,
    pub cuisines: Option<Vec<CuisineType>>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct OwnerSummary {
    pub id: i32,
    pub username: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RestaurantResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub address: Address,
    pub location: Location,
    pub cuisines: Vec<CuisineType>,
    /// Present when the restaurant has an uploaded image.
    pub image_url: Option<String>,
    pub owner: OwnerSummary,
    /// Mean rating rounded to one decimal; 0 when there are no reviews.
    #[schema(example = 4.7)]
    pub average_rating: f64,
    #[schema(example = 3)]
    pub total_reviews: i32,
    /// Distance in metres from the requested point; only set by proximity
    /// searches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RestaurantResponse {
    pub fn new(
        m: crate::entity::restaurant::Model,
        owner_username: String,
        cuisines: Vec<CuisineType>,
    ) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            address: Address {
                street: m.street,
                city: m.city,
                postal_code: m.postal_code,
                country: m.country,
            },
            location: Location {
                latitude: m.latitude,
                longitude: m.longitude,
            },
            cuisines,
            image_url: m.image_hash.as_deref().map(image_url),
            owner: OwnerSummary {
                id: m.owner_id,
                username: owner_username,
            },
            average_rating: m.average_rating,
            total_reviews: m.total_reviews,
            distance_m: None,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RestaurantListQuery {
    /// Page number (default 1).
    pub page: Option<u64>,
    /// Items per page, 1-100 (default 20).
    pub per_page: Option<u64>,
    /// Case-insensitive substring of the name.
    pub search: Option<String>,
    /// Comma-separated cuisine tags; matches restaurants with any of them.
    #[param(example = "pizza,sushi")]
    pub cuisine: Option<String>,
    /// Latitude of the search centre. Requires `lng`.
    pub lat: Option<f64>,
    /// Longitude of the search centre. Requires `lat`.
    pub lng: Option<f64>,
    /// Search radius in metres (default 10000).
    pub radius: Option<f64>,
    /// One of `name`, `average_rating`, `total_reviews`, `created_at`, or
    /// `distance` (needs `lat`/`lng`). Defaults to `distance` with a point,
    /// `name` otherwise.
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`.
    pub sort_order: Option<String>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MyRestaurantsQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RestaurantListResponse {
    pub data: Vec<RestaurantResponse>,
    pub pagination: Pagination,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RestaurantDetailResponse {
    pub restaurant: RestaurantResponse,
    /// First page of reviews, newest first.
    pub reviews: Vec<ReviewResponse>,
    pub pagination: Pagination,
    /// The caller's own review, when authenticated and one exists.
    pub user_review: Option<ReviewResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageUploadResponse {
    #[schema(example = "/api/v1/images/9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")]
    pub image_url: String,
    #[schema(example = "image/jpeg")]
    pub content_type: String,
    pub size: u64,
}

fn validate_name(name: &str) -> Result<(), AppError> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "Name must be 1-{MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), AppError> {
    if description.trim().chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(AppError::Validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_address(address: &AddressInput) -> Result<(), AppError> {
    let required = [
        ("street", address.street.as_str()),
        ("city", address.city.as_str()),
        ("postal_code", address.postal_code.as_str()),
    ];
    for (field, value) in required {
        let len = value.trim().chars().count();
        if len == 0 || len > MAX_ADDRESS_FIELD_LENGTH {
            return Err(AppError::Validation(format!(
                "Address {field} must be 1-{MAX_ADDRESS_FIELD_LENGTH} characters"
            )));
        }
    }
    if let Some(ref country) = address.country
        && country.trim().chars().count() > MAX_ADDRESS_FIELD_LENGTH
    {
        return Err(AppError::Validation(format!(
            "Address country must be at most {MAX_ADDRESS_FIELD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Trimmed country, falling back to [`DEFAULT_COUNTRY`] when blank or absent.
pub fn country_or_default(country: Option<&str>) -> String {
    match country.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_string(),
        _ => DEFAULT_COUNTRY.to_string(),
    }
}

pub fn validate_create_restaurant(req: &CreateRestaurantRequest) -> Result<(), AppError> {
    validate_name(&req.name)?;
    validate_description(&req.description)?;
    validate_address(&req.address)?;
    validate_coordinates(req.location.latitude, req.location.longitude)?;
    validate_cuisines(&req.cuisines)
}

pub fn validate_update_restaurant(req: &UpdateRestaurantRequest) -> Result<(), AppError> {
    if let Some(ref name) = req.name {
        validate_name(name)?;
    }
    if let Some(ref description) = req.description {
        validate_description(description)?;
    }
    if let Some(ref address) = req.address {
        validate_address(address)?;
    }
    if let Some(location) = req.location {
        validate_coordinates(location.latitude, location.longitude)?;
    }
    if let Some(ref cuisines) = req.cuisines {
        validate_cuisines(cuisines)?;
    }
    Ok(())
}
