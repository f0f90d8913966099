use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Cuisine tags a restaurant can carry. The set is closed; anything else is
/// rejected at the API boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, utoipa::ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum CuisineType {
    Polish,
    Italian,
    Asian,
    American,
    French,
    Mexican,
    Indian,
    Greek,
    Sushi,
    Pizza,
    Burgers,
    Kebab,
    Vegan,
    Vegetarian,
    FastFood,
    FineDining,
    Breakfast,
    Desserts,
    Seafood,
    Bbq,
}

impl CuisineType {
    pub const ALL: [CuisineType; 20] = [
        Self::Polish,
        Self::Italian,
        Self::Asian,
        Self::American,
        Self::French,
        Self::Mexican,
        Self::Indian,
        Self::Greek,
        Self::Sushi,
        Self::Pizza,
        Self::Burgers,
        Self::Kebab,
        Self::Vegan,
        Self::Vegetarian,
        Self::FastFood,
        Self::FineDining,
        Self::Breakfast,
        Self::Desserts,
        Self::Seafood,
        Self::Bbq,
    ];

    /// Stored and serialised form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Polish => "polish",
            Self::Italian => "italian",
            Self::Asian => "asian",
            Self::American => "american",
            Self::French => "french",
            Self::Mexican => "mexican",
            Self::Indian => "indian",
            Self::Greek => "greek",
            Self::Sushi => "sushi",
            Self::Pizza => "pizza",
            Self::Burgers => "burgers",
            Self::Kebab => "kebab",
            Self::Vegan => "vegan",
            Self::Vegetarian => "vegetarian",
            Self::FastFood => "fast_food",
            Self::FineDining => "fine_dining",
            Self::Breakfast => "breakfast",
            Self::Desserts => "desserts",
            Self::Seafood => "seafood",
            Self::Bbq => "bbq",
        }
    }
}

impl FromStr for CuisineType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown cuisine type '{s}'")))
    }
}

/// A restaurant needs at least one cuisine and may not repeat one.
pub fn validate_cuisines(cuisines: &[CuisineType]) -> Result<(), AppError> {
    if cuisines.is_empty() {
        return Err(AppError::Validation(
            "At least one cuisine type is required".into(),
        ));
    }
    let mut seen = HashSet::new();
    for &c in cuisines {
        if !seen.insert(c) {
            return Err(AppError::Validation(format!(
                "Duplicate cuisine type '{}'",
                c.as_str()
            )));
        }
    }
    Ok(())
}

/// Parse the comma-separated `cuisine` query filter, e.g. `pizza,sushi`.
pub fn parse_cuisine_filter(raw: &str) -> Result<Vec<CuisineType>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}
