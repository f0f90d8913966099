use crate::error::AppError;

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default search radius for proximity queries, in metres.
pub const DEFAULT_RADIUS_M: f64 = 10_000.0;

/// Great-circle distance in metres from the point bound to `$1` (latitude)
/// and `$2` (longitude) to a restaurant row's `latitude` / `longitude`.
///
/// Same haversine formula as [`distance_m`]; `least` guards `asin` against
/// rounding just above 1.
pub const DISTANCE_SQL: &str = "(2 * 6371000.0 * asin(least(1.0, sqrt(\
    power(sin(radians(\"latitude\" - $1) / 2), 2) + \
    cos(radians($1)) * cos(radians(\"latitude\")) * \
    power(sin(radians(\"longitude\" - $2) / 2), 2)))))";

/// Haversine distance in metres between two (latitude, longitude) points.
pub fn distance_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), AppError> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(AppError::Validation(
            "Latitude must be between -90 and 90".into(),
        ));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::Validation(
            "Longitude must be between -180 and 180".into(),
        ));
    }
    Ok(())
}
