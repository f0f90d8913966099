/// Denormalised rating fields stored on a restaurant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: i32,
}

impl RatingSummary {
    pub const EMPTY: Self = Self {
        average_rating: 0.0,
        total_reviews: 0,
    };

    /// Summary of `count` reviews whose ratings add up to `sum`.
    pub fn from_totals(sum: i64, count: i64) -> Self {
        if count <= 0 {
            return Self::EMPTY;
        }
        Self {
            average_rating: round_mean_to_tenths(sum, count),
            total_reviews: i32::try_from(count).unwrap_or(i32::MAX),
        }
    }
}

/// `sum / count` rounded half-up to one decimal place.
///
/// Computed on integers so that exact halves (3.75, 4.25) always round up;
/// `f64` division would misplace some of them.
pub fn round_mean_to_tenths(sum: i64, count: i64) -> f64 {
    if count <= 0 {
        return 0.0;
    }
    // floor(10 * sum / count + 1/2) == floor((20 * sum + count) / (2 * count))
    let tenths = (20 * sum + count).div_euclid(2 * count);
    tenths as f64 / 10.0
}
