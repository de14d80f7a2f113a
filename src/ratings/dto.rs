use serde::{Deserialize, Serialize};

use super::repo::{Rating, RatingWithReviewer};
use crate::aggregate::RatingSummary;

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    /// Kept wide so out-of-range input reaches validation instead of failing
    /// deserialization.
    pub rating: i64,
    #[serde(default)]
    pub review: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecipeRatings {
    pub ratings: Vec<RatingWithReviewer>,
    pub summary: RatingSummary,
    /// The caller's own rating, if signed in and rated.
    pub mine: Option<Rating>,
}
