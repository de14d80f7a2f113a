use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Per-serving macros stored for a recipe.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NutritionInfo {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub calories: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbs: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub servings: i32,
    pub serving_size: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct RecomputeRequest {
    #[serde(default = "one_serving")]
    pub servings: i32,
    /// Overrides the recipe's stored ingredient lines.
    #[serde(default)]
    pub ingredients: Option<Vec<String>>,
}

fn one_serving() -> i32 {
    1
}
