use sqlx::PgPool;
use uuid::Uuid;

use super::client::MacroTotals;
use super::dto::NutritionInfo;

const COLUMNS: &str =
    "id, recipe_id, calories, protein, fat, carbs, fiber, sugar, servings, serving_size, last_updated";

pub async fn get(db: &PgPool, recipe_id: Uuid) -> Result<Option<NutritionInfo>, sqlx::Error> {
    sqlx::query_as::<_, NutritionInfo>(&format!(
        "SELECT {COLUMNS} FROM nutrition_info WHERE recipe_id = $1"
    ))
    .bind(recipe_id)
    .fetch_optional(db)
    .await
}

/// Replaces any earlier record for the recipe.
pub async fn upsert(
    db: &PgPool,
    recipe_id: Uuid,
    per_serving: &MacroTotals,
    servings: i32,
) -> Result<NutritionInfo, sqlx::Error> {
    sqlx::query_as::<_, NutritionInfo>(&format!(
        r#"
        INSERT INTO nutrition_info
            (recipe_id, calories, protein, fat, carbs, fiber, sugar, servings, serving_size)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, '1 serving')
        ON CONFLICT (recipe_id)
        DO UPDATE SET calories = EXCLUDED.calories,
                      protein = EXCLUDED.protein,
                      fat = EXCLUDED.fat,
                      carbs = EXCLUDED.carbs,
                      fiber = EXCLUDED.fiber,
                      sugar = EXCLUDED.sugar,
                      servings = EXCLUDED.servings,
                      serving_size = EXCLUDED.serving_size,
                      last_updated = now()
        RETURNING {COLUMNS}
        "#
    ))
    .bind(recipe_id)
    .bind(per_serving.calories)
    .bind(per_serving.protein)
    .bind(per_serving.fat)
    .bind(per_serving.carbs)
    .bind(per_serving.fiber)
    .bind(per_serving.sugar)
    .bind(servings)
    .fetch_one(db)
    .await
}
