use tracing::info;
use uuid::Uuid;

use super::client::MacroTotals;
use super::dto::NutritionInfo;
use super::repo;
use crate::error::{AppError, RemoteContext};
use crate::guard::{self, Resource};
use crate::recipes::{dto::ingredient_lines, repo as recipes_repo};
use crate::session::Session;
use crate::state::AppState;

/// Normalises whole-recipe totals to one serving.
pub fn per_serving(totals: &MacroTotals, servings: i32) -> MacroTotals {
    let n = f64::from(servings.max(1));
    MacroTotals {
        calories: totals.calories / n,
        protein: totals.protein / n,
        fat: totals.fat / n,
        carbs: totals.carbs / n,
        fiber: totals.fiber / n,
        sugar: totals.sugar / n,
    }
}

fn validate_servings(servings: i32) -> Result<(), AppError> {
    if servings < 1 {
        return Err(AppError::validation("Servings must be at least 1"));
    }
    Ok(())
}

/// Trimmed non-blank lines; at least one is required.
fn clean_lines(lines: &[String]) -> Result<Vec<String>, AppError> {
    let cleaned: Vec<String> = lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if cleaned.is_empty() {
        return Err(AppError::validation("No valid ingredients provided"));
    }
    Ok(cleaned)
}

pub async fn get_nutrition(st: &AppState, recipe_id: Uuid) -> Result<Option<NutritionInfo>, AppError> {
    repo::get(&st.db, recipe_id)
        .await
        .remote_ctx("Failed to load nutrition info")
}

/// Sends `lines` to the nutrition service, stores the per-serving result and
/// replaces any earlier record. Only the recipe owner may do this.
pub async fn recompute_nutrition(
    st: &AppState,
    session: &Session,
    recipe_id: Uuid,
    lines: &[String],
    servings: i32,
) -> Result<NutritionInfo, AppError> {
    let lines = clean_lines(lines)?;
    validate_servings(servings)?;
    let user_id = guard::authorize(st, session, Resource::Recipe, recipe_id).await?;
    compute_and_store(st, user_id, recipe_id, &lines, servings).await
}

/// Same as [`recompute_nutrition`], using the recipe's stored ingredients.
pub async fn recompute_from_recipe(
    st: &AppState,
    session: &Session,
    recipe_id: Uuid,
    servings: i32,
) -> Result<NutritionInfo, AppError> {
    validate_servings(servings)?;
    let user_id = guard::authorize(st, session, Resource::Recipe, recipe_id).await?;
    let text = recipes_repo::ingredients_of(&st.db, recipe_id)
        .await
        .remote_ctx("Failed to load recipe")?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;
    let lines = clean_lines(&ingredient_lines(&text))?;
    compute_and_store(st, user_id, recipe_id, &lines, servings).await
}

async fn compute_and_store(
    st: &AppState,
    user_id: Uuid,
    recipe_id: Uuid,
    lines: &[String],
    servings: i32,
) -> Result<NutritionInfo, AppError> {
    let totals = st
        .nutrition
        .analyze(lines, servings)
        .await
        .map_err(|e| AppError::remote("Failed to calculate nutrition", e))?;
    let info = repo::upsert(&st.db, recipe_id, &per_serving(&totals, servings), servings)
        .await
        .remote_ctx("Failed to save nutrition info")?;
    info!(%user_id, %recipe_id, servings, calories = info.calories, "nutrition recomputed");
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::client::fake::FixedNutrition;
    use crate::storage::fake::MemoryStorage;
    use std::sync::Arc;

    fn state_with(client: Arc<FixedNutrition>) -> AppState {
        AppState::fake_with(Arc::new(MemoryStorage::default()), client)
    }

    #[test]
    fn totals_are_divided_by_servings() {
        let totals = MacroTotals {
            calories: 800.0,
            protein: 40.0,
            fat: 20.0,
            carbs: 100.0,
            fiber: 8.0,
            sugar: 12.0,
        };
        let each = per_serving(&totals, 4);
        assert_eq!(each.calories, 200.0);
        assert_eq!(each.protein, 10.0);
        assert_eq!(each.carbs, 25.0);
        assert_eq!(each.sugar, 3.0);
        assert_eq!(per_serving(&totals, 1), totals);
    }

    #[tokio::test]
    async fn empty_ingredients_fail_before_any_call() {
        let client = Arc::new(FixedNutrition::default());
        let st = state_with(client.clone());
        let session = Session::authenticated(Uuid::new_v4());

        for lines in [vec![], vec![" ".to_string(), String::new()]] {
            let err = recompute_nutrition(&st, &session, Uuid::new_v4(), &lines, 2)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }));
        }
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn servings_below_one_are_rejected() {
        let client = Arc::new(FixedNutrition::default());
        let st = state_with(client.clone());
        let session = Session::authenticated(Uuid::new_v4());
        let lines = vec!["1 cup flour".to_string()];

        let err = recompute_nutrition(&st, &session, Uuid::new_v4(), &lines, 0)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Servings must be at least 1");

        let err = recompute_from_recipe(&st, &session, Uuid::new_v4(), -1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn anonymous_recompute_requires_login() {
        let client = Arc::new(FixedNutrition::default());
        let st = state_with(client.clone());
        let lines = vec!["2 eggs".to_string()];

        let err = recompute_nutrition(&st, &Session::anonymous(), Uuid::new_v4(), &lines, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthRequired { .. }));
        assert_eq!(client.calls(), 0);
    }

    mod db {
        use super::*;
        use crate::testing::{db_state_with, seed_recipe, seed_user};

        const TOTALS: MacroTotals = MacroTotals {
            calories: 800.0,
            protein: 40.0,
            fat: 20.0,
            carbs: 100.0,
            fiber: 8.0,
            sugar: 12.0,
        };

        async fn state(client: Arc<FixedNutrition>) -> AppState {
            db_state_with(Arc::new(MemoryStorage::default()), client).await
        }

        #[tokio::test]
        async fn recompute_stores_per_serving_values() {
            let client = Arc::new(FixedNutrition::returning(TOTALS));
            let st = state(client.clone()).await;
            let owner = seed_user(&st, "owner@example.com").await;
            let recipe = seed_recipe(&st, owner, "Pancakes", None).await;
            let session = Session::authenticated(owner);

            let info = recompute_from_recipe(&st, &session, recipe, 4).await.unwrap();
            assert_eq!(info.recipe_id, recipe);
            assert_eq!(info.servings, 4);
            assert_eq!(info.calories, 200.0);
            assert_eq!(info.protein, 10.0);
            assert_eq!(info.fat, 5.0);
            assert_eq!(info.serving_size, "1 serving");

            // a second run replaces the record instead of adding one
            let lines = vec!["3 eggs".to_string()];
            let again = recompute_nutrition(&st, &session, recipe, &lines, 2).await.unwrap();
            assert_eq!(again.id, info.id);
            assert_eq!(again.calories, 400.0);

            let stored = get_nutrition(&st, recipe).await.unwrap().unwrap();
            assert_eq!(stored.calories, 400.0);
            assert_eq!(stored.servings, 2);
            assert_eq!(client.calls(), 2);
        }

        #[tokio::test]
        async fn service_failure_stores_nothing() {
            let client = Arc::new(FixedNutrition {
                fail: true,
                ..FixedNutrition::returning(TOTALS)
            });
            let st = state(client.clone()).await;
            let owner = seed_user(&st, "owner@example.com").await;
            let recipe = seed_recipe(&st, owner, "Pancakes", None).await;

            let err = recompute_from_recipe(&st, &Session::authenticated(owner), recipe, 2)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::RemoteData { .. }));
            assert_eq!(err.to_string(), "Failed to calculate nutrition");
            assert_eq!(client.calls(), 1);
            assert!(get_nutrition(&st, recipe).await.unwrap().is_none());
        }

        #[tokio::test]
        async fn only_the_owner_may_recompute() {
            let client = Arc::new(FixedNutrition::returning(TOTALS));
            let st = state(client.clone()).await;
            let owner = seed_user(&st, "owner@example.com").await;
            let other = seed_user(&st, "other@example.com").await;
            let recipe = seed_recipe(&st, owner, "Pancakes", None).await;

            let err = recompute_from_recipe(&st, &Session::authenticated(other), recipe, 2)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::PermissionDenied { .. }));
            assert_eq!(client.calls(), 0);
        }
    }
}
