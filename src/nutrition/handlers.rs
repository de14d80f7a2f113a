use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{NutritionInfo, RecomputeRequest};
use super::services;
use crate::{error::AppError, session::Session, state::AppState};

pub fn nutrition_routes() -> Router<AppState> {
    Router::new().route(
        "/recipes/:id/nutrition",
        get(get_nutrition).post(recompute_nutrition),
    )
}

#[instrument(skip(state))]
pub async fn get_nutrition(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> Result<Json<Option<NutritionInfo>>, AppError> {
    Ok(Json(services::get_nutrition(&state, recipe_id).await?))
}

#[instrument(skip(state, session, payload))]
pub async fn recompute_nutrition(
    State(state): State<AppState>,
    session: Session,
    Path(recipe_id): Path<Uuid>,
    Json(payload): Json<RecomputeRequest>,
) -> Result<Json<NutritionInfo>, AppError> {
    let info = match payload.ingredients {
        Some(lines) => {
            services::recompute_nutrition(&state, &session, recipe_id, &lines, payload.servings)
                .await?
        }
        None => {
            services::recompute_from_recipe(&state, &session, recipe_id, payload.servings).await?
        }
    };
    Ok(Json(info))
}
