use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{RatingRequest, RecipeRatings};
use super::repo::Rating;
use super::services;
use crate::{error::AppError, session::Session, state::AppState};

pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes/:id/ratings", get(list_ratings))
        .route("/recipes/:id/rating", put(submit_rating))
        .route("/ratings/:id", put(update_rating).delete(delete_rating))
}

#[instrument(skip(state, session))]
pub async fn list_ratings(
    State(state): State<AppState>,
    session: Session,
    Path(recipe_id): Path<Uuid>,
) -> Result<Json<RecipeRatings>, AppError> {
    Ok(Json(services::recipe_ratings(&state, &session, recipe_id).await?))
}

#[instrument(skip(state, session, payload))]
pub async fn submit_rating(
    State(state): State<AppState>,
    session: Session,
    Path(recipe_id): Path<Uuid>,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<Rating>, AppError> {
    Ok(Json(services::submit_rating(&state, &session, recipe_id, payload).await?))
}

#[instrument(skip(state, session, payload))]
pub async fn update_rating(
    State(state): State<AppState>,
    session: Session,
    Path(rating_id): Path<Uuid>,
    Json(payload): Json<RatingRequest>,
) -> Result<Json<Rating>, AppError> {
    Ok(Json(services::update_rating(&state, &session, rating_id, payload).await?))
}

#[instrument(skip(state, session))]
pub async fn delete_rating(
    State(state): State<AppState>,
    session: Session,
    Path(rating_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_rating(&state, &session, rating_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
