use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{RecipeDetails, RecipeForm, RecipePage, SavedRecipe};
use super::query::{RecipeListParams, RecipeQuery};
use super::services;
use crate::{
    aggregate::ProfileStats,
    error::AppError,
    images::services::{UploadItem, MAX_IMAGE_BYTES},
    session::Session,
    state::AppState,
};

pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/recipes/:id", get(get_recipe))
        .route("/me/recipes", get(my_recipes))
        .route("/me/stats", get(my_stats))
}

pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/recipes", post(create_recipe))
        .route(
            "/recipes/:id",
            put(update_recipe).delete(delete_recipe),
        )
        // room for the text fields next to a maximum-size image
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 1024 * 1024))
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::validation(format!("Invalid form data: {}", e.body_text()))
}

/// Splits a recipe form into its text fields and the optional `image` part.
async fn read_recipe_form(mut mp: Multipart) -> Result<(RecipeForm, Option<UploadItem>), AppError> {
    let mut form = RecipeForm::default();
    let mut image = None;
    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        if name == "image" {
            let file_name = field.file_name().map(str::to_string);
            let content_type = field
                .content_type()
                .map(str::to_string)
                .unwrap_or_else(|| "application/octet-stream".into());
            let body = field.bytes().await.map_err(bad_multipart)?;
            // browsers send an empty part when no file was chosen
            if body.is_empty() && file_name.as_deref().unwrap_or_default().is_empty() {
                continue;
            }
            image = Some(UploadItem {
                body,
                content_type,
                file_name,
            });
            continue;
        }
        let value = field.text().await.map_err(bad_multipart)?;
        match name.as_str() {
            "title" => form.title = value,
            "ingredients" => form.ingredients = value,
            "steps" => form.steps = value,
            "diet_type" => form.diet_type = Some(value),
            "cooking_time" => form.cooking_time = Some(value),
            _ => {}
        }
    }
    Ok((form, image))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    Query(params): Query<RecipeListParams>,
) -> Result<Json<RecipePage>, AppError> {
    let q = RecipeQuery::from_params(params, &state.config.paging)?;
    Ok(Json(services::list_recipes(&state, q).await?))
}

#[instrument(skip(state, session))]
pub async fn my_recipes(
    State(state): State<AppState>,
    session: Session,
    Query(params): Query<RecipeListParams>,
) -> Result<Json<RecipePage>, AppError> {
    let q = RecipeQuery::from_params(params, &state.config.paging)?;
    Ok(Json(services::my_recipes(&state, &session, q).await?))
}

#[instrument(skip(state, session))]
pub async fn my_stats(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ProfileStats>, AppError> {
    Ok(Json(services::profile_stats(&state, &session).await?))
}

#[instrument(skip(state, session))]
pub async fn get_recipe(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<Json<RecipeDetails>, AppError> {
    Ok(Json(services::get_recipe(&state, &session, id).await?))
}

/// POST /recipes (multipart)
#[instrument(skip(state, session, mp))]
pub async fn create_recipe(
    State(state): State<AppState>,
    session: Session,
    mp: Multipart,
) -> Result<(StatusCode, HeaderMap, Json<SavedRecipe>), AppError> {
    let (form, image) = read_recipe_form(mp).await?;
    let saved = services::create_recipe(&state, &session, form, image).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/recipes/{}", saved.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(saved)))
}

/// PUT /recipes/:id (multipart)
#[instrument(skip(state, session, mp))]
pub async fn update_recipe(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> Result<Json<SavedRecipe>, AppError> {
    let (form, image) = read_recipe_form(mp).await?;
    Ok(Json(services::update_recipe(&state, &session, id, form, image).await?))
}

#[instrument(skip(state, session))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_recipe(&state, &session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
