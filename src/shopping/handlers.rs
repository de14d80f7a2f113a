use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{AddItemsRequest, CreateListRequest, ItemPatch, ShoppingListView};
use super::repo::{ShoppingList, ShoppingListItem};
use super::services;
use crate::{error::AppError, session::Session, state::AppState};

pub fn shopping_routes() -> Router<AppState> {
    Router::new()
        .route("/shopping-lists", get(list_lists).post(create_list))
        .route("/shopping-lists/:id", delete(delete_list))
        .route("/shopping-lists/:id/items", post(add_items))
        .route("/shopping-lists/:id/recipes/:recipe_id", post(add_recipe))
        .route(
            "/shopping-list-items/:id",
            patch(update_item).delete(delete_item),
        )
}

#[instrument(skip(state, session))]
pub async fn list_lists(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<ShoppingListView>>, AppError> {
    Ok(Json(services::list_shopping_lists(&state, &session).await?))
}

#[instrument(skip(state, session, payload))]
pub async fn create_list(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateListRequest>,
) -> Result<(StatusCode, Json<ShoppingList>), AppError> {
    let list = services::create_list(&state, &session, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

#[instrument(skip(state, session))]
pub async fn delete_list(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_list(&state, &session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, session, payload))]
pub async fn add_items(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddItemsRequest>,
) -> Result<(StatusCode, Json<Vec<ShoppingListItem>>), AppError> {
    let items = services::add_items(&state, &session, id, payload.items).await?;
    Ok((StatusCode::CREATED, Json(items)))
}

#[instrument(skip(state, session))]
pub async fn add_recipe(
    State(state): State<AppState>,
    session: Session,
    Path((id, recipe_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<Vec<ShoppingListItem>>), AppError> {
    let items = services::add_recipe_to_list(&state, &session, id, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(items)))
}

#[instrument(skip(state, session, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
    Json(payload): Json<ItemPatch>,
) -> Result<Json<ShoppingListItem>, AppError> {
    Ok(Json(services::update_item(&state, &session, id, payload).await?))
}

#[instrument(skip(state, session))]
pub async fn delete_item(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    services::delete_item(&state, &session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
