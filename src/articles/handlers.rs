use axum::{
    extract::{Path, Query},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::catalogue::{Article, Catalogue, Category};
use crate::{error::AppError, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct ArticleFilter {
    pub category: Option<String>,
}

pub fn article_routes() -> Router<AppState> {
    Router::new()
        .route("/articles", get(list_articles))
        .route("/articles/categories", get(list_categories))
        .route("/articles/:id", get(get_article))
}

#[instrument]
pub async fn list_articles(Query(filter): Query<ArticleFilter>) -> Json<Vec<Article>> {
    let articles = Catalogue::bundled()
        .articles(filter.category.as_deref())
        .into_iter()
        .cloned()
        .collect();
    Json(articles)
}

pub async fn list_categories() -> Json<Vec<Category>> {
    Json(Catalogue::bundled().categories.clone())
}

#[instrument]
pub async fn get_article(Path(id): Path<String>) -> Result<Json<Article>, AppError> {
    Catalogue::bundled()
        .article(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::not_found("Article not found"))
}
