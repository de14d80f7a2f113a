use crate::state::AppState;
use axum::Router;

pub mod catalogue;
pub mod handlers;

pub fn router() -> Router<AppState> {
    handlers::article_routes()
}
