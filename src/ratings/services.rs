use tracing::info;
use uuid::Uuid;

use super::dto::{RatingRequest, RecipeRatings};
use super::repo::{self, Rating};
use crate::aggregate::rating_summary;
use crate::error::{AppError, RemoteContext};
use crate::guard::{self, Resource};
use crate::session::Session;
use crate::state::AppState;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

pub fn validate_rating(value: i64) -> Result<i16, AppError> {
    if !(MIN_RATING..=MAX_RATING).contains(&value) {
        return Err(AppError::validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    Ok(value as i16)
}

fn normalize_review(review: Option<String>) -> String {
    review.map(|r| r.trim().to_string()).unwrap_or_default()
}

fn is_foreign_key_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some("23503"))
}

/// Inserts the caller's rating or overwrites the one they already left.
pub async fn submit_rating(
    st: &AppState,
    session: &Session,
    recipe_id: Uuid,
    req: RatingRequest,
) -> Result<Rating, AppError> {
    let value = validate_rating(req.rating)?;
    let user_id = session.require()?;
    let review = normalize_review(req.review);

    let rating = repo::upsert(&st.db, user_id, recipe_id, value, &review)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::not_found("Recipe not found")
            } else {
                AppError::remote("Failed to submit rating", e)
            }
        })?;
    info!(%user_id, %recipe_id, rating = value, "rating submitted");
    Ok(rating)
}

pub async fn update_rating(
    st: &AppState,
    session: &Session,
    rating_id: Uuid,
    req: RatingRequest,
) -> Result<Rating, AppError> {
    let value = validate_rating(req.rating)?;
    guard::authorize(st, session, Resource::Rating, rating_id).await?;
    repo::update(&st.db, rating_id, value, &normalize_review(req.review))
        .await
        .remote_ctx("Failed to update rating")?
        .ok_or_else(|| AppError::not_found("Rating not found"))
}

pub async fn delete_rating(st: &AppState, session: &Session, rating_id: Uuid) -> Result<(), AppError> {
    let user_id = guard::authorize(st, session, Resource::Rating, rating_id).await?;
    let removed = repo::delete(&st.db, rating_id)
        .await
        .remote_ctx("Failed to delete rating")?;
    if removed == 0 {
        return Err(AppError::not_found("Rating not found"));
    }
    info!(%user_id, %rating_id, "rating deleted");
    Ok(())
}

/// All ratings of a recipe plus the caller's own, fetched concurrently.
pub async fn recipe_ratings(
    st: &AppState,
    session: &Session,
    recipe_id: Uuid,
) -> Result<RecipeRatings, AppError> {
    let mine = async {
        match session.user_id() {
            Some(user_id) => repo::find_by_user(&st.db, user_id, recipe_id).await,
            None => Ok(None),
        }
    };
    let (ratings, mine) = tokio::try_join!(repo::list_for_recipe(&st.db, recipe_id), mine)
        .remote_ctx("Failed to load ratings")?;

    let values: Vec<i16> = ratings.iter().map(|r| r.rating.rating).collect();
    Ok(RecipeRatings {
        summary: rating_summary(&values),
        ratings,
        mine,
    })
}
