use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Rating {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub user_id: Uuid,
    pub rating: i16,
    pub review: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RatingWithReviewer {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub rating: Rating,
    pub reviewer_email: String,
}

const RATING_COLUMNS: &str = "id, recipe_id, user_id, rating, review, created_at, updated_at";

/// One row per (user, recipe): a second submission overwrites the first.
pub async fn upsert(
    db: &PgPool,
    user_id: Uuid,
    recipe_id: Uuid,
    value: i16,
    review: &str,
) -> Result<Rating, sqlx::Error> {
    sqlx::query_as::<_, Rating>(&format!(
        r#"
        INSERT INTO ratings (recipe_id, user_id, rating, review)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, recipe_id)
        DO UPDATE SET rating = EXCLUDED.rating,
                      review = EXCLUDED.review,
                      updated_at = now()
        RETURNING {RATING_COLUMNS}
        "#
    ))
    .bind(recipe_id)
    .bind(user_id)
    .bind(value)
    .bind(review)
    .fetch_one(db)
    .await
}

pub async fn update(
    db: &PgPool,
    rating_id: Uuid,
    value: i16,
    review: &str,
) -> Result<Option<Rating>, sqlx::Error> {
    sqlx::query_as::<_, Rating>(&format!(
        r#"
        UPDATE ratings
           SET rating = $2, review = $3, updated_at = now()
         WHERE id = $1
        RETURNING {RATING_COLUMNS}
        "#
    ))
    .bind(rating_id)
    .bind(value)
    .bind(review)
    .fetch_optional(db)
    .await
}

pub async fn delete(db: &PgPool, rating_id: Uuid) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(r#"DELETE FROM ratings WHERE id = $1"#)
        .bind(rating_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

/// Newest first, with the reviewer's email.
pub async fn list_for_recipe(
    db: &PgPool,
    recipe_id: Uuid,
) -> Result<Vec<RatingWithReviewer>, sqlx::Error> {
    sqlx::query_as::<_, RatingWithReviewer>(
        r#"
        SELECT r.id, r.recipe_id, r.user_id, r.rating, r.review, r.created_at, r.updated_at,
               u.email AS reviewer_email
          FROM ratings r
          JOIN users u ON u.id = r.user_id
         WHERE r.recipe_id = $1
         ORDER BY r.created_at DESC
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await
}

pub async fn find_by_user(
    db: &PgPool,
    user_id: Uuid,
    recipe_id: Uuid,
) -> Result<Option<Rating>, sqlx::Error> {
    sqlx::query_as::<_, Rating>(&format!(
        "SELECT {RATING_COLUMNS} FROM ratings WHERE recipe_id = $1 AND user_id = $2"
    ))
    .bind(recipe_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
}

/// `(recipe_id, rating)` pairs for every recipe in `recipe_ids`.
pub async fn values_for_recipes(
    db: &PgPool,
    recipe_ids: &[Uuid],
) -> Result<Vec<(Uuid, i16)>, sqlx::Error> {
    if recipe_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, (Uuid, i16)>(
        r#"SELECT recipe_id, rating FROM ratings WHERE recipe_id = ANY($1)"#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
}
