use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::RecipeInput;
use super::query::RecipeQuery;
use crate::aggregate::ViewedRecipe;

#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub owner_email: String,
    pub title: String,
    pub ingredients: String,
    pub steps: String,
    pub diet_type: Option<String>,
    pub cooking_time: i32,
    pub views: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub async fn count(db: &PgPool, q: &RecipeQuery) -> Result<i64, sqlx::Error> {
    let mut qb = q.count_query();
    let n = qb.build_query_scalar::<i64>().fetch_one(db).await?;
    Ok(n)
}

pub async fn fetch_page(db: &PgPool, q: &RecipeQuery) -> Result<Vec<RecipeRow>, sqlx::Error> {
    let mut qb = q.page_query();
    let rows = qb.build_query_as::<RecipeRow>().fetch_all(db).await?;
    Ok(rows)
}

/// Fetches a recipe for display and counts the view.
pub async fn get_counting_view(db: &PgPool, id: Uuid) -> Result<Option<RecipeRow>, sqlx::Error> {
    sqlx::query_as::<_, RecipeRow>(
        r#"
        WITH bumped AS (
            UPDATE recipes SET views = views + 1
             WHERE id = $1
         RETURNING *
        )
        SELECT b.id, b.user_id, u.email AS owner_email, b.title, b.ingredients, b.steps,
               b.diet_type, b.cooking_time, b.views, b.created_at, b.updated_at
          FROM bumped b
          JOIN users u ON u.id = b.user_id
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn ingredients_of(db: &PgPool, id: Uuid) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(r#"SELECT ingredients FROM recipes WHERE id = $1"#)
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert(db: &PgPool, user_id: Uuid, input: &RecipeInput) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO recipes (user_id, title, ingredients, steps, diet_type, cooking_time)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(&input.title)
    .bind(&input.ingredients)
    .bind(&input.steps)
    .bind(&input.diet_type)
    .bind(input.cooking_time)
    .fetch_one(db)
    .await
}

pub async fn update(db: &PgPool, id: Uuid, input: &RecipeInput) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(
        r#"
        UPDATE recipes
           SET title = $2, ingredients = $3, steps = $4, diet_type = $5,
               cooking_time = $6, updated_at = now()
         WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&input.title)
    .bind(&input.ingredients)
    .bind(&input.steps)
    .bind(&input.diet_type)
    .bind(input.cooking_time)
    .execute(db)
    .await?;
    Ok(res.rows_affected())
}

pub async fn delete(db: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(r#"DELETE FROM recipes WHERE id = $1"#)
        .bind(id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

pub async fn views_by_owner(db: &PgPool, user_id: Uuid) -> Result<Vec<ViewedRecipe>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (Uuid, String, i64)>(
        r#"
        SELECT id, title, views
          FROM recipes
         WHERE user_id = $1
         ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(id, title, views)| ViewedRecipe { id, title, views })
        .collect())
}
