use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Image {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub image_url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub async fn insert_image(
    db: &PgPool,
    recipe_id: Uuid,
    image_url: &str,
) -> Result<Image, sqlx::Error> {
    sqlx::query_as::<_, Image>(
        r#"
        INSERT INTO images (recipe_id, image_url)
        VALUES ($1, $2)
        RETURNING id, recipe_id, image_url, created_at
        "#,
    )
    .bind(recipe_id)
    .bind(image_url)
    .fetch_one(db)
    .await
}

/// Images of every recipe in `recipe_ids`, oldest first.
pub async fn list_for_recipes(db: &PgPool, recipe_ids: &[Uuid]) -> Result<Vec<Image>, sqlx::Error> {
    if recipe_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, Image>(
        r#"
        SELECT id, recipe_id, image_url, created_at
          FROM images
         WHERE recipe_id = ANY($1)
         ORDER BY created_at ASC
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await
}

pub async fn list_for_recipe(db: &PgPool, recipe_id: Uuid) -> Result<Vec<Image>, sqlx::Error> {
    list_for_recipes(db, &[recipe_id]).await
}

/// Swaps the recipe's images for a single new one inside one transaction.
/// Returns the new row and the URLs of the rows it replaced.
pub async fn replace_for_recipe(
    db: &PgPool,
    recipe_id: Uuid,
    image_url: &str,
) -> Result<(Image, Vec<String>), sqlx::Error> {
    let mut tx = db.begin().await?;
    let old = delete_for_recipe_tx(&mut tx, recipe_id).await?;
    let image = sqlx::query_as::<_, Image>(
        r#"
        INSERT INTO images (recipe_id, image_url)
        VALUES ($1, $2)
        RETURNING id, recipe_id, image_url, created_at
        "#,
    )
    .bind(recipe_id)
    .bind(image_url)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok((image, old))
}

async fn delete_for_recipe_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: Uuid,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"DELETE FROM images WHERE recipe_id = $1 RETURNING image_url"#,
    )
    .bind(recipe_id)
    .fetch_all(&mut **tx)
    .await
}
