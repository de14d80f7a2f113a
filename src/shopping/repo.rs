use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::{ItemPatch, NewItem};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ShoppingList {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ShoppingListItem {
    pub id: Uuid,
    pub shopping_list_id: Uuid,
    pub recipe_id: Option<Uuid>,
    /// Title of the source recipe, while it still exists.
    pub recipe_title: Option<String>,
    pub ingredient: String,
    pub quantity: String,
    pub checked: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const ITEM_SELECT: &str = r#"
    SELECT i.id, i.shopping_list_id, i.recipe_id, r.title AS recipe_title,
           i.ingredient, i.quantity, i.checked, i.created_at
"#;

pub async fn lists_for_user(db: &PgPool, user_id: Uuid) -> Result<Vec<ShoppingList>, sqlx::Error> {
    sqlx::query_as::<_, ShoppingList>(
        r#"
        SELECT id, user_id, name, created_at
          FROM shopping_lists
         WHERE user_id = $1
         ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
}

pub async fn items_for_lists(
    db: &PgPool,
    list_ids: &[Uuid],
) -> Result<Vec<ShoppingListItem>, sqlx::Error> {
    if list_ids.is_empty() {
        return Ok(Vec::new());
    }
    sqlx::query_as::<_, ShoppingListItem>(&format!(
        r#"{ITEM_SELECT}
          FROM shopping_list_items i
          LEFT JOIN recipes r ON r.id = i.recipe_id
         WHERE i.shopping_list_id = ANY($1)
         ORDER BY i.position
        "#
    ))
    .bind(list_ids)
    .fetch_all(db)
    .await
}

pub async fn create_list(db: &PgPool, user_id: Uuid, name: &str) -> Result<ShoppingList, sqlx::Error> {
    sqlx::query_as::<_, ShoppingList>(
        r#"
        INSERT INTO shopping_lists (user_id, name)
        VALUES ($1, $2)
        RETURNING id, user_id, name, created_at
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(db)
    .await
}

pub async fn delete_list(db: &PgPool, list_id: Uuid) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(r#"DELETE FROM shopping_lists WHERE id = $1"#)
        .bind(list_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}

/// Multi-row insert of `items` into `list_id`. `items` must not be empty.
pub fn insert_items_query(list_id: Uuid, items: &[NewItem]) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(
        "WITH inserted AS (INSERT INTO shopping_list_items (shopping_list_id, recipe_id, ingredient, quantity) ",
    );
    qb.push_values(items.iter().cloned(), |mut row, item| {
        row.push_bind(list_id)
            .push_bind(item.recipe_id)
            .push_bind(item.ingredient)
            .push_bind(item.quantity);
    });
    qb.push(" RETURNING *)");
    qb.push(ITEM_SELECT);
    qb.push(
        " FROM inserted i LEFT JOIN recipes r ON r.id = i.recipe_id ORDER BY i.position",
    );
    qb
}

pub async fn insert_items(
    db: &PgPool,
    list_id: Uuid,
    items: &[NewItem],
) -> Result<Vec<ShoppingListItem>, sqlx::Error> {
    if items.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb = insert_items_query(list_id, items);
    let rows = qb.build_query_as::<ShoppingListItem>().fetch_all(db).await?;
    Ok(rows)
}

pub async fn update_item(
    db: &PgPool,
    item_id: Uuid,
    patch: &ItemPatch,
) -> Result<Option<ShoppingListItem>, sqlx::Error> {
    sqlx::query_as::<_, ShoppingListItem>(&format!(
        r#"
        WITH updated AS (
            UPDATE shopping_list_items
               SET checked = COALESCE($2, checked),
                   quantity = COALESCE($3, quantity),
                   ingredient = COALESCE($4, ingredient)
             WHERE id = $1
         RETURNING *
        )
        {ITEM_SELECT}
          FROM updated i
          LEFT JOIN recipes r ON r.id = i.recipe_id
        "#
    ))
    .bind(item_id)
    .bind(patch.checked)
    .bind(patch.quantity.as_deref())
    .bind(patch.ingredient.as_deref())
    .fetch_optional(db)
    .await
}

pub async fn delete_item(db: &PgPool, item_id: Uuid) -> Result<u64, sqlx::Error> {
    let res = sqlx::query(r#"DELETE FROM shopping_list_items WHERE id = $1"#)
        .bind(item_id)
        .execute(db)
        .await?;
    Ok(res.rows_affected())
}
