use std::collections::HashMap;

use tracing::info;
use uuid::Uuid;

use super::dto::{ItemPatch, NewItem, ShoppingListView};
use super::repo::{self, ShoppingList, ShoppingListItem};
use crate::error::{AppError, RemoteContext};
use crate::guard::{self, Resource};
use crate::recipes::{dto::ingredient_lines, repo as recipes_repo};
use crate::session::Session;
use crate::state::AppState;

/// One unchecked item per non-blank ingredient line, quantity left empty.
pub fn items_from_ingredients(text: &str, recipe_id: Option<Uuid>) -> Vec<NewItem> {
    ingredient_lines(text)
        .into_iter()
        .map(|ingredient| NewItem {
            ingredient,
            quantity: String::new(),
            recipe_id,
        })
        .collect()
}

fn clean_items(items: Vec<NewItem>) -> Result<Vec<NewItem>, AppError> {
    if items.is_empty() {
        return Err(AppError::validation("At least one item is required"));
    }
    items
        .into_iter()
        .map(|item| {
            let ingredient = item.ingredient.trim().to_string();
            if ingredient.is_empty() {
                return Err(AppError::validation("Ingredient is required"));
            }
            Ok(NewItem {
                ingredient,
                quantity: item.quantity.trim().to_string(),
                recipe_id: item.recipe_id,
            })
        })
        .collect()
}

fn clean_patch(patch: ItemPatch) -> Result<ItemPatch, AppError> {
    if patch.is_empty() {
        return Err(AppError::validation("Nothing to update"));
    }
    let ingredient = match patch.ingredient.map(|i| i.trim().to_string()) {
        Some(i) if i.is_empty() => return Err(AppError::validation("Ingredient is required")),
        other => other,
    };
    Ok(ItemPatch {
        checked: patch.checked,
        quantity: patch.quantity.map(|q| q.trim().to_string()),
        ingredient,
    })
}

/// Caller's lists, newest first, each with its items in insertion order.
pub async fn list_shopping_lists(st: &AppState, session: &Session) -> Result<Vec<ShoppingListView>, AppError> {
    let user_id = session.require()?;
    let lists = repo::lists_for_user(&st.db, user_id)
        .await
        .remote_ctx("Failed to load shopping lists")?;
    let ids: Vec<Uuid> = lists.iter().map(|l| l.id).collect();
    let items = repo::items_for_lists(&st.db, &ids)
        .await
        .remote_ctx("Failed to load shopping list items")?;

    let mut by_list: HashMap<Uuid, Vec<ShoppingListItem>> = HashMap::new();
    for item in items {
        by_list.entry(item.shopping_list_id).or_default().push(item);
    }
    Ok(lists
        .into_iter()
        .map(|list| ShoppingListView {
            items: by_list.remove(&list.id).unwrap_or_default(),
            list,
        })
        .collect())
}

pub async fn create_list(st: &AppState, session: &Session, name: &str) -> Result<ShoppingList, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("List name is required"));
    }
    let user_id = session.require()?;
    let list = repo::create_list(&st.db, user_id, name)
        .await
        .remote_ctx("Failed to create shopping list")?;
    info!(%user_id, list_id = %list.id, "shopping list created");
    Ok(list)
}

pub async fn delete_list(st: &AppState, session: &Session, list_id: Uuid) -> Result<(), AppError> {
    guard::authorize(st, session, Resource::ShoppingList, list_id).await?;
    let removed = repo::delete_list(&st.db, list_id)
        .await
        .remote_ctx("Failed to delete shopping list")?;
    if removed == 0 {
        return Err(AppError::not_found("Shopping list not found"));
    }
    Ok(())
}

pub async fn add_items(
    st: &AppState,
    session: &Session,
    list_id: Uuid,
    items: Vec<NewItem>,
) -> Result<Vec<ShoppingListItem>, AppError> {
    let items = clean_items(items)?;
    guard::authorize(st, session, Resource::ShoppingList, list_id).await?;
    repo::insert_items(&st.db, list_id, &items)
        .await
        .remote_ctx("Failed to add shopping list items")
}

/// Appends one item per ingredient line. Calling this twice adds the lines
/// twice.
pub async fn add_ingredients_to_list(
    st: &AppState,
    session: &Session,
    list_id: Uuid,
    recipe_id: Option<Uuid>,
    ingredients: &str,
) -> Result<Vec<ShoppingListItem>, AppError> {
    let user_id = guard::authorize(st, session, Resource::ShoppingList, list_id).await?;
    let items = items_from_ingredients(ingredients, recipe_id);
    let inserted = repo::insert_items(&st.db, list_id, &items)
        .await
        .remote_ctx("Failed to add ingredients to shopping list")?;
    info!(%user_id, %list_id, ?recipe_id, added = inserted.len(), "ingredients added to list");
    Ok(inserted)
}

pub async fn add_recipe_to_list(
    st: &AppState,
    session: &Session,
    list_id: Uuid,
    recipe_id: Uuid,
) -> Result<Vec<ShoppingListItem>, AppError> {
    guard::authorize(st, session, Resource::ShoppingList, list_id).await?;
    let ingredients = recipes_repo::ingredients_of(&st.db, recipe_id)
        .await
        .remote_ctx("Failed to load recipe")?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;
    add_ingredients_to_list(st, session, list_id, Some(recipe_id), &ingredients).await
}

pub async fn update_item(
    st: &AppState,
    session: &Session,
    item_id: Uuid,
    patch: ItemPatch,
) -> Result<ShoppingListItem, AppError> {
    let patch = clean_patch(patch)?;
    guard::authorize(st, session, Resource::ShoppingListItem, item_id).await?;
    repo::update_item(&st.db, item_id, &patch)
        .await
        .remote_ctx("Failed to update shopping list item")?
        .ok_or_else(|| AppError::not_found("Shopping list item not found"))
}

pub async fn delete_item(st: &AppState, session: &Session, item_id: Uuid) -> Result<(), AppError> {
    guard::authorize(st, session, Resource::ShoppingListItem, item_id).await?;
    let removed = repo::delete_item(&st.db, item_id)
        .await
        .remote_ctx("Failed to delete shopping list item")?;
    if removed == 0 {
        return Err(AppError::not_found("Shopping list item not found"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_lines_become_unchecked_items() {
        let recipe = Uuid::new_v4();
        let items = items_from_ingredients("1 cup flour\n2 eggs", Some(recipe));
        assert_eq!(
            items,
            vec![
                NewItem {
                    ingredient: "1 cup flour".into(),
                    quantity: String::new(),
                    recipe_id: Some(recipe),
                },
                NewItem {
                    ingredient: "2 eggs".into(),
                    quantity: String::new(),
                    recipe_id: Some(recipe),
                },
            ]
        );
    }

    #[test]
    fn blank_lines_are_skipped() {
        let items = items_from_ingredients("\n  butter  \n\n\t\nsugar\n", None);
        let names: Vec<_> = items.iter().map(|i| i.ingredient.as_str()).collect();
        assert_eq!(names, ["butter", "sugar"]);
        assert!(items_from_ingredients("", None).is_empty());
    }

    #[test]
    fn manual_items_are_validated() {
        assert!(clean_items(vec![]).is_err());
        let err = clean_items(vec![NewItem {
            ingredient: "  ".into(),
            quantity: "2".into(),
            recipe_id: None,
        }])
        .unwrap_err();
        assert_eq!(err.to_string(), "Ingredient is required");

        let ok = clean_items(vec![NewItem {
            ingredient: " milk ".into(),
            quantity: " 1 l ".into(),
            recipe_id: None,
        }])
        .unwrap();
        assert_eq!(ok[0].ingredient, "milk");
        assert_eq!(ok[0].quantity, "1 l");
    }

    #[test]
    fn patches_need_a_field() {
        assert!(clean_patch(ItemPatch::default()).is_err());
        assert!(clean_patch(ItemPatch {
            ingredient: Some(" ".into()),
            ..Default::default()
        })
        .is_err());
        let patch = clean_patch(ItemPatch {
            checked: Some(true),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(patch.checked, Some(true));
    }

    #[tokio::test]
    async fn blank_list_name_is_rejected() {
        let st = AppState::fake();
        let err = create_list(&st, &Session::authenticated(Uuid::new_v4()), "   ")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "List name is required");
    }

    #[tokio::test]
    async fn anonymous_callers_cannot_touch_lists() {
        let st = AppState::fake();
        let anon = Session::anonymous();
        let id = Uuid::new_v4();

        let err = list_shopping_lists(&st, &anon).await.unwrap_err();
        assert!(matches!(err, AppError::AuthRequired { .. }));
        let err = add_ingredients_to_list(&st, &anon, id, None, "salt").await.unwrap_err();
        assert!(matches!(err, AppError::AuthRequired { .. }));
        let err = add_recipe_to_list(&st, &anon, id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::AuthRequired { .. }));
        let err = delete_item(&st, &anon, id).await.unwrap_err();
        assert!(matches!(err, AppError::AuthRequired { .. }));
    }

    mod db {
        use super::*;
        use crate::testing::{db_state, seed_recipe, seed_user};

        #[tokio::test]
        async fn recipe_lines_are_added_in_order_and_twice_on_repeat() {
            let st = db_state().await;
            let owner = seed_user(&st, "cook@example.com").await;
            let session = Session::authenticated(owner);
            let recipe = seed_recipe(&st, owner, "Pancakes", None).await;
            let list = create_list(&st, &session, "Weekend").await.unwrap();

            let added = add_recipe_to_list(&st, &session, list.id, recipe).await.unwrap();
            let names: Vec<_> = added.iter().map(|i| i.ingredient.as_str()).collect();
            assert_eq!(names, ["2 eggs", "100 g flour", "milk"]);
            for item in &added {
                assert!(!item.checked);
                assert_eq!(item.quantity, "");
                assert_eq!(item.recipe_id, Some(recipe));
                assert_eq!(item.recipe_title.as_deref(), Some("Pancakes"));
            }

            add_recipe_to_list(&st, &session, list.id, recipe).await.unwrap();
            let lists = list_shopping_lists(&st, &session).await.unwrap();
            let names: Vec<_> = lists[0].items.iter().map(|i| i.ingredient.as_str()).collect();
            assert_eq!(
                names,
                ["2 eggs", "100 g flour", "milk", "2 eggs", "100 g flour", "milk"]
            );
        }

        #[tokio::test]
        async fn foreign_list_is_refused_before_the_recipe_is_looked_up() {
            let st = db_state().await;
            let owner = seed_user(&st, "owner@example.com").await;
            let intruder = seed_user(&st, "intruder@example.com").await;
            let list = create_list(&st, &Session::authenticated(owner), "Mine")
                .await
                .unwrap();

            // the recipe does not exist; the ownership check must answer first
            let err = add_recipe_to_list(&st, &Session::authenticated(intruder), list.id, Uuid::new_v4())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::PermissionDenied { .. }));

            let lists = list_shopping_lists(&st, &Session::authenticated(owner)).await.unwrap();
            assert!(lists[0].items.is_empty());
        }

        #[tokio::test]
        async fn missing_recipe_on_own_list_is_not_found() {
            let st = db_state().await;
            let owner = seed_user(&st, "cook@example.com").await;
            let session = Session::authenticated(owner);
            let list = create_list(&st, &session, "Mine").await.unwrap();

            let err = add_recipe_to_list(&st, &session, list.id, Uuid::new_v4())
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound { .. }));
        }
    }
}
