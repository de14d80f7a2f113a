use std::collections::HashMap;

use tracing::{info, warn};
use uuid::Uuid;

use super::dto::{
    ImageView, RecipeCard, RecipeDetails, RecipeForm, RecipeInput, RecipePage, SavedRecipe,
};
use super::query::{total_pages, RecipeQuery};
use super::repo::{self, RecipeRow};
use crate::aggregate::{self, rating_summary, ProfileStats};
use crate::error::{AppError, RemoteContext};
use crate::guard::{self, Resource};
use crate::images::repo::{self as images_repo, Image};
use crate::images::services::{
    normalize_image_url, remove_objects_best_effort, upload_recipe_image, validate_upload,
    UploadItem,
};
use crate::nutrition::services as nutrition;
use crate::ratings::repo as ratings_repo;
use crate::saga::Saga;
use crate::session::Session;
use crate::state::AppState;

/// Joins page rows with their images and rating values. Row order is kept.
pub fn assemble_cards(
    public_base: &str,
    rows: Vec<RecipeRow>,
    images: Vec<Image>,
    ratings: Vec<(Uuid, i16)>,
) -> Vec<RecipeCard> {
    let mut images_by_recipe: HashMap<Uuid, Vec<ImageView>> = HashMap::new();
    for img in images {
        images_by_recipe.entry(img.recipe_id).or_default().push(ImageView {
            id: img.id,
            image_url: normalize_image_url(public_base, &img.image_url),
        });
    }
    let mut ratings_by_recipe: HashMap<Uuid, Vec<i16>> = HashMap::new();
    for (recipe_id, value) in ratings {
        ratings_by_recipe.entry(recipe_id).or_default().push(value);
    }

    rows.into_iter()
        .map(|row| {
            let rating = rating_summary(ratings_by_recipe.get(&row.id).map_or(&[][..], Vec::as_slice));
            RecipeCard {
                images: images_by_recipe.remove(&row.id).unwrap_or_default(),
                rating,
                id: row.id,
                user_id: row.user_id,
                owner_email: row.owner_email,
                title: row.title,
                ingredients: row.ingredients,
                steps: row.steps,
                diet_type: row.diet_type,
                cooking_time: row.cooking_time,
                views: row.views,
                created_at: row.created_at,
                updated_at: row.updated_at,
            }
        })
        .collect()
}

async fn cards(st: &AppState, rows: Vec<RecipeRow>) -> Result<Vec<RecipeCard>, AppError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let (images, ratings) = tokio::try_join!(
        images_repo::list_for_recipes(&st.db, &ids),
        ratings_repo::values_for_recipes(&st.db, &ids),
    )
    .remote_ctx("Failed to load recipe images and ratings")?;
    Ok(assemble_cards(&st.config.storage.public_url, rows, images, ratings))
}

/// One page of recipes matching `q`. A page past the end is empty, not an error.
pub async fn list_recipes(st: &AppState, q: RecipeQuery) -> Result<RecipePage, AppError> {
    let count = repo::count(&st.db, &q)
        .await
        .remote_ctx("Failed to count recipes")?;
    let rows = if q.is_past_end(count) {
        Vec::new()
    } else {
        repo::fetch_page(&st.db, &q)
            .await
            .remote_ctx("Failed to fetch recipes")?
    };

    Ok(RecipePage {
        recipes: cards(st, rows).await?,
        count,
        page: q.page,
        page_size: q.page_size,
        total_pages: total_pages(count, q.page_size),
    })
}

pub async fn my_recipes(st: &AppState, session: &Session, q: RecipeQuery) -> Result<RecipePage, AppError> {
    let user_id = session.require()?;
    list_recipes(st, q.owned_by(user_id)).await
}

/// Recipe detail page; counts as a view.
pub async fn get_recipe(st: &AppState, session: &Session, recipe_id: Uuid) -> Result<RecipeDetails, AppError> {
    let row = repo::get_counting_view(&st.db, recipe_id)
        .await
        .remote_ctx("Failed to load recipe")?
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;

    let (mut cards, nutrition) = tokio::try_join!(
        cards(st, vec![row]),
        nutrition::get_nutrition(st, recipe_id)
    )?;
    let recipe = cards
        .pop()
        .ok_or_else(|| AppError::not_found("Recipe not found"))?;

    Ok(RecipeDetails {
        is_owner: session.user_id() == Some(recipe.user_id),
        recipe,
        nutrition,
    })
}

pub async fn create_recipe(
    st: &AppState,
    session: &Session,
    form: RecipeForm,
    image: Option<UploadItem>,
) -> Result<SavedRecipe, AppError> {
    let input = form.validate()?;
    if let Some(item) = &image {
        validate_upload(item)?;
    }
    let user_id = session.require()?;

    let mut saga = Saga::new();
    match create_steps(st, user_id, &input, image, &mut saga).await {
        Ok(saved) => {
            saga.commit();
            info!(%user_id, recipe_id = %saved.id, "recipe created");
            Ok(saved)
        }
        Err(e) => {
            warn!(%user_id, error = %e, "recipe creation failed, rolling back");
            saga.compensate().await;
            Err(e)
        }
    }
}

async fn create_steps(
    st: &AppState,
    user_id: Uuid,
    input: &RecipeInput,
    image: Option<UploadItem>,
    saga: &mut Saga,
) -> Result<SavedRecipe, AppError> {
    let recipe_id = repo::insert(&st.db, user_id, input)
        .await
        .remote_ctx("Failed to create recipe")?;
    let db = st.db.clone();
    saga.on_failure("delete recipe row", async move {
        repo::delete(&db, recipe_id).await?;
        Ok(())
    });

    let Some(item) = image else {
        return Ok(SavedRecipe {
            id: recipe_id,
            image_url: None,
        });
    };

    let stored = upload_recipe_image(st, user_id, recipe_id, item).await?;
    let storage = st.storage.clone();
    let key = stored.key.clone();
    saga.on_failure("delete uploaded object", async move {
        storage.delete_object(&key).await
    });

    images_repo::insert_image(&st.db, recipe_id, &stored.url)
        .await
        .remote_ctx("Failed to save image record")?;

    Ok(SavedRecipe {
        id: recipe_id,
        image_url: Some(stored.url),
    })
}

pub async fn update_recipe(
    st: &AppState,
    session: &Session,
    recipe_id: Uuid,
    form: RecipeForm,
    image: Option<UploadItem>,
) -> Result<SavedRecipe, AppError> {
    let input = form.validate()?;
    if let Some(item) = &image {
        validate_upload(item)?;
    }
    let user_id = guard::authorize(st, session, Resource::Recipe, recipe_id).await?;

    let mut saga = Saga::new();
    let (saved, replaced) = match update_steps(st, user_id, recipe_id, &input, image, &mut saga).await {
        Ok(done) => {
            saga.commit();
            done
        }
        Err(e) => {
            warn!(%user_id, %recipe_id, error = %e, "recipe update failed, rolling back");
            saga.compensate().await;
            return Err(e);
        }
    };

    remove_objects_best_effort(st, &replaced).await;
    info!(%user_id, %recipe_id, "recipe updated");
    Ok(saved)
}

/// Returns the saved recipe and the URLs of images it no longer uses.
async fn update_steps(
    st: &AppState,
    user_id: Uuid,
    recipe_id: Uuid,
    input: &RecipeInput,
    image: Option<UploadItem>,
    saga: &mut Saga,
) -> Result<(SavedRecipe, Vec<String>), AppError> {
    let stored = match image {
        Some(item) => {
            let stored = upload_recipe_image(st, user_id, recipe_id, item).await?;
            let storage = st.storage.clone();
            let key = stored.key.clone();
            saga.on_failure("delete new object", async move {
                storage.delete_object(&key).await
            });
            Some(stored)
        }
        None => None,
    };

    let updated = repo::update(&st.db, recipe_id, input)
        .await
        .remote_ctx("Failed to update recipe")?;
    if updated == 0 {
        return Err(AppError::not_found("Recipe not found"));
    }

    let Some(stored) = stored else {
        return Ok((
            SavedRecipe {
                id: recipe_id,
                image_url: None,
            },
            Vec::new(),
        ));
    };
    let (_, replaced) = images_repo::replace_for_recipe(&st.db, recipe_id, &stored.url)
        .await
        .remote_ctx("Failed to save image record")?;
    Ok((
        SavedRecipe {
            id: recipe_id,
            image_url: Some(stored.url),
        },
        replaced,
    ))
}

pub async fn delete_recipe(st: &AppState, session: &Session, recipe_id: Uuid) -> Result<(), AppError> {
    let user_id = guard::authorize(st, session, Resource::Recipe, recipe_id).await?;
    let urls: Vec<String> = images_repo::list_for_recipe(&st.db, recipe_id)
        .await
        .remote_ctx("Failed to load recipe images")?
        .into_iter()
        .map(|img| img.image_url)
        .collect();

    let removed = repo::delete(&st.db, recipe_id)
        .await
        .remote_ctx("Failed to delete recipe")?;
    if removed == 0 {
        return Err(AppError::not_found("Recipe not found"));
    }

    remove_objects_best_effort(st, &urls).await;
    info!(%user_id, %recipe_id, images = urls.len(), "recipe deleted");
    Ok(())
}

pub async fn profile_stats(st: &AppState, session: &Session) -> Result<ProfileStats, AppError> {
    let user_id = session.require()?;
    let recipes = repo::views_by_owner(&st.db, user_id)
        .await
        .remote_ctx("Failed to load profile statistics")?;
    Ok(aggregate::profile_stats(&recipes))
}
