//! Reducers over already-fetched result sets.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RatingSummary {
    /// Mean rating rounded to one decimal; `None` when unrated.
    pub average: Option<f64>,
    pub count: i64,
}

pub fn rating_summary(ratings: &[i16]) -> RatingSummary {
    if ratings.is_empty() {
        return RatingSummary::default();
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    let mean = sum as f64 / ratings.len() as f64;
    RatingSummary {
        average: Some((mean * 10.0).round() / 10.0),
        count: ratings.len() as i64,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewedRecipe {
    pub id: Uuid,
    pub title: String,
    pub views: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileStats {
    pub total_recipes: i64,
    pub total_views: i64,
    pub most_viewed: Option<ViewedRecipe>,
}

/// On equal view counts the later recipe wins.
pub fn profile_stats(recipes: &[ViewedRecipe]) -> ProfileStats {
    let most_viewed = recipes
        .iter()
        .fold(None::<&ViewedRecipe>, |best, cur| match best {
            Some(b) if b.views > cur.views => Some(b),
            _ => Some(cur),
        })
        .cloned();

    ProfileStats {
        total_recipes: recipes.len() as i64,
        total_views: recipes.iter().map(|r| r.views.max(0)).sum(),
        most_viewed,
    }
}
