use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::aggregate::RatingSummary;
use crate::error::AppError;
use crate::nutrition::dto::NutritionInfo;

pub const DIET_TYPES: [&str; 4] = ["vegetarian", "vegan", "non-vegetarian", "gluten-free"];

/// Splits newline-delimited ingredient text into trimmed, non-blank lines.
pub fn ingredient_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Recipe fields as submitted by the add/edit form.
#[derive(Debug, Clone, Default)]
pub struct RecipeForm {
    pub title: String,
    pub ingredients: String,
    pub steps: String,
    pub diet_type: Option<String>,
    pub cooking_time: Option<String>,
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeInput {
    pub title: String,
    pub ingredients: String,
    pub steps: String,
    pub diet_type: Option<String>,
    pub cooking_time: i32,
}

impl RecipeForm {
    pub fn validate(self) -> Result<RecipeInput, AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::validation("Title is required"));
        }
        if self.ingredients.trim().is_empty() {
            return Err(AppError::validation("Ingredients are required"));
        }
        if self.steps.trim().is_empty() {
            return Err(AppError::validation("Cooking steps are required"));
        }
        let cooking_time = self
            .cooking_time
            .as_deref()
            .map(str::trim)
            .and_then(|v| v.parse::<i32>().ok())
            .filter(|&t| t > 0)
            .ok_or_else(|| AppError::validation("Please enter a valid cooking time"))?;

        let diet_type = self
            .diet_type
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty());
        if let Some(d) = &diet_type {
            if !DIET_TYPES.contains(&d.as_str()) {
                return Err(AppError::validation(format!("Unknown diet type: {d}")));
            }
        }

        Ok(RecipeInput {
            title: title.to_string(),
            ingredients: self.ingredients.trim().to_string(),
            steps: self.steps.trim().to_string(),
            diet_type,
            cooking_time,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageView {
    pub id: Uuid,
    pub image_url: String,
}

#[derive(Debug, Serialize)]
pub struct RecipeCard {
    pub id: Uuid,
    pub user_id: Uuid,
    pub owner_email: String,
    pub title: String,
    pub ingredients: String,
    pub steps: String,
    pub diet_type: Option<String>,
    pub cooking_time: i32,
    pub views: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub images: Vec<ImageView>,
    pub rating: RatingSummary,
}

#[derive(Debug, Serialize)]
pub struct RecipePage {
    pub recipes: Vec<RecipeCard>,
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetails {
    #[serde(flatten)]
    pub recipe: RecipeCard,
    pub nutrition: Option<NutritionInfo>,
    pub is_owner: bool,
}

#[derive(Debug, Serialize)]
pub struct SavedRecipe {
    pub id: Uuid,
    pub image_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> RecipeForm {
        RecipeForm {
            title: " Pancakes ".into(),
            ingredients: "1 cup flour\n2 eggs".into(),
            steps: "Mix\nFry".into(),
            diet_type: Some("Vegetarian".into()),
            cooking_time: Some("20".into()),
        }
    }

    #[test]
    fn ingredient_text_splits_into_lines() {
        assert_eq!(ingredient_lines("1 cup flour\n2 eggs"), vec!["1 cup flour", "2 eggs"]);
        assert_eq!(ingredient_lines("  salt \r\n\n \n pepper"), vec!["salt", "pepper"]);
        assert!(ingredient_lines("\n  \n").is_empty());
    }

    #[test]
    fn valid_form_is_normalised() {
        let input = form().validate().unwrap();
        assert_eq!(input.title, "Pancakes");
        assert_eq!(input.diet_type.as_deref(), Some("vegetarian"));
        assert_eq!(input.cooking_time, 20);
    }

    #[test]
    fn empty_diet_type_is_allowed() {
        let input = RecipeForm {
            diet_type: Some("  ".into()),
            ..form()
        }
        .validate()
        .unwrap();
        assert_eq!(input.diet_type, None);
    }

    #[test]
    fn invalid_forms_are_rejected() {
        let cases = [
            (RecipeForm { title: " ".into(), ..form() }, "Title is required"),
            (RecipeForm { ingredients: "\n".into(), ..form() }, "Ingredients are required"),
            (RecipeForm { steps: String::new(), ..form() }, "Cooking steps are required"),
            (
                RecipeForm { cooking_time: Some("0".into()), ..form() },
                "Please enter a valid cooking time",
            ),
            (
                RecipeForm { cooking_time: Some("soon".into()), ..form() },
                "Please enter a valid cooking time",
            ),
            (RecipeForm { cooking_time: None, ..form() }, "Please enter a valid cooking time"),
            (
                RecipeForm { diet_type: Some("keto".into()), ..form() },
                "Unknown diet type: keto",
            ),
        ];
        for (form, msg) in cases {
            assert_eq!(form.validate().unwrap_err().to_string(), msg);
        }
    }
}
