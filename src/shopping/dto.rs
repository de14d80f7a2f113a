use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo::{ShoppingList, ShoppingListItem};

#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    pub name: String,
}

/// One item to append to a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewItem {
    pub ingredient: String,
    #[serde(default)]
    pub quantity: String,
    #[serde(default)]
    pub recipe_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddItemsRequest {
    pub items: Vec<NewItem>,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Default, Deserialize)]
pub struct ItemPatch {
    pub checked: Option<bool>,
    pub quantity: Option<String>,
    pub ingredient: Option<String>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        self.checked.is_none() && self.quantity.is_none() && self.ingredient.is_none()
    }
}

#[derive(Debug, Serialize)]
pub struct ShoppingListView {
    #[serde(flatten)]
    pub list: ShoppingList,
    pub items: Vec<ShoppingListItem>,
}
