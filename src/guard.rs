use tracing::warn;
use uuid::Uuid;

use crate::error::{AppError, RemoteContext};
use crate::session::Session;
use crate::state::AppState;

/// Rows whose mutation is restricted to their owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Recipe,
    Rating,
    ShoppingList,
    ShoppingListItem,
}

impl Resource {
    fn owner_sql(self) -> &'static str {
        match self {
            Resource::Recipe => "SELECT user_id FROM recipes WHERE id = $1",
            Resource::Rating => "SELECT user_id FROM ratings WHERE id = $1",
            Resource::ShoppingList => "SELECT user_id FROM shopping_lists WHERE id = $1",
            Resource::ShoppingListItem => {
                r#"SELECT l.user_id
                     FROM shopping_list_items i
                     JOIN shopping_lists l ON l.id = i.shopping_list_id
                    WHERE i.id = $1"#
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Resource::Recipe => "recipe",
            Resource::Rating => "rating",
            Resource::ShoppingList => "shopping list",
            Resource::ShoppingListItem => "shopping list item",
        }
    }
}

/// `owner` is `None` when the row does not exist; that is reported the same
/// way as a foreign row.
pub fn ensure_owner(user_id: Uuid, owner: Option<Uuid>, resource: Resource) -> Result<(), AppError> {
    match owner {
        Some(owner) if owner == user_id => Ok(()),
        _ => Err(AppError::permission_denied(format!(
            "You do not have permission to modify this {}",
            resource.label()
        ))),
    }
}

/// Checks that the session's user owns `id` before a mutation is attempted.
/// Returns the acting user id.
pub async fn authorize(
    st: &AppState,
    session: &Session,
    resource: Resource,
    id: Uuid,
) -> Result<Uuid, AppError> {
    let user_id = session.require()?;
    let owner = sqlx::query_scalar::<_, Uuid>(resource.owner_sql())
        .bind(id)
        .fetch_optional(&st.db)
        .await
        .remote_ctx("Failed to verify ownership")?;
    ensure_owner(user_id, owner, resource).inspect_err(|_| {
        warn!(%user_id, resource = resource.label(), %id, ?owner, "ownership check failed");
    })?;
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_passes() {
        let me = Uuid::new_v4();
        assert!(ensure_owner(me, Some(me), Resource::Recipe).is_ok());
    }

    #[test]
    fn foreign_or_missing_rows_are_denied() {
        let me = Uuid::new_v4();
        let err = ensure_owner(me, Some(Uuid::new_v4()), Resource::Recipe).unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied { .. }));
        assert_eq!(err.to_string(), "You do not have permission to modify this recipe");

        let err = ensure_owner(me, None, Resource::Rating).unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn anonymous_callers_never_reach_the_store() {
        // a database round-trip would surface as RemoteData
        let state = AppState::fake();
        let err = authorize(&state, &Session::anonymous(), Resource::Recipe, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AuthRequired { .. }));
    }
}
