//! Translation of list filters into SQL.

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::config::PagingConfig;
use crate::error::AppError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Newest first
    #[default]
    CreatedAt,
    /// Most viewed first
    Views,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListParams {
    pub search: Option<String>,
    pub diet_type: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
    /// 1-based
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeQuery {
    pub search: Option<String>,
    pub diet_type: Option<String>,
    pub owner: Option<Uuid>,
    pub sort: SortKey,
    pub page: i64,
    pub page_size: i64,
}

const RECIPE_COLUMNS: &str = r#"
    SELECT r.id, r.user_id, u.email AS owner_email, r.title, r.ingredients, r.steps,
           r.diet_type, r.cooking_time, r.views, r.created_at, r.updated_at
      FROM recipes r
      JOIN users u ON u.id = r.user_id
"#;

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Escapes LIKE wildcards so user input only ever matches literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn total_pages(count: i64, page_size: i64) -> i64 {
    if count <= 0 || page_size <= 0 {
        return 0;
    }
    (count + page_size - 1) / page_size
}

impl RecipeQuery {
    pub fn from_params(params: RecipeListParams, paging: &PagingConfig) -> Result<Self, AppError> {
        let page = params.page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::validation("page must be 1 or greater"));
        }
        let page_size = params
            .page_size
            .unwrap_or(paging.default_page_size)
            .clamp(1, paging.max_page_size.max(1));

        Ok(Self {
            search: non_blank(params.search),
            diet_type: non_blank(params.diet_type),
            owner: None,
            sort: params.sort,
            page,
            page_size,
        })
    }

    pub fn owned_by(mut self, user_id: Uuid) -> Self {
        self.owner = Some(user_id);
        self
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.page_size
    }

    /// True when `page` lies past the last page for `count` matches.
    pub fn is_past_end(&self, count: i64) -> bool {
        self.page > total_pages(count, self.page_size)
    }

    fn push_filters(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" WHERE TRUE");
        if let Some(owner) = self.owner {
            qb.push(" AND r.user_id = ").push_bind(owner);
        }
        if let Some(term) = &self.search {
            let pattern = format!("%{}%", escape_like(term));
            qb.push(" AND (r.title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR r.ingredients ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(diet) = &self.diet_type {
            qb.push(" AND r.diet_type = ").push_bind(diet.clone());
        }
    }

    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM recipes r");
        self.push_filters(&mut qb);
        qb
    }

    pub fn page_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(RECIPE_COLUMNS);
        self.push_filters(&mut qb);
        match self.sort {
            SortKey::CreatedAt => qb.push(" ORDER BY r.created_at DESC, r.id"),
            SortKey::Views => qb.push(" ORDER BY r.views DESC, r.created_at DESC, r.id"),
        };
        qb.push(" LIMIT ")
            .push_bind(self.page_size)
            .push(" OFFSET ")
            .push_bind(self.offset());
        qb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(params: RecipeListParams) -> RecipeQuery {
        RecipeQuery::from_params(params, &PagingConfig::default()).unwrap()
    }

    #[test]
    fn defaults_to_first_page_newest_first() {
        let q = query(RecipeListParams::default());
        assert_eq!(q.page, 1);
        assert_eq!(q.page_size, 10);
        assert_eq!(q.offset(), 0);
        assert_eq!(q.sort, SortKey::CreatedAt);
        assert!(q.page_query().sql().contains("ORDER BY r.created_at DESC"));
    }

    #[test]
    fn blank_filters_match_everything() {
        let q = query(RecipeListParams {
            search: Some("   ".into()),
            diet_type: Some(String::new()),
            ..Default::default()
        });
        assert_eq!(q.search, None);
        assert_eq!(q.diet_type, None);
        assert_eq!(q.count_query().sql(), "SELECT COUNT(*) FROM recipes r WHERE TRUE");
    }

    #[test]
    fn search_and_diet_become_bound_filters() {
        let q = query(RecipeListParams {
            search: Some(" Flour ".into()),
            diet_type: Some("vegan".into()),
            sort: SortKey::Views,
            page: Some(3),
            page_size: Some(5),
        });
        assert_eq!(q.search.as_deref(), Some("Flour"));
        assert_eq!(q.offset(), 10);

        let sql = q.page_query().sql().to_string();
        assert!(sql.contains("r.title ILIKE $1 OR r.ingredients ILIKE $2"));
        assert!(sql.contains("r.diet_type = $3"));
        assert!(sql.contains("ORDER BY r.views DESC"));
        assert!(sql.ends_with("LIMIT $4 OFFSET $5"));
    }

    #[test]
    fn owner_filter_comes_first() {
        let q = query(RecipeListParams::default()).owned_by(Uuid::new_v4());
        assert!(q.count_query().sql().contains("r.user_id = $1"));
    }

    #[test]
    fn page_size_is_clamped_and_page_zero_rejected() {
        let q = query(RecipeListParams {
            page_size: Some(500),
            ..Default::default()
        });
        assert_eq!(q.page_size, 50);
        let q = query(RecipeListParams {
            page_size: Some(0),
            ..Default::default()
        });
        assert_eq!(q.page_size, 1);

        let err = RecipeQuery::from_params(
            RecipeListParams {
                page: Some(0),
                ..Default::default()
            },
            &PagingConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn pages_past_the_end_are_detected() {
        let q = query(RecipeListParams {
            page: Some(3),
            page_size: Some(10),
            ..Default::default()
        });
        assert!(!q.is_past_end(21));
        assert!(q.is_past_end(20));
        assert!(q.is_past_end(0));
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("eggs"), "eggs");
    }
}
