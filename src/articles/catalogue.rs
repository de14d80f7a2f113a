//! Editorial articles bundled with the binary.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct Catalogue {
    pub categories: Vec<Category>,
    pub articles: Vec<Article>,
}

lazy_static! {
    static ref CATALOGUE: Catalogue =
        serde_json::from_str(include_str!("../../data/articles.json")).expect("articles.json is valid");
}

impl Catalogue {
    pub fn bundled() -> &'static Catalogue {
        &CATALOGUE
    }

    /// All articles, or only those in `category` when given.
    pub fn articles(&self, category: Option<&str>) -> Vec<&Article> {
        match category.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) => self.articles.iter().filter(|a| a.category == c).collect(),
            None => self.articles.iter().collect(),
        }
    }

    pub fn article(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_catalogue_is_consistent() {
        let c = Catalogue::bundled();
        assert_eq!(c.categories.len(), 7);
        assert!(!c.articles.is_empty());
        for a in &c.articles {
            assert!(
                c.categories.iter().any(|cat| cat.id == a.category),
                "{} has unknown category {}",
                a.id,
                a.category
            );
        }
    }

    #[test]
    fn filter_by_category() {
        let c = Catalogue::bundled();
        let tips = c.articles(Some("tips"));
        assert!(!tips.is_empty());
        assert!(tips.iter().all(|a| a.category == "tips"));
        assert_eq!(c.articles(Some("")).len(), c.articles.len());
        assert_eq!(c.articles(None).len(), c.articles.len());
        assert!(c.articles(Some("desserts")).is_empty());
    }

    #[test]
    fn lookup_by_id() {
        let c = Catalogue::bundled();
        assert_eq!(c.article("tip-1").map(|a| a.category.as_str()), Some("tips"));
        assert!(c.article("nope").is_none());
    }
}
