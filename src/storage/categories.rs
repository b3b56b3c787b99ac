//! Categories: named tags with unique, deterministically derived slugs.
//! Small cardinality is assumed; listings are unpaginated.

use anyhow::Result;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::slug::{is_valid_slug, slugify};

use super::{i64_at, new_id, now_ms, str_at, Store};

const TABLE: &str = "categories";

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Category {
    pub fn view(&self) -> CategoryView {
        CategoryView {
            id: self.id.clone(),
            name: self.name.clone(),
            slug: self.slug.clone(),
            created_at: ms_to_datetime(self.created_at),
            updated_at: ms_to_datetime(self.updated_at),
        }
    }

    /// Reference shape embedded in expanded posts.
    pub fn reference(&self) -> CategoryRef {
        CategoryRef { id: self.id.clone(), name: self.name.clone(), slug: self.slug.clone() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
    pub slug: String,
}

pub(crate) fn ms_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn empty_categories_df() -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Series::new("id".into(), Vec::<String>::new()).into(),
        Series::new("name".into(), Vec::<String>::new()).into(),
        Series::new("slug".into(), Vec::<String>::new()).into(),
        Series::new("created_at".into(), Vec::<i64>::new()).into(),
        Series::new("updated_at".into(), Vec::<i64>::new()).into(),
    ])?;
    Ok(df)
}

fn categories_df(cats: &[Category]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Series::new("id".into(), cats.iter().map(|c| c.id.clone()).collect::<Vec<_>>()).into(),
        Series::new("name".into(), cats.iter().map(|c| c.name.clone()).collect::<Vec<_>>()).into(),
        Series::new("slug".into(), cats.iter().map(|c| c.slug.clone()).collect::<Vec<_>>()).into(),
        Series::new("created_at".into(), cats.iter().map(|c| c.created_at).collect::<Vec<_>>()).into(),
        Series::new("updated_at".into(), cats.iter().map(|c| c.updated_at).collect::<Vec<_>>()).into(),
    ])?;
    Ok(df)
}

fn category_from_row(df: &DataFrame, i: usize) -> Result<Category> {
    Ok(Category {
        id: str_at(df, "id", i)?,
        name: str_at(df, "name", i)?,
        slug: str_at(df, "slug", i)?,
        created_at: i64_at(df, "created_at", i)?,
        updated_at: i64_at(df, "updated_at", i)?,
    })
}

impl Store {
    pub(crate) fn load_categories(&self) -> Result<Vec<Category>> {
        let df = self.read_table(TABLE, empty_categories_df)?;
        let mut out = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            out.push(category_from_row(&df, i)?);
        }
        Ok(out)
    }

    fn save_categories(&self, cats: &[Category]) -> Result<()> {
        self.write_table(TABLE, categories_df(cats)?)
    }

    /// All categories, newest first. No pagination.
    pub fn list_categories(&self) -> AppResult<Vec<Category>> {
        let mut cats = self.load_categories()?;
        // Reverse before the stable sort so timestamp ties list
        // newest-insertion-first.
        cats.reverse();
        cats.sort_by_key(|c| std::cmp::Reverse(c.created_at));
        Ok(cats)
    }

    /// Create a category, deriving the slug from the name when not supplied.
    /// Duplicate name or slug is a rejected write.
    pub fn create_category(&self, name: &str, slug: Option<&str>) -> AppResult<Category> {
        let name = name.trim();
        if name.len() < 3 {
            return Err(AppError::validation("invalid_name", "category name must be at least 3 characters"));
        }
        let slug = match slug {
            Some(s) => {
                let s = s.trim();
                if !is_valid_slug(s) {
                    return Err(AppError::validation("invalid_slug", "slug must be lowercase alphanumerics and hyphens"));
                }
                s.to_string()
            }
            None => slugify(name),
        };
        if slug.is_empty() {
            return Err(AppError::validation("invalid_name", "category name does not reduce to a usable slug"));
        }

        let mut cats = self.load_categories()?;
        if cats.iter().any(|c| c.name == name || c.slug == slug) {
            return Err(AppError::conflict("category_exists", "category already exists"));
        }
        let now = now_ms();
        let cat = Category {
            id: new_id(),
            name: name.to_string(),
            slug,
            created_at: now,
            updated_at: now,
        };
        cats.push(cat.clone());
        self.save_categories(&cats)?;
        Ok(cat)
    }

    pub fn get_category(&self, id: &str) -> AppResult<Option<Category>> {
        Ok(self.load_categories()?.into_iter().find(|c| c.id == id))
    }

    /// Resolve a category filter value: a direct id, a name, or a slug.
    /// No match resolves to None rather than an error.
    pub fn resolve_category(&self, ident: &str) -> AppResult<Option<Category>> {
        let cats = self.load_categories()?;
        Ok(cats
            .into_iter()
            .find(|c| c.id == ident || c.name == ident || c.slug == ident))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn slug_derived_from_name() {
        let tmp = tempdir().expect("tempdir");
        let store = Store::new(tmp.path()).expect("store");
        let c = store.create_category("Systems Programming", None).expect("create");
        assert_eq!(c.slug, "systems-programming");
    }

    #[test]
    fn explicit_slug_is_validated() {
        let tmp = tempdir().expect("tempdir");
        let store = Store::new(tmp.path()).expect("store");
        let ok = store.create_category("Tech News", Some("tech")).expect("create");
        assert_eq!(ok.slug, "tech");

        let bad = store.create_category("Other", Some("Not A Slug"));
        assert!(matches!(bad, Err(AppError::Validation { .. })));
    }

    #[test]
    fn duplicates_conflict() {
        let tmp = tempdir().expect("tempdir");
        let store = Store::new(tmp.path()).expect("store");
        store.create_category("Tech", None).expect("create");

        assert!(matches!(store.create_category("Tech", None), Err(AppError::Conflict { .. })));
        // Different name, same derived slug.
        assert!(matches!(store.create_category("tech!", None), Err(AppError::Conflict { .. })));
    }

    #[test]
    fn short_name_rejected() {
        let tmp = tempdir().expect("tempdir");
        let store = Store::new(tmp.path()).expect("store");
        assert!(matches!(store.create_category("ab", None), Err(AppError::Validation { .. })));
        assert!(matches!(store.create_category("!!!!", None), Err(AppError::Validation { .. })));
    }

    #[test]
    fn resolve_by_id_name_or_slug() {
        let tmp = tempdir().expect("tempdir");
        let store = Store::new(tmp.path()).expect("store");
        let c = store.create_category("Web Development", None).expect("create");

        assert!(store.resolve_category(&c.id).expect("resolve").is_some());
        assert!(store.resolve_category("Web Development").expect("resolve").is_some());
        assert!(store.resolve_category("web-development").expect("resolve").is_some());
        assert!(store.resolve_category("nonexistent").expect("resolve").is_none());
    }
}
