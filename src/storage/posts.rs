//! Posts: blog entries referencing an author and a category, with a derived
//! unique slug, an optional featured image, a draft/published status flag,
//! and the ordered list of comment ids attached to them.
//!
//! The author reference is immutable after creation; every mutation is
//! gated on the owning author or an elevated role before anything is
//! written. Title and slug uniqueness are checked under the store lock and
//! a collision is a rejected write, never a silent rename.

use anyhow::Result;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::identity::{require_owner_or_admin, Principal};
use crate::query::{pagination, Pagination, PostQuery};
use crate::slug::{is_valid_slug, slugify};

use super::categories::{ms_to_datetime, CategoryRef};
use super::users::AuthorRef;
use super::{i64_at, new_id, now_ms, str_at, Store};

const TABLE: &str = "posts";

/// Image shown when a post was created without an upload.
pub const DEFAULT_FEATURED_IMAGE: &str =
    "https://placehold.co/800x450/e9ecef/212529?text=Featured+Image";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    Published,
}

impl Default for PostStatus {
    fn default() -> Self { PostStatus::Draft }
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Draft => "draft",
            PostStatus::Published => "published",
        }
    }

    /// Strict parse for client input.
    pub fn parse(s: &str) -> AppResult<PostStatus> {
        match s {
            "draft" => Ok(PostStatus::Draft),
            "published" => Ok(PostStatus::Published),
            _ => Err(AppError::validation("invalid_status", "status must be draft or published")),
        }
    }

    /// Lenient parse for stored rows; unknown values read as draft.
    fn from_stored(s: &str) -> PostStatus {
        match s {
            "published" => PostStatus::Published,
            _ => PostStatus::Draft,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub category_id: String,
    pub author_id: String,
    pub featured_image: String,
    pub status: PostStatus,
    pub comment_ids: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Inputs for creating a post. `category` must be an existing category id;
/// `slug` overrides the derivation from the title when supplied.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub category: String,
    pub slug: Option<String>,
    pub status: Option<PostStatus>,
    pub featured_image: Option<String>,
}

/// Partial update; only fields present are applied. A title change without
/// an explicit slug re-derives the slug from the new title.
#[derive(Debug, Clone, Default)]
pub struct PostPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub status: Option<PostStatus>,
    pub featured_image: Option<String>,
}

/// Display shape: author and category expanded into objects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostExpanded {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub author: AuthorRef,
    pub category: CategoryRef,
    pub featured_image: String,
    pub status: PostStatus,
    pub comments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of expanded posts plus paging metadata.
#[derive(Debug, Clone, Serialize)]
pub struct PostPage {
    pub data: Vec<PostExpanded>,
    pub pagination: Pagination,
}

fn empty_posts_df() -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Series::new("id".into(), Vec::<String>::new()).into(),
        Series::new("title".into(), Vec::<String>::new()).into(),
        Series::new("slug".into(), Vec::<String>::new()).into(),
        Series::new("content".into(), Vec::<String>::new()).into(),
        Series::new("category_id".into(), Vec::<String>::new()).into(),
        Series::new("author_id".into(), Vec::<String>::new()).into(),
        Series::new("featured_image".into(), Vec::<String>::new()).into(),
        Series::new("status".into(), Vec::<String>::new()).into(),
        Series::new("comments_json".into(), Vec::<String>::new()).into(),
        Series::new("created_at".into(), Vec::<i64>::new()).into(),
        Series::new("updated_at".into(), Vec::<i64>::new()).into(),
    ])?;
    Ok(df)
}

fn posts_df(posts: &[Post]) -> Result<DataFrame> {
    let comments_json: Vec<String> = posts
        .iter()
        .map(|p| serde_json::to_string(&p.comment_ids).unwrap_or_else(|_| "[]".to_string()))
        .collect();
    let df = DataFrame::new(vec![
        Series::new("id".into(), posts.iter().map(|p| p.id.clone()).collect::<Vec<_>>()).into(),
        Series::new("title".into(), posts.iter().map(|p| p.title.clone()).collect::<Vec<_>>()).into(),
        Series::new("slug".into(), posts.iter().map(|p| p.slug.clone()).collect::<Vec<_>>()).into(),
        Series::new("content".into(), posts.iter().map(|p| p.content.clone()).collect::<Vec<_>>()).into(),
        Series::new("category_id".into(), posts.iter().map(|p| p.category_id.clone()).collect::<Vec<_>>()).into(),
        Series::new("author_id".into(), posts.iter().map(|p| p.author_id.clone()).collect::<Vec<_>>()).into(),
        Series::new("featured_image".into(), posts.iter().map(|p| p.featured_image.clone()).collect::<Vec<_>>()).into(),
        Series::new("status".into(), posts.iter().map(|p| p.status.as_str().to_string()).collect::<Vec<_>>()).into(),
        Series::new("comments_json".into(), comments_json).into(),
        Series::new("created_at".into(), posts.iter().map(|p| p.created_at).collect::<Vec<_>>()).into(),
        Series::new("updated_at".into(), posts.iter().map(|p| p.updated_at).collect::<Vec<_>>()).into(),
    ])?;
    Ok(df)
}

fn post_from_row(df: &DataFrame, i: usize) -> Result<Post> {
    let comments_json = str_at(df, "comments_json", i)?;
    Ok(Post {
        id: str_at(df, "id", i)?,
        title: str_at(df, "title", i)?,
        slug: str_at(df, "slug", i)?,
        content: str_at(df, "content", i)?,
        category_id: str_at(df, "category_id", i)?,
        author_id: str_at(df, "author_id", i)?,
        featured_image: str_at(df, "featured_image", i)?,
        status: PostStatus::from_stored(&str_at(df, "status", i)?),
        comment_ids: serde_json::from_str(&comments_json).unwrap_or_default(),
        created_at: i64_at(df, "created_at", i)?,
        updated_at: i64_at(df, "updated_at", i)?,
    })
}

impl Store {
    pub(crate) fn load_posts(&self) -> Result<Vec<Post>> {
        let df = self.read_table(TABLE, empty_posts_df)?;
        let mut out = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            out.push(post_from_row(&df, i)?);
        }
        Ok(out)
    }

    pub(crate) fn save_posts(&self, posts: &[Post]) -> Result<()> {
        self.write_table(TABLE, posts_df(posts)?)
    }

    fn expand_posts(&self, posts: &[Post]) -> AppResult<Vec<PostExpanded>> {
        let users = self.load_users()?;
        let cats = self.load_categories()?;
        let mut out = Vec::with_capacity(posts.len());
        for p in posts {
            let author = users
                .iter()
                .find(|u| u.id == p.author_id)
                .map(|u| u.author_ref())
                .unwrap_or_else(|| AuthorRef { id: p.author_id.clone(), ..AuthorRef::default() });
            let category = cats
                .iter()
                .find(|c| c.id == p.category_id)
                .map(|c| c.reference())
                .unwrap_or_else(|| CategoryRef {
                    id: p.category_id.clone(),
                    name: String::new(),
                    slug: String::new(),
                });
            out.push(PostExpanded {
                id: p.id.clone(),
                title: p.title.clone(),
                slug: p.slug.clone(),
                content: p.content.clone(),
                author,
                category,
                featured_image: p.featured_image.clone(),
                status: p.status,
                comments: p.comment_ids.clone(),
                created_at: ms_to_datetime(p.created_at),
                updated_at: ms_to_datetime(p.updated_at),
            });
        }
        Ok(out)
    }

    fn expand_post(&self, post: &Post) -> AppResult<PostExpanded> {
        let mut v = self.expand_posts(std::slice::from_ref(post))?;
        v.pop().ok_or_else(|| AppError::internal("expand_failed", "post expansion produced no row"))
    }

    /// Persist a new post owned by `author_id` and return it expanded.
    pub fn create_post(&self, author_id: &str, new: NewPost) -> AppResult<PostExpanded> {
        let title = new.title.trim().to_string();
        let content = new.content.trim().to_string();
        let category_id = new.category.trim().to_string();
        if title.is_empty() || content.is_empty() || category_id.is_empty() {
            return Err(AppError::validation("missing_fields", "please provide title, content, and category"));
        }
        if self.get_category(&category_id)?.is_none() {
            return Err(AppError::not_found("category_not_found", "category not found"));
        }
        let slug = match new.slug.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => {
                if !is_valid_slug(s) {
                    return Err(AppError::validation("invalid_slug", "slug must be lowercase alphanumerics and hyphens"));
                }
                s.to_string()
            }
            _ => slugify(&title),
        };
        if slug.is_empty() {
            return Err(AppError::validation("invalid_title", "title does not reduce to a usable slug"));
        }

        let mut posts = self.load_posts()?;
        if posts.iter().any(|p| p.slug == slug) {
            return Err(AppError::conflict("slug_exists", "a post with this slug already exists"));
        }
        if posts.iter().any(|p| p.title == title) {
            return Err(AppError::conflict("title_exists", "a post with this title already exists"));
        }

        let now = now_ms();
        let post = Post {
            id: new_id(),
            title,
            slug,
            content,
            category_id,
            author_id: author_id.to_string(),
            featured_image: new
                .featured_image
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_FEATURED_IMAGE.to_string()),
            status: new.status.unwrap_or_default(),
            comment_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        posts.push(post.clone());
        self.save_posts(&posts)?;
        self.expand_post(&post)
    }

    pub(crate) fn find_post(&self, id: &str) -> AppResult<Option<Post>> {
        Ok(self.load_posts()?.into_iter().find(|p| p.id == id))
    }

    /// Fetch one post with author and category expanded.
    pub fn get_post(&self, id: &str) -> AppResult<PostExpanded> {
        let Some(post) = self.find_post(id)? else {
            return Err(AppError::not_found("post_not_found", "post not found"));
        };
        self.expand_post(&post)
    }

    /// Apply the fields present in `patch` to the post, gated on ownership.
    pub fn update_post(&self, id: &str, actor: &Principal, patch: PostPatch) -> AppResult<PostExpanded> {
        let mut posts = self.load_posts()?;
        let Some(idx) = posts.iter().position(|p| p.id == id) else {
            return Err(AppError::not_found("post_not_found", "post not found"));
        };
        require_owner_or_admin(actor, &posts[idx].author_id)?;

        let mut updated = posts[idx].clone();
        if let Some(title) = patch.title.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if title != updated.title {
                updated.title = title.to_string();
                // Explicit slug wins below; otherwise the slug follows the title.
                if patch.slug.is_none() {
                    updated.slug = slugify(title);
                }
            }
        }
        if let Some(slug) = patch.slug.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if !is_valid_slug(slug) {
                return Err(AppError::validation("invalid_slug", "slug must be lowercase alphanumerics and hyphens"));
            }
            updated.slug = slug.to_string();
        }
        if updated.slug.is_empty() {
            return Err(AppError::validation("invalid_title", "title does not reduce to a usable slug"));
        }
        if let Some(content) = patch.content.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            updated.content = content.to_string();
        }
        if let Some(category) = patch.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if self.get_category(category)?.is_none() {
                return Err(AppError::not_found("category_not_found", "category not found"));
            }
            updated.category_id = category.to_string();
        }
        if let Some(status) = patch.status {
            updated.status = status;
        }
        if let Some(image) = patch.featured_image.filter(|s| !s.is_empty()) {
            updated.featured_image = image;
        }

        if posts.iter().any(|p| p.id != id && p.slug == updated.slug) {
            return Err(AppError::conflict("slug_exists", "a post with this slug already exists"));
        }
        if posts.iter().any(|p| p.id != id && p.title == updated.title) {
            return Err(AppError::conflict("title_exists", "a post with this title already exists"));
        }

        updated.updated_at = now_ms();
        posts[idx] = updated.clone();
        self.save_posts(&posts)?;
        self.expand_post(&updated)
    }

    /// Remove a post and cascade its comments, gated on ownership.
    pub fn delete_post(&self, id: &str, actor: &Principal) -> AppResult<()> {
        let mut posts = self.load_posts()?;
        let Some(idx) = posts.iter().position(|p| p.id == id) else {
            return Err(AppError::not_found("post_not_found", "post not found"));
        };
        require_owner_or_admin(actor, &posts[idx].author_id)?;
        posts.remove(idx);
        self.save_posts(&posts)?;
        let removed = self.delete_comments_for_post(id)?;
        if removed > 0 {
            tracing::debug!(post = id, removed, "cascade-deleted comments");
        }
        Ok(())
    }

    /// Page through posts newest-first, optionally narrowed by category and
    /// case-insensitive substring search over title or content.
    pub fn list_posts(&self, q: &PostQuery) -> AppResult<PostPage> {
        let page = q.page();
        let limit = q.limit();
        let mut posts = self.load_posts()?;

        if let Some(ident) = q.category_filter() {
            match self.resolve_category(ident)? {
                Some(cat) => posts.retain(|p| p.category_id == cat.id),
                None => {
                    tracing::warn!(category = ident, "category filter matched nothing; returning all posts");
                }
            }
        }

        if let Some(term) = q.search_term() {
            let re = RegexBuilder::new(&regex::escape(term))
                .case_insensitive(true)
                .build()
                .map_err(|e| AppError::internal("search_regex".to_string(), e.to_string()))?;
            posts.retain(|p| re.is_match(&p.title) || re.is_match(&p.content));
        }

        // File order is insertion order; reversing first makes the stable
        // sort break timestamp ties newest-insertion-first.
        posts.reverse();
        posts.sort_by_key(|p| std::cmp::Reverse(p.created_at));
        let total = posts.len();
        let page_items: Vec<Post> = posts.into_iter().skip((page - 1) * limit).take(limit).collect();
        let data = self.expand_posts(&page_items)?;
        Ok(PostPage { data, pagination: pagination(total, page, limit) })
    }

    /// Append a comment id to the post's ordered list.
    pub(crate) fn attach_comment(&self, post_id: &str, comment_id: &str) -> Result<()> {
        let mut posts = self.load_posts()?;
        if let Some(post) = posts.iter_mut().find(|p| p.id == post_id) {
            post.comment_ids.push(comment_id.to_string());
            self.save_posts(&posts)?;
        }
        Ok(())
    }

    /// Drop a comment id from the post's list, if still attached.
    pub(crate) fn detach_comment(&self, post_id: &str, comment_id: &str) -> Result<()> {
        let mut posts = self.load_posts()?;
        if let Some(post) = posts.iter_mut().find(|p| p.id == post_id) {
            post.comment_ids.retain(|c| c != comment_id);
            self.save_posts(&posts)?;
        }
        Ok(())
    }
}
