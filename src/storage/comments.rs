//! Comments: remarks attached to a post, listed oldest-first, mutable only
//! by their author (or an elevated role).

use anyhow::Result;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::identity::{require_owner_or_admin, Principal};

use super::categories::ms_to_datetime;
use super::{i64_at, new_id, now_ms, str_at, Store};

const TABLE: &str = "comments";

/// Shortest accepted comment body.
const MIN_CONTENT_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub content: String,
    pub post_id: String,
    pub author_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Author fields displayed on an expanded comment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommentAuthor {
    pub id: String,
    pub username: String,
}

/// Display shape: the author expanded into an object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentExpanded {
    pub id: String,
    pub content: String,
    pub post: String,
    pub author: CommentAuthor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn empty_comments_df() -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Series::new("id".into(), Vec::<String>::new()).into(),
        Series::new("content".into(), Vec::<String>::new()).into(),
        Series::new("post_id".into(), Vec::<String>::new()).into(),
        Series::new("author_id".into(), Vec::<String>::new()).into(),
        Series::new("created_at".into(), Vec::<i64>::new()).into(),
        Series::new("updated_at".into(), Vec::<i64>::new()).into(),
    ])?;
    Ok(df)
}

fn comments_df(comments: &[Comment]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Series::new("id".into(), comments.iter().map(|c| c.id.clone()).collect::<Vec<_>>()).into(),
        Series::new("content".into(), comments.iter().map(|c| c.content.clone()).collect::<Vec<_>>()).into(),
        Series::new("post_id".into(), comments.iter().map(|c| c.post_id.clone()).collect::<Vec<_>>()).into(),
        Series::new("author_id".into(), comments.iter().map(|c| c.author_id.clone()).collect::<Vec<_>>()).into(),
        Series::new("created_at".into(), comments.iter().map(|c| c.created_at).collect::<Vec<_>>()).into(),
        Series::new("updated_at".into(), comments.iter().map(|c| c.updated_at).collect::<Vec<_>>()).into(),
    ])?;
    Ok(df)
}

fn comment_from_row(df: &DataFrame, i: usize) -> Result<Comment> {
    Ok(Comment {
        id: str_at(df, "id", i)?,
        content: str_at(df, "content", i)?,
        post_id: str_at(df, "post_id", i)?,
        author_id: str_at(df, "author_id", i)?,
        created_at: i64_at(df, "created_at", i)?,
        updated_at: i64_at(df, "updated_at", i)?,
    })
}

fn ensure_well_formed_id(id: &str) -> AppResult<()> {
    uuid::Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| AppError::validation("invalid_post_id", "invalid post id"))
}

fn validate_content(content: &str) -> AppResult<String> {
    let content = content.trim();
    if content.len() < MIN_CONTENT_LEN {
        return Err(AppError::validation("invalid_content", "comment content must be at least 3 characters"));
    }
    Ok(content.to_string())
}

impl Store {
    pub(crate) fn load_comments(&self) -> Result<Vec<Comment>> {
        let df = self.read_table(TABLE, empty_comments_df)?;
        let mut out = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            out.push(comment_from_row(&df, i)?);
        }
        Ok(out)
    }

    fn save_comments(&self, comments: &[Comment]) -> Result<()> {
        self.write_table(TABLE, comments_df(comments)?)
    }

    fn expand_comments(&self, comments: &[Comment]) -> AppResult<Vec<CommentExpanded>> {
        let users = self.load_users()?;
        let mut out = Vec::with_capacity(comments.len());
        for c in comments {
            let author = users
                .iter()
                .find(|u| u.id == c.author_id)
                .map(|u| CommentAuthor { id: u.id.clone(), username: u.username.clone() })
                .unwrap_or_else(|| CommentAuthor { id: c.author_id.clone(), ..CommentAuthor::default() });
            out.push(CommentExpanded {
                id: c.id.clone(),
                content: c.content.clone(),
                post: c.post_id.clone(),
                author,
                created_at: ms_to_datetime(c.created_at),
                updated_at: ms_to_datetime(c.updated_at),
            });
        }
        Ok(out)
    }

    /// All comments on a post, oldest first, authors expanded.
    /// A well-formed id that matches no post yields an empty list.
    pub fn list_comments(&self, post_id: &str) -> AppResult<Vec<CommentExpanded>> {
        ensure_well_formed_id(post_id)?;
        let mut comments = self.load_comments()?;
        comments.retain(|c| c.post_id == post_id);
        comments.sort_by_key(|c| c.created_at);
        self.expand_comments(&comments)
    }

    /// Persist a comment on an existing post and append its id to the
    /// post's ordered comment list.
    pub fn add_comment(&self, post_id: &str, author_id: &str, content: &str) -> AppResult<CommentExpanded> {
        ensure_well_formed_id(post_id)?;
        let content = validate_content(content)?;
        if self.find_post(post_id)?.is_none() {
            return Err(AppError::not_found("post_not_found", "post not found"));
        }
        let now = now_ms();
        let comment = Comment {
            id: new_id(),
            content,
            post_id: post_id.to_string(),
            author_id: author_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        let mut comments = self.load_comments()?;
        comments.push(comment.clone());
        self.save_comments(&comments)?;
        self.attach_comment(post_id, &comment.id)?;
        let mut expanded = self.expand_comments(std::slice::from_ref(&comment))?;
        expanded.pop().ok_or_else(|| AppError::internal("expand_failed", "comment expansion produced no row"))
    }

    /// Replace a comment's content, gated on ownership.
    pub fn update_comment(&self, id: &str, actor: &Principal, content: &str) -> AppResult<CommentExpanded> {
        let mut comments = self.load_comments()?;
        let Some(idx) = comments.iter().position(|c| c.id == id) else {
            return Err(AppError::not_found("comment_not_found", "comment not found"));
        };
        require_owner_or_admin(actor, &comments[idx].author_id)?;
        let content = validate_content(content)?;
        comments[idx].content = content;
        comments[idx].updated_at = now_ms();
        let updated = comments[idx].clone();
        self.save_comments(&comments)?;
        let mut expanded = self.expand_comments(std::slice::from_ref(&updated))?;
        expanded.pop().ok_or_else(|| AppError::internal("expand_failed", "comment expansion produced no row"))
    }

    /// Remove a comment and detach it from its post, gated on ownership.
    pub fn delete_comment(&self, id: &str, actor: &Principal) -> AppResult<()> {
        let mut comments = self.load_comments()?;
        let Some(idx) = comments.iter().position(|c| c.id == id) else {
            return Err(AppError::not_found("comment_not_found", "comment not found"));
        };
        require_owner_or_admin(actor, &comments[idx].author_id)?;
        let removed = comments.remove(idx);
        self.save_comments(&comments)?;
        self.detach_comment(&removed.post_id, &removed.id)?;
        Ok(())
    }

    /// Cascade helper for post deletion; returns how many comments went.
    pub(crate) fn delete_comments_for_post(&self, post_id: &str) -> Result<usize> {
        let mut comments = self.load_comments()?;
        let before = comments.len();
        comments.retain(|c| c.post_id != post_id);
        let removed = before - comments.len();
        if removed > 0 {
            self.save_comments(&comments)?;
        }
        Ok(removed)
    }
}
