//!
//! quill storage module
//! --------------------
//! This module implements the on-disk store for quill. Each entity collection
//! (users, categories, posts, comments) lives in a single Parquet file under a
//! configured root folder. Mutations read the table into memory, apply the
//! change, and rewrite the file; row order in the file is insertion order and
//! is the tiebreaker for every time-ordered listing.
//!
//! Uniqueness invariants (username, email, category name/slug, post
//! title/slug) are checked while the process-wide store lock is held, so a
//! check-then-write sequence cannot interleave with another writer in the
//! same process.
//!
//! The public API centers around the `Store` type, which is wrapped in a
//! thread-safe `SharedStore` (`Arc<Mutex<Store>>`) elsewhere in the codebase.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use polars::prelude::*;

pub mod categories;
pub mod comments;
pub mod posts;
pub mod users;

pub use categories::Category;
pub use comments::{Comment, CommentExpanded};
pub use posts::{NewPost, Post, PostExpanded, PostPatch, PostStatus};
pub use users::{User, UserPublic};

/// Core on-disk storage handle for the quill entity tables.
///
/// Store resolves each collection to `<root>/<name>.parquet` and exposes the
/// entity operations implemented in the sibling modules. It is constructed
/// once at process start and injected wherever data access is needed.
#[derive(Clone)]
pub struct Store {
    /// Root folder holding the entity Parquet files.
    root: PathBuf,
}

impl Store {
    /// Create a new Store rooted at the given filesystem path.
    /// The directory is created if it does not already exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create or access store root: {}", root.display()))?;
        Ok(Self { root })
    }

    /// Return the configured root folder for this Store.
    pub fn root_path(&self) -> &PathBuf { &self.root }

    pub(crate) fn table_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.parquet"))
    }

    /// Read an entity table, or return the provided empty-schema frame when
    /// the file does not exist yet.
    pub(crate) fn read_table(&self, name: &str, empty: fn() -> Result<DataFrame>) -> Result<DataFrame> {
        let path = self.table_path(name);
        if !path.exists() { return empty(); }
        let file = std::fs::File::open(&path)
            .with_context(|| format!("open table file {}", path.display()))?;
        let df = ParquetReader::new(file).finish()
            .with_context(|| format!("read parquet table {}", path.display()))?;
        Ok(df)
    }

    /// Rewrite an entity table from the given frame.
    pub(crate) fn write_table(&self, name: &str, mut df: DataFrame) -> Result<()> {
        let path = self.table_path(name);
        if let Some(dir) = path.parent() { std::fs::create_dir_all(dir).ok(); }
        let mut f = std::fs::File::create(&path)
            .with_context(|| format!("create table file {}", path.display()))?;
        ParquetWriter::new(&mut f).finish(&mut df)
            .with_context(|| format!("write parquet table {}", path.display()))?;
        Ok(())
    }
}

// ---- Row extraction helpers shared by the entity modules ----

pub(crate) fn str_at(df: &DataFrame, col: &str, i: usize) -> Result<String> {
    match df.column(col)?.get(i)? {
        AnyValue::String(s) => Ok(s.to_string()),
        AnyValue::StringOwned(s) => Ok(s.to_string()),
        other => Err(anyhow!("column {col} row {i}: expected string, got {other:?}")),
    }
}

pub(crate) fn i64_at(df: &DataFrame, col: &str, i: usize) -> Result<i64> {
    Ok(df.column(col)?.i64()?.get(i).unwrap_or(0))
}

pub(crate) fn bool_at(df: &DataFrame, col: &str, i: usize) -> Result<bool> {
    Ok(df.column(col)?.bool()?.get(i).unwrap_or(false))
}

/// Current wall-clock time in epoch milliseconds; the stored timestamp unit.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Thread-safe shared handle over the Store.
#[derive(Clone)]
pub struct SharedStore(pub Arc<Mutex<Store>>);

impl SharedStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self(Arc::new(Mutex::new(Store::new(root)?))))
    }

    pub fn root_path(&self) -> PathBuf {
        self.0.lock().root.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_table_reads_as_empty_schema() {
        let tmp = tempdir().expect("tempdir");
        let store = Store::new(tmp.path()).expect("store");
        let df = store.read_table("users", users::empty_users_df).expect("read");
        assert_eq!(df.height(), 0);
        assert!(df.get_column_names().iter().any(|n| n.as_str() == "username"));
    }

    #[test]
    fn write_then_read_roundtrip() {
        let tmp = tempdir().expect("tempdir");
        let store = Store::new(tmp.path()).expect("store");
        let df = users::empty_users_df().expect("schema");
        store.write_table("users", df).expect("write");
        assert!(store.table_path("users").exists());
        let back = store.read_table("users", users::empty_users_df).expect("read");
        assert_eq!(back.height(), 0);
    }
}
