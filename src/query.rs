//! Query-layer parameter handling: filter values, substring search, and
//! pagination math for the post listing endpoint.
//!
//! Raw query parameters arrive as strings; page and limit parse leniently,
//! falling back to defaults when absent, malformed, or non-positive, so a
//! sloppy client degrades to the first default page instead of an error.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 10;

/// Filter, search, and paging inputs for a post listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PostQuery {
    pub fn page(&self) -> usize {
        parse_positive(self.page.as_deref()).unwrap_or(DEFAULT_PAGE)
    }

    pub fn limit(&self) -> usize {
        parse_positive(self.limit.as_deref()).unwrap_or(DEFAULT_LIMIT)
    }

    /// Search term, when present and non-empty.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Category filter value, when present and not one of the client
    /// sentinels meaning "no filter".
    pub fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && *s != "All" && *s != "null")
    }
}

fn parse_positive(raw: Option<&str>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n as usize)
}

/// Paging metadata returned alongside every post listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
    pub total: usize,
    pub pages: usize,
}

/// Compute paging metadata; `pages` is `ceil(total / limit)`.
pub fn pagination(total: usize, page: usize, limit: usize) -> Pagination {
    Pagination { page, limit, total, pages: total.div_ceil(limit) }
}
