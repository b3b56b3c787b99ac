//! Slug derivation for categories and posts.
//! A slug is the lowercase, hyphenated, URL-safe form of a human-readable
//! name and is used as a stable lookup key alongside the generated id.

/// Derive a slug from a display name: lowercase, runs of non-alphanumeric
/// characters collapsed to a single hyphen, leading/trailing hyphens trimmed.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_hyphen = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_hyphen && !out.is_empty() {
                out.push('-');
            }
            pending_hyphen = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    out
}

/// True when the string already has slug shape; used to validate
/// caller-supplied slugs instead of silently rewriting them.
pub fn is_valid_slug(s: &str) -> bool {
    !s.is_empty() && s == slugify(s)
}
