//! Query-layer integration tests: pagination boundaries, category and
//! search filters, ordering, and expansion round-trips.

use tempfile::tempdir;

use quill::query::PostQuery;
use quill::storage::{NewPost, SharedStore, Store};

fn seed_store(tmp: &tempfile::TempDir) -> (SharedStore, String, String) {
    let store = SharedStore::new(tmp.path()).expect("store");
    let (author_id, category_id) = {
        let guard = store.0.lock();
        let user = guard.create_user("alice", "alice@example.com", "h").expect("user");
        let cat = guard.create_category("Tech", None).expect("category");
        (user.id, cat.id)
    };
    (store, author_id, category_id)
}

fn make_post(store: &Store, author: &str, category: &str, title: &str, content: &str) {
    store
        .create_post(author, NewPost {
            title: title.to_string(),
            content: content.to_string(),
            category: category.to_string(),
            ..NewPost::default()
        })
        .expect("create post");
}

fn query(category: Option<&str>, search: Option<&str>, page: Option<&str>, limit: Option<&str>) -> PostQuery {
    PostQuery {
        category: category.map(str::to_string),
        search: search.map(str::to_string),
        page: page.map(str::to_string),
        limit: limit.map(str::to_string),
    }
}

#[test]
fn thirteen_posts_paginate_as_six_six_one() {
    let tmp = tempdir().expect("tempdir");
    let (store, author, category) = seed_store(&tmp);
    {
        let guard = store.0.lock();
        for i in 1..=13 {
            make_post(&guard, &author, &category, &format!("Post Number {i}"), "body");
        }
    }

    let guard = store.0.lock();
    let p1 = guard.list_posts(&query(None, None, Some("1"), Some("6"))).expect("page 1");
    assert_eq!(p1.pagination.total, 13);
    assert_eq!(p1.pagination.pages, 3);
    assert_eq!(p1.data.len(), 6);

    let p2 = guard.list_posts(&query(None, None, Some("2"), Some("6"))).expect("page 2");
    assert_eq!(p2.data.len(), 6);

    let p3 = guard.list_posts(&query(None, None, Some("3"), Some("6"))).expect("page 3");
    assert_eq!(p3.data.len(), 1);

    // No overlap between pages.
    let mut seen: Vec<String> = Vec::new();
    for page in [&p1, &p2, &p3] {
        for post in &page.data {
            assert!(!seen.contains(&post.id), "post {} appears on two pages", post.id);
            seen.push(post.id.clone());
        }
    }
    assert_eq!(seen.len(), 13);
}

#[test]
fn listing_is_newest_first_and_idempotent() {
    let tmp = tempdir().expect("tempdir");
    let (store, author, category) = seed_store(&tmp);
    {
        let guard = store.0.lock();
        for i in 1..=5 {
            make_post(&guard, &author, &category, &format!("Chronological {i}"), "body");
        }
    }

    let guard = store.0.lock();
    let q = query(None, None, None, None);
    let first = guard.list_posts(&q).expect("list");
    assert_eq!(first.data[0].title, "Chronological 5", "latest insertion leads");
    assert_eq!(first.data[4].title, "Chronological 1");
    for w in first.data.windows(2) {
        assert!(w[0].created_at >= w[1].created_at, "ordering is newest-first");
    }

    let second = guard.list_posts(&q).expect("list again");
    let ids: Vec<_> = first.data.iter().map(|p| &p.id).collect();
    let ids2: Vec<_> = second.data.iter().map(|p| &p.id).collect();
    assert_eq!(ids, ids2, "repeat queries return the identical ordered set");
}

#[test]
fn defaults_apply_for_missing_or_bad_paging() {
    let tmp = tempdir().expect("tempdir");
    let (store, author, category) = seed_store(&tmp);
    {
        let guard = store.0.lock();
        for i in 1..=12 {
            make_post(&guard, &author, &category, &format!("Default Page {i}"), "body");
        }
    }

    let guard = store.0.lock();
    let page = guard.list_posts(&query(None, None, None, None)).expect("list");
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.pagination.limit, 10);
    assert_eq!(page.data.len(), 10);

    let bad = guard.list_posts(&query(None, None, Some("-2"), Some("zero"))).expect("list");
    assert_eq!(bad.pagination.page, 1);
    assert_eq!(bad.pagination.limit, 10);
}

#[test]
fn category_filter_matches_id_name_and_slug() {
    let tmp = tempdir().expect("tempdir");
    let (store, author, tech_id) = seed_store(&tmp);
    {
        let guard = store.0.lock();
        let cooking = guard.create_category("Cooking", None).expect("category");
        make_post(&guard, &author, &tech_id, "Tech Post", "body");
        make_post(&guard, &author, &cooking.id, "Cooking Post", "body");
    }

    let guard = store.0.lock();
    for ident in ["Tech", "tech", tech_id.as_str()] {
        let page = guard.list_posts(&query(Some(ident), None, None, None)).expect("list");
        assert_eq!(page.data.len(), 1, "filter '{ident}' should match exactly the tech post");
        assert_eq!(page.data[0].title, "Tech Post");
    }

    // Unknown category degrades to no filter rather than an error.
    let page = guard.list_posts(&query(Some("no-such"), None, None, None)).expect("list");
    assert_eq!(page.data.len(), 2);

    // Client sentinels mean "no filter" too.
    let page = guard.list_posts(&query(Some("All"), None, None, None)).expect("list");
    assert_eq!(page.data.len(), 2);
}

#[test]
fn search_is_case_insensitive_over_title_and_content() {
    let tmp = tempdir().expect("tempdir");
    let (store, author, category) = seed_store(&tmp);
    {
        let guard = store.0.lock();
        make_post(&guard, &author, &category, "Rust Memory Model", "ownership and borrowing");
        make_post(&guard, &author, &category, "Gardening Notes", "planting RUSTIC herbs");
        make_post(&guard, &author, &category, "Unrelated", "nothing to see");
    }

    let guard = store.0.lock();
    let page = guard.list_posts(&query(None, Some("rust"), None, None)).expect("list");
    assert_eq!(page.pagination.total, 2, "matches title and content, case-insensitively");

    let page = guard.list_posts(&query(None, Some("BORROWING"), None, None)).expect("list");
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].title, "Rust Memory Model");

    let page = guard.list_posts(&query(None, Some("quantum"), None, None)).expect("list");
    assert!(page.data.is_empty());
    assert_eq!(page.pagination.pages, 0);
}

#[test]
fn created_post_round_trips_fully_expanded() {
    let tmp = tempdir().expect("tempdir");
    let (store, author, category) = seed_store(&tmp);

    let guard = store.0.lock();
    let created = guard
        .create_post(&author, NewPost {
            title: "Round Trip".into(),
            content: "body".into(),
            category: category.clone(),
            ..NewPost::default()
        })
        .expect("create");

    let fetched = guard.get_post(&created.id).expect("get");
    assert_eq!(fetched.author.id, author);
    assert_eq!(fetched.author.username, "alice");
    assert_eq!(fetched.author.email, "alice@example.com");
    assert_eq!(fetched.category.id, category);
    assert_eq!(fetched.category.name, "Tech");
    assert_eq!(fetched.category.slug, "tech");
    assert_eq!(fetched, created);

    // The JSON shape carries expanded objects, not bare ids.
    let json = serde_json::to_value(&fetched).expect("json");
    assert!(json["author"].is_object());
    assert!(json["category"].is_object());
    assert!(json["featuredImage"].is_string());
}
