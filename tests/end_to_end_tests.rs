//! Full-flow scenario: register, login, create a category and a post, then
//! read it back through the filtered listing.

use tempfile::tempdir;

use quill::identity::{AuthProvider, LocalAuthProvider, LoginRequest, RegisterRequest, SessionManager};
use quill::query::PostQuery;
use quill::storage::{NewPost, SharedStore};

#[test]
fn register_login_post_and_filtered_list() {
    let tmp = tempdir().expect("tempdir");
    let store = SharedStore::new(tmp.path()).expect("store");
    let auth = LocalAuthProvider::new(store.clone(), SessionManager::default());

    // Register user A and log in again.
    auth.register(&RegisterRequest {
        username: "ana".into(),
        email: "ana@example.com".into(),
        password: "pw".into(),
    })
    .expect("register");
    let grant = auth
        .login(&LoginRequest { email: "ana@example.com".into(), password: "pw".into() })
        .expect("login");
    let principal = auth.verify(&grant.token).expect("verify");

    // Create category "Tech" and one post as A.
    let (category, post) = {
        let guard = store.0.lock();
        let category = guard.create_category("Tech", None).expect("category");
        assert_eq!(category.slug, "tech");
        let post = guard
            .create_post(&principal.user_id, NewPost {
                title: "First Post".into(),
                content: "hello from ana".into(),
                category: category.id.clone(),
                ..NewPost::default()
            })
            .expect("post");
        (category, post)
    };
    assert_eq!(post.slug, "first-post");

    // Fetch the list filtered by the category slug.
    let page = {
        let guard = store.0.lock();
        guard
            .list_posts(&PostQuery {
                category: Some("tech".into()),
                ..PostQuery::default()
            })
            .expect("list")
    };
    assert_eq!(page.pagination.total, 1);
    assert_eq!(page.data.len(), 1);

    let listed = &page.data[0];
    assert_eq!(listed.id, post.id);
    assert_eq!(listed.author.username, "ana");
    assert_eq!(listed.author.id, principal.user_id);
    assert_eq!(listed.category.id, category.id);
    assert_eq!(listed.category.name, "Tech");
}

#[test]
fn comments_appear_oldest_first_in_the_full_flow() {
    let tmp = tempdir().expect("tempdir");
    let store = SharedStore::new(tmp.path()).expect("store");
    let auth = LocalAuthProvider::new(store.clone(), SessionManager::default());

    let grant = auth
        .register(&RegisterRequest {
            username: "ana".into(),
            email: "ana@example.com".into(),
            password: "pw".into(),
        })
        .expect("register");
    let principal = auth.verify(&grant.token).expect("verify");

    let guard = store.0.lock();
    let cat = guard.create_category("Tech", None).expect("category");
    let post = guard
        .create_post(&principal.user_id, NewPost {
            title: "Discussion".into(),
            content: "talk here".into(),
            category: cat.id,
            ..NewPost::default()
        })
        .expect("post");

    let mut expected = Vec::new();
    for text in ["first comment", "second comment", "third comment"] {
        expected.push(guard.add_comment(&post.id, &principal.user_id, text).expect("comment").id);
    }

    let listed = guard.list_comments(&post.id).expect("list");
    let ids: Vec<String> = listed.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, expected, "creation order t1 < t2 < t3 is preserved");

    // The post's ordered comment list matches too.
    let post = guard.get_post(&post.id).expect("get");
    assert_eq!(post.comments, expected);
}
