//! Integration tests for the Chiral client against a mock hub

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chiral::ChiralClient;
use chiral_core::{ChiralError, ClientConfig};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const PAGE_URL: &str = "https://blog.example/hello-world/";

#[derive(Clone, Copy)]
enum Scenario {
    Linked,
    Unlinked,
    NothingRelated,
    Forbidden,
}

struct MockHub {
    scenario: Scenario,
    requests: AtomicUsize,
}

async fn search(
    State(hub): State<Arc<MockHub>>,
    Path(_domain): Path<String>,
    Query(_params): Query<HashMap<String, String>>,
) -> Json<Value> {
    hub.requests.fetch_add(1, Ordering::SeqCst);
    match hub.scenario {
        Scenario::Unlinked => Json(json!({ "found": 0, "posts": [] })),
        _ => Json(json!({ "found": 1, "posts": [{ "ID": 42 }] })),
    }
}

async fn related(State(hub): State<Arc<MockHub>>) -> (StatusCode, Json<Value>) {
    hub.requests.fetch_add(1, Ordering::SeqCst);
    match hub.scenario {
        Scenario::NothingRelated => (StatusCode::NOT_FOUND, Json(json!({ "code": "no_related" }))),
        Scenario::Forbidden => (StatusCode::FORBIDDEN, Json(json!({ "code": "forbidden" }))),
        _ => (StatusCode::OK, Json(json!({ "related_post_ids": [1, 2] }))),
    }
}

async fn detail(
    State(hub): State<Arc<MockHub>>,
    Path((_domain, id)): Path<(String, i64)>,
) -> Json<Value> {
    hub.requests.fetch_add(1, Ordering::SeqCst);
    let author = if id == 1 { json!({ "name": "Ada" }) } else { Value::Null };
    Json(json!({
        "ID": id,
        "title": format!("Post <{}>", id),
        "URL": format!("https://hub.example/chiral_data/post-{}/", id),
        "excerpt": "<p>Hello</p>",
        "featured_image": format!("https://hub.example/img-{}.png", id),
        "author": author,
        "metadata": false
    }))
}

async fn start_mock(scenario: Scenario) -> (Arc<MockHub>, String) {
    let hub = Arc::new(MockHub {
        scenario,
        requests: AtomicUsize::new(0),
    });

    let app = Router::new()
        .route("/sites/:domain/posts", get(search))
        .route("/sites/:domain/posts/:id", get(detail))
        .route("/wp-json/chiral-network/v1/related-post-ids", get(related))
        .with_state(hub.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (hub, format!("http://{}", addr))
}

fn client_for(base: &str, data_dir: &TempDir) -> ChiralClient {
    let config = ClientConfig::builder()
        .hub_url(base)
        .directory_api_base(base)
        .build()
        .unwrap();
    ChiralClient::from_config_with_data_dir(config, data_dir.path()).unwrap()
}

#[tokio::test]
async fn test_render_items() {
    let (_hub, base) = start_mock(Scenario::Linked).await;
    let dir = TempDir::new().unwrap();
    let client = client_for(&base, &dir);

    let html = client.render(PAGE_URL, None).await;

    assert!(html.contains("<h3>Related Content</h3>"));
    assert_eq!(html.matches("<li>").count(), 2);
    assert!(html.contains("Post &lt;1&gt;"));
    assert!(html.contains("Source: Ada"));
    assert!(html.contains(r#"<div class="related-post-excerpt">Hello</div>"#));
    assert!(html.contains(r#"<img src="https://hub.example/img-2.png""#));
}

#[tokio::test]
async fn test_render_distinguishes_empty_states() {
    let dir = TempDir::new().unwrap();

    let (_hub, base) = start_mock(Scenario::Unlinked).await;
    let not_linked = client_for(&base, &dir).render(PAGE_URL, None).await;
    assert!(not_linked.contains("Page data not found in Chiral network"));

    let (_hub, base) = start_mock(Scenario::NothingRelated).await;
    let no_data = client_for(&base, &dir).render(PAGE_URL, None).await;
    assert!(no_data.contains("No related Chiral data found at the moment."));

    let (_hub, base) = start_mock(Scenario::Forbidden).await;
    let error = client_for(&base, &dir).render(PAGE_URL, None).await;
    assert!(error.contains("Error fetching related data: Domain not authorized in Chiral network"));
}

#[tokio::test]
async fn test_cache_persists_across_clients() {
    let (hub, base) = start_mock(Scenario::Linked).await;
    let dir = TempDir::new().unwrap();

    let first = client_for(&base, &dir).related(PAGE_URL, Some(2)).await.unwrap();
    let requests = hub.requests.load(Ordering::SeqCst);
    assert_eq!(requests, 4);

    // A fresh client over the same data directory reads the persisted entry
    let client = client_for(&base, &dir);
    let second = client.related(PAGE_URL, Some(2)).await.unwrap();

    assert_eq!(second, first);
    assert_eq!(hub.requests.load(Ordering::SeqCst), requests);
    assert_eq!(client.cache_stats().total_items, 1);

    assert_eq!(client.clear_cache(), 1);
    client.related(PAGE_URL, Some(2)).await.unwrap();
    assert_eq!(hub.requests.load(Ordering::SeqCst), requests * 2);
}

#[tokio::test]
async fn test_disabled_cache_always_fetches() {
    let (hub, base) = start_mock(Scenario::Linked).await;
    let dir = TempDir::new().unwrap();
    let config = ClientConfig::builder()
        .hub_url(&base)
        .directory_api_base(&base)
        .enable_cache(false)
        .build()
        .unwrap();
    let client = ChiralClient::from_config_with_data_dir(config, dir.path()).unwrap();

    client.related(PAGE_URL, None).await.unwrap();
    client.related(PAGE_URL, None).await.unwrap();

    assert_eq!(hub.requests.load(Ordering::SeqCst), 8);
    assert_eq!(client.cache_stats().total_items, 0);
}

#[tokio::test]
async fn test_relative_page_url_goes_through_lookup() {
    let (hub, base) = start_mock(Scenario::Unlinked).await;
    let dir = TempDir::new().unwrap();
    let client = client_for(&base, &dir);

    let err = client.related("relative/page", None).await.unwrap_err();
    assert!(matches!(err, ChiralError::NotLinked));
    assert_eq!(hub.requests.load(Ordering::SeqCst), 1);

    let html = client.render("relative/page", None).await;
    assert!(html.contains("Page data not found in Chiral network"));
}

#[tokio::test]
async fn test_connection() {
    let (_hub, base) = start_mock(Scenario::Forbidden).await;
    let dir = TempDir::new().unwrap();

    assert!(client_for(&base, &dir).test_connection().await);
}
