//! Preview server with on-demand post rendering
//!
//! Serves the generated output. Post pages missing from the output are
//! rendered on first request; pages older than the revalidation window are
//! served stale while a background task renders them again.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::{CacheDb, Freshness};
use crate::detail::DetailView;
use crate::generator::{Generator, RenderedPage};
use crate::helpers::{is_safe_uid, post_path, DateFormatter};
use crate::listing::{PaginationController, PaginationState};
use crate::Blog;

/// Server state
struct ServerState {
    blog: Blog,
    generator: Generator,
    formatter: DateFormatter,
    cache: RwLock<CacheDb>,
    /// Slugs with a background render in flight
    refreshing: Mutex<HashSet<String>>,
}

type SharedState = Arc<ServerState>;

/// Start the preview server
pub async fn start(blog: &Blog, ip: &str, port: u16, open: bool) -> Result<()> {
    let app = router(blog)?;

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    let url = format!("http://{}:{}", ip, port);
    println!("Server running at {}", url);
    println!("Press Ctrl+C to stop.");

    // Open browser if requested
    if open {
        if let Err(e) = open_browser(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router
fn router(blog: &Blog) -> Result<Router> {
    let state = Arc::new(ServerState {
        blog: blog.clone(),
        generator: Generator::new(blog)?,
        formatter: DateFormatter::from_config(&blog.config),
        cache: RwLock::new(CacheDb::load(&blog.base_dir)),
        refreshing: Mutex::new(HashSet::new()),
    });

    let static_files = ServeDir::new(&blog.public_dir).append_index_html_on_directories(true);

    Ok(Router::new()
        .route("/post/:slug", get(post_handler))
        .route("/post/:slug/", get(post_handler))
        .route("/api/posts/more", get(load_more_handler))
        .fallback_service(static_files)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

/// Serve a post page, rendering or revalidating it as needed
async fn post_handler(State(state): State<SharedState>, Path(slug): Path<String>) -> Response {
    if !is_safe_uid(&slug) {
        return render_view(&state, DetailView::NotFound(slug));
    }

    let route = post_path(&slug);
    let freshness = state.cache.read().await.freshness(
        &route,
        Utc::now(),
        state.blog.config.revalidate_window(),
    );

    if freshness != Freshness::Missing {
        let file = state.blog.public_dir.join(&route).join("index.html");
        match tokio::fs::read_to_string(&file).await {
            Ok(html) => {
                if freshness == Freshness::Stale {
                    spawn_refresh(state.clone(), slug).await;
                }
                return Html(html).into_response();
            }
            Err(e) => tracing::warn!("Cached page {:?} unreadable: {}", file, e),
        }
    }

    match state.generator.render_post(&slug).await {
        Ok(page) => {
            if page.is_cacheable() {
                if let Err(e) = store(&state, &route, &page).await {
                    tracing::error!("Failed to store {}: {}", route, e);
                }
            }
            respond(page)
        }
        Err(e) => {
            tracing::error!("Rendering {} failed: {}", slug, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Render error").into_response()
        }
    }
}

/// Re-render `slug` in the background unless a refresh is already running
async fn spawn_refresh(state: SharedState, slug: String) {
    let task_state = state.clone();
    let task_slug = slug.clone();
    spawn_tracked(state, slug, async move {
        tracing::info!("Revalidating post {}", task_slug);
        refresh(&task_state, &task_slug).await
    })
    .await;
}

/// Run `task` for `slug` at most once at a time
///
/// The slug is released when the task ends, even if it panicked.
async fn spawn_tracked<F>(state: SharedState, slug: String, task: F) -> Option<JoinHandle<()>>
where
    F: Future<Output = crate::error::Result<()>> + Send + 'static,
{
    if !state.refreshing.lock().await.insert(slug.clone()) {
        return None;
    }

    Some(tokio::spawn(async move {
        match tokio::spawn(task).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("Revalidating {} failed: {}", slug, e),
            Err(e) => tracing::error!("Revalidation of {} aborted: {}", slug, e),
        }
        state.refreshing.lock().await.remove(&slug);
    }))
}

async fn refresh(state: &ServerState, slug: &str) -> crate::error::Result<()> {
    let route = post_path(slug);
    let page = state.generator.render_post(slug).await?;

    match &page.view {
        DetailView::Ready(_) => store(state, &route, &page).await,
        DetailView::NotFound(_) => {
            // Unpublished since it was rendered
            state.generator.remove_page(&route)?;
            let mut cache = state.cache.write().await;
            cache.remove(&route);
            cache.save(&state.blog.base_dir)
        }
        DetailView::Loading | DetailView::Failed(_) => {
            tracing::warn!("Keeping stale page for {}", slug);
            Ok(())
        }
    }
}

/// Write a rendered page and record it in the cache
async fn store(state: &ServerState, route: &str, page: &RenderedPage) -> crate::error::Result<()> {
    let output = state.generator.write_page(route, &page.html)?;
    let mut cache = state.cache.write().await;
    if cache.record(route, &page.html, &output, Utc::now()) {
        tracing::info!("Updated {}", output);
    }
    cache.save(&state.blog.base_dir)
}

fn render_view(state: &ServerState, view: DetailView) -> Response {
    match state.generator.render_detail(&view) {
        Ok(html) => respond(RenderedPage { view, html }),
        Err(e) => {
            tracing::error!("Rendering failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Render error").into_response()
        }
    }
}

fn respond(page: RenderedPage) -> Response {
    let status = match page.view {
        DetailView::Ready(_) | DetailView::Loading => StatusCode::OK,
        DetailView::NotFound(_) => StatusCode::NOT_FOUND,
        DetailView::Failed(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Html(page.html)).into_response()
}

#[derive(Debug, Deserialize)]
struct LoadMoreParams {
    cursor: String,
}

/// One "load more" step: fetch the page behind `cursor`
async fn load_more_handler(
    State(state): State<SharedState>,
    Query(params): Query<LoadMoreParams>,
) -> Response {
    let initial = PaginationState {
        results: Vec::new(),
        next_page: Some(params.cursor),
    };
    let mut controller = PaginationController::new(
        initial,
        state.formatter.clone(),
        state.blog.config.listing_date_field,
    );

    match controller.load_more(state.blog.cms.as_ref()).await {
        Ok(_) => Json(controller.into_state()).into_response(),
        Err(e) => {
            let status = if e.is_fetch_failure() {
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
        }
    }
}

/// Open a URL in the default browser
fn open_browser(url: &str) -> Result<()> {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(url).spawn()?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open").arg(url).spawn()?;
    }

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/c", "start", url])
            .spawn()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::fixtures::post;
    use crate::cms::{CmsClient, MemoryCms};
    use crate::config::SiteConfig;
    use std::fs;
    use tempfile::TempDir;

    fn state(dir: &TempDir, cms: Arc<MemoryCms>) -> SharedState {
        let mut config = SiteConfig::default();
        config.per_page = 2;
        let blog = Blog::with_client(dir.path(), config, cms);
        Arc::new(ServerState {
            generator: Generator::new(&blog).unwrap(),
            formatter: DateFormatter::from_config(&blog.config),
            cache: RwLock::new(CacheDb::new()),
            refreshing: Mutex::new(HashSet::new()),
            blog,
        })
    }

    fn docs() -> Vec<crate::cms::RawDocument> {
        vec![
            post("a", "2021-03-25T19:25:28+0000"),
            post("b", "2021-03-24T19:25:28+0000"),
            post("c", "2021-03-23T19:25:28+0000"),
        ]
    }

    #[tokio::test]
    async fn test_unknown_post_rendered_on_first_request() {
        let dir = TempDir::new().unwrap();
        let cms = Arc::new(MemoryCms::new(docs()));
        let state = state(&dir, cms.clone());

        let response = post_handler(State(state.clone()), Path("b".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(dir.path().join("public/post/b/index.html").exists());
        assert!(state.cache.read().await.entries.contains_key("post/b/"));

        // Served from the output while fresh
        let response = post_handler(State(state), Path("b".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(cms.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_and_invalid_posts_are_404() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, Arc::new(MemoryCms::new(docs())));

        let response = post_handler(State(state.clone()), Path("nope".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(!dir.path().join("public/post/nope").exists());

        let response = post_handler(State(state), Path("..".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cms_failure_is_503_and_not_cached() {
        let dir = TempDir::new().unwrap();
        let cms = Arc::new(MemoryCms::new(docs()));
        cms.fail_next_fetch();
        let state = state(&dir, cms);

        let response = post_handler(State(state.clone()), Path("a".to_string())).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(state.cache.read().await.entries.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_removes_unpublished_post() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, Arc::new(MemoryCms::new(docs())));

        let route = post_path("gone");
        let output = state.generator.write_page(&route, "<html>").unwrap();
        state
            .cache
            .write()
            .await
            .record(&route, "<html>", &output, Utc::now());

        refresh(&state, "gone").await.unwrap();
        assert!(!dir.path().join("public").join(&output).exists());
        assert!(state.cache.read().await.entries.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_keeps_stale_page_on_failure() {
        let dir = TempDir::new().unwrap();
        let cms = Arc::new(MemoryCms::new(docs()));
        let state = state(&dir, cms.clone());

        let route = post_path("a");
        let output = state.generator.write_page(&route, "stale").unwrap();
        cms.fail_next_fetch();

        refresh(&state, "a").await.unwrap();
        let html = fs::read_to_string(dir.path().join("public").join(&output)).unwrap();
        assert_eq!(html, "stale");
    }

    async fn failing_render() -> crate::error::Result<()> {
        panic!("render blew up")
    }

    async fn quiet_render() -> crate::error::Result<()> {
        Ok(())
    }

    #[tokio::test]
    async fn test_panicking_refresh_releases_slug() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, Arc::new(MemoryCms::new(docs())));

        let handle = spawn_tracked(state.clone(), "a".to_string(), failing_render())
            .await
            .unwrap();
        handle.await.unwrap();
        assert!(state.refreshing.lock().await.is_empty());

        // The next stale hit can refresh again
        let handle = spawn_tracked(state.clone(), "a".to_string(), quiet_render()).await;
        assert!(handle.is_some());
    }

    #[tokio::test]
    async fn test_one_refresh_per_slug() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, Arc::new(MemoryCms::new(docs())));
        state.refreshing.lock().await.insert("a".to_string());

        let handle = spawn_tracked(state.clone(), "a".to_string(), quiet_render()).await;
        assert!(handle.is_none());
    }

    #[tokio::test]
    async fn test_load_more_endpoint() {
        let dir = TempDir::new().unwrap();
        let cms = Arc::new(MemoryCms::new(docs()));
        let state = state(&dir, cms.clone());

        let first = cms
            .query(&crate::listing::listing_query(&state.blog.config))
            .await
            .unwrap();
        let cursor = first.next_page.unwrap();

        let response = load_more_handler(
            State(state.clone()),
            Query(LoadMoreParams {
                cursor: cursor.clone(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        cms.fail_next_fetch();
        let response = load_more_handler(State(state), Query(LoadMoreParams { cursor })).await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
